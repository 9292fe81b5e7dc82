use async_openai::error::OpenAIError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("niche must not be empty")]
    EmptyNiche,

    #[error("a generation request is already in flight")]
    Busy,

    #[error("generation request failed: {0}")]
    Request(#[from] OpenAIError),

    #[error("model returned an empty response")]
    EmptyResponse,

    #[error("model response is not valid lead JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GenerateError>;
