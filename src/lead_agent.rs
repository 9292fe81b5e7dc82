// src/lead_agent.rs -----------------------------------------------------------
use async_openai::{config::OpenAIConfig, types::*, Client};
use async_trait::async_trait;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use serde::Deserialize;
use std::time::Duration;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{GenerateError, Result};
use crate::memory::LeadDraft;

// -----------------------------------------------------------------------------
// type aliases
type OAClient = Client<OpenAIConfig>;

/// Leads requested per generation call.
pub const LEADS_PER_BATCH: usize = 5;

// -----------------------------------------------------------------------------
// traits

/// Anything that can turn a niche into a batch of candidate leads.
#[async_trait]
pub trait LeadSource: Send + Sync {
    async fn generate(&self, niche: &str) -> Result<Vec<LeadDraft>>;
}

// -----------------------------------------------------------------------------
// prompt helpers

fn response_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "leads": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name":    { "type": "string" },
                        "email":   { "type": "string" },
                        "phone":   { "type": "string" },
                        "niche":   { "type": "string" },
                        "status":  { "type": "string", "description": "Must be 'PROSPECTED' or 'NEW'" },
                        "company": { "type": "string" },
                        "role":    { "type": "string" }
                    },
                    "required": ["name", "email", "phone", "niche", "status"]
                }
            }
        },
        "required": ["leads"]
    })
}

fn system_prompt() -> String {
    format!(
        "You generate sales leads. Reply with a single JSON object and nothing else. \
         The object must match this JSON schema:\n{}",
        response_schema()
    )
}

pub fn niche_prompt(niche: &str) -> String {
    format!(
        "Generate a list of {LEADS_PER_BATCH} realistic leads (people or companies) for the niche: \"{niche}\". \
         Some must have status \"PROSPECTED\" (leads already contacted) and the others \"NEW\" \
         (freshly discovered leads). \
         Use Brazilian names, valid emails and phone numbers in the format (XX) 9XXXX-XXXX."
    )
}

// -----------------------------------------------------------------------------
// response parsing

#[derive(Deserialize)]
struct RawBatch {
    leads: Vec<Value>,
}

// models sometimes wrap JSON mode output in a markdown fence anyway
fn strip_fence(body: &str) -> &str {
    let body = body.trim();
    let Some(inner) = body.strip_prefix("```") else {
        return body;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Map a raw model reply into drafts.
///
/// The envelope must be `{ "leads": [...] }`; anything else is an error.
/// Individual records that lack a name, email or phone are dropped.
pub fn parse_leads(body: &str) -> Result<Vec<LeadDraft>> {
    let body = strip_fence(body);
    if body.is_empty() {
        return Err(GenerateError::EmptyResponse);
    }

    let raw: RawBatch = serde_json::from_str(body)?;
    let total = raw.leads.len();

    let drafts: Vec<LeadDraft> = raw
        .leads
        .into_iter()
        .enumerate()
        .filter_map(|(i, v)| match serde_json::from_value::<LeadDraft>(v) {
            Ok(d) if is_complete(&d) => Some(d),
            Ok(_) => {
                warn!("dropping generated lead #{i}: blank required field");
                None
            }
            Err(e) => {
                warn!("dropping generated lead #{i}: {e}");
                None
            }
        })
        .collect();

    debug!("parsed {} of {total} generated leads", drafts.len());
    Ok(drafts)
}

fn is_complete(d: &LeadDraft) -> bool {
    [&d.name, &d.email, &d.phone].iter().all(|f| !f.trim().is_empty())
}

// -----------------------------------------------------------------------------
// OpenAI-compatible client

// one attempt per call: a rate-limited or failed request surfaces immediately
fn single_attempt() -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build()
}

/// Generator backed by a chat-completions endpoint (Gemini's OpenAI
/// compatibility layer by default).
pub struct GeminiLeads {
    client: OAClient,
    model:  String,
}

impl GeminiLeads {
    pub fn new(api_key: &str, api_base: &str, model: &str) -> Self {
        let client = OAClient::with_config(
            OpenAIConfig::new()
                .with_api_key(api_key)
                .with_api_base(api_base),
        )
        .with_backoff(single_attempt());
        Self { client, model: model.to_string() }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.api_key, &config.api_base, &config.model)
    }

    fn request(&self, niche: &str) -> Result<CreateChatCompletionRequest> {
        let req = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages([
                ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessage {
                        content: system_prompt().into(),
                        ..Default::default()
                    },
                ),
                ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessage {
                        content: ChatCompletionRequestUserMessageContent::Text(niche_prompt(niche)),
                        ..Default::default()
                    },
                ),
            ])
            .response_format(ChatCompletionResponseFormat {
                r#type: ChatCompletionResponseFormatType::JsonObject,
            })
            .build()?;
        Ok(req)
    }
}

#[async_trait]
impl LeadSource for GeminiLeads {
    async fn generate(&self, niche: &str) -> Result<Vec<LeadDraft>> {
        let req  = self.request(niche)?;
        let resp = self.client.chat().create(req).await?;

        let content = resp
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        parse_leads(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::LeadStatus;

    #[test]
    fn parses_well_formed_batch() {
        let body = r#"{"leads":[
            {"name":"Ana Lima","email":"ana@lima.com.br","phone":"(11) 91111-1111","niche":"Tecnologia","status":"NEW"},
            {"name":"Bruno Reis","email":"bruno@reis.com.br","phone":"(21) 92222-2222","niche":"Tecnologia","status":"PROSPECTED","company":"Reis Ltda","role":"CEO"}
        ]}"#;
        let drafts = parse_leads(body).unwrap();

        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].name, "Ana Lima");
        assert_eq!(drafts[1].status, Some(LeadStatus::Prospected));
        assert_eq!(drafts[1].company.as_deref(), Some("Reis Ltda"));
    }

    #[test]
    fn accepts_portuguese_keys() {
        let body = r#"{"leads":[{"nome":"Carla","email":"c@x.com","telefone":"(31) 93333-3333","nicho":"Saúde","status":"PROSPECTADO","empresa":"Clínica"}]}"#;
        let drafts = parse_leads(body).unwrap();

        assert_eq!(drafts[0].phone, "(31) 93333-3333");
        assert_eq!(drafts[0].niche.as_deref(), Some("Saúde"));
        assert_eq!(drafts[0].status, Some(LeadStatus::Prospected));
    }

    #[test]
    fn drops_incomplete_records_only() {
        let body = r#"{"leads":[
            {"name":"Ana","email":"a@x.com","phone":"(11) 91111-1111","niche":"x","status":"NEW"},
            {"name":"Sem Email","phone":"(11) 92222-2222","niche":"x","status":"NEW"},
            {"name":"  ","email":"b@x.com","phone":"(11) 93333-3333","niche":"x","status":"NEW"},
            {"name":"Dani","email":"d@x.com","phone":"(11) 94444-4444","status":"whatever"}
        ]}"#;
        let drafts = parse_leads(body).unwrap();

        let names: Vec<&str> = drafts.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["Ana", "Dani"]);
        assert_eq!(drafts[1].status, None);
    }

    #[test]
    fn empty_and_malformed_bodies_are_errors() {
        assert!(matches!(parse_leads(""), Err(GenerateError::EmptyResponse)));
        assert!(matches!(parse_leads("   \n"), Err(GenerateError::EmptyResponse)));
        assert!(matches!(parse_leads("not json"), Err(GenerateError::Malformed(_))));
        assert!(matches!(parse_leads(r#"{"items":[]}"#), Err(GenerateError::Malformed(_))));
    }

    #[test]
    fn zero_leads_is_not_an_error() {
        assert!(parse_leads(r#"{"leads":[]}"#).unwrap().is_empty());
    }

    #[test]
    fn strips_markdown_fence() {
        let body = "```json\n{\"leads\":[]}\n```";
        assert!(parse_leads(body).unwrap().is_empty());
    }

    #[test]
    fn prompt_embeds_niche_and_batch_size() {
        let p = niche_prompt("Marketing Digital");
        assert!(p.contains("\"Marketing Digital\""));
        assert!(p.contains("5 realistic leads"));
        assert!(p.contains("(XX) 9XXXX-XXXX"));
    }

    #[test]
    fn client_never_retries() {
        assert_eq!(single_attempt().max_elapsed_time, Some(Duration::ZERO));
    }

    #[test]
    fn request_uses_json_mode() {
        let agent = GeminiLeads::new("test-key", "http://localhost:1", "test-model");
        let req = agent.request("Imobiliária").unwrap();

        assert_eq!(req.model, "test-model");
        assert_eq!(req.messages.len(), 2);
        assert!(req.response_format.is_some());
    }
}
