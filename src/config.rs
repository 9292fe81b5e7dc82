//! Runtime configuration, read from the environment (and `.env` if present).

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,

    /// Credential for the generation endpoint. Never logged.
    pub api_key:  String,
    pub api_base: String,
    pub model:    String,

    /// Leads per dashboard page.
    pub page_size: usize,

    /// Where the theme preference is persisted.
    pub settings_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            host: env::var("LEADS_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),

            port: env::var("LEADS_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("Invalid LEADS_PORT")?,

            api_key: env::var("GEMINI_API_KEY")
                .or_else(|_| env::var("API_KEY"))
                .context("GEMINI_API_KEY (or API_KEY) not set")?,

            api_base: env::var("LEADS_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),

            model: env::var("LEADS_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),

            page_size: env::var("LEADS_PAGE_SIZE")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .context("Invalid LEADS_PAGE_SIZE")?,

            settings_path: env::var("LEADS_SETTINGS_PATH")
                .unwrap_or_else(|_| "./leads_settings.json".to_string())
                .into(),
        };

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("LEADS_PORT must be greater than 0");
        }
        if self.page_size == 0 {
            anyhow::bail!("LEADS_PAGE_SIZE must be greater than 0");
        }
        if self.api_key.trim().is_empty() {
            anyhow::bail!("GEMINI_API_KEY must not be empty");
        }

        Ok(())
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
