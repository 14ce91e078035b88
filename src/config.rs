use std::path::PathBuf;

use anyhow::{Context, Result};
use config::{Config, Environment};
use serde::Deserialize;

use crate::parser::ParserOptions;

pub const ENV_PREFIX: &str = "POLICY";
const DEFAULT_DB_PATH: &str = "data/policies.sqlite";
const DEFAULT_USER_AGENT: &str = concat!("policy_scraper/", env!("CARGO_PKG_VERSION"));

/// Runtime settings: built-in defaults overlaid with `POLICY_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub db_path: PathBuf,
    pub min_text_length: usize,
    pub emphasis_headings: bool,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub max_pages: usize,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::builder()?
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()
            .context("Invalid POLICY_* settings")
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(Config::builder()
            .set_default("db_path", DEFAULT_DB_PATH)?
            .set_default("min_text_length", crate::parser::locate::DEFAULT_MIN_LENGTH as i64)?
            .set_default("emphasis_headings", false)?
            .set_default("user_agent", DEFAULT_USER_AGENT)?
            .set_default("request_timeout_secs", 30_i64)?
            .set_default("max_pages", 50_i64)?)
    }

    pub fn parser_options(&self) -> ParserOptions {
        ParserOptions {
            min_text_length: self.min_text_length,
            emphasis_headings: self.emphasis_headings,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            min_text_length: crate::parser::locate::DEFAULT_MIN_LENGTH,
            emphasis_headings: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: 30,
            max_pages: 50,
        }
    }
}
