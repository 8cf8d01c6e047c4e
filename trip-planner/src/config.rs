use ::config::builder::{ConfigBuilder, DefaultState};
use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub log_level: String,
    /// Fallback model key, used when the form does not supply one.
    pub google_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub serpapi_base_url: String,
    pub request_timeout_secs: u64,
    pub max_tool_rounds: usize,
    pub search_results: u32,
    /// Submissions allowed per minute across the process; 0 disables the limiter.
    pub rate_limit_per_minute: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Self::from_builder(
            ::config::Config::builder().add_source(::config::Environment::default()),
        )
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let settings = builder
            .set_default("port", 8080_i64)?
            .set_default("log_level", "info")?
            .set_default("gemini_model", "gemini-2.0-flash-exp")?
            .set_default("gemini_base_url", "https://generativelanguage.googleapis.com")?
            .set_default("serpapi_base_url", "https://serpapi.com")?
            .set_default("request_timeout_secs", 120_i64)?
            .set_default("max_tool_rounds", 8_i64)?
            .set_default("search_results", 10_i64)?
            .set_default("rate_limit_per_minute", 30_i64)?
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn fallback_api_key(&self) -> Option<&str> {
        self.google_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}
