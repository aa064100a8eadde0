use anyhow::{Context, Result};
use std::time::Duration;

pub const DEFAULT_OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Clone)]
pub struct Config {
    // Term cache
    pub cache_ttl: Duration,
    pub cache_sweep_cron: String,

    // Dictionary store
    pub database_url: String,

    // External translation service (OpenAI)
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_api_url: String,

    // HTTP surface
    pub api_key: Option<String>,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            cache_ttl: Duration::from_secs(parse_env_or("CACHE_TTL_SECONDS", 300)?),
            // Every minute (sec min hour day month weekday)
            cache_sweep_cron: std::env::var("CACHE_SWEEP_CRON")
                .unwrap_or_else(|_| "0 * * * * *".to_string()),

            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL not set")?,

            openai_api_key: std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY not set")?,
            openai_model: std::env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            openai_api_url: std::env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| DEFAULT_OPENAI_API_URL.to_string()),

            api_key: std::env::var("API_KEY").ok().filter(|k| !k.is_empty()),
            port: parse_env_or("PORT", 8080)?,
        })
    }
}

/// Parse an optional variable, falling back to `default` when unset.
/// A set but malformed value is an error rather than silently ignored.
fn parse_env_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", name, value)),
        Err(_) => Ok(default),
    }
}
