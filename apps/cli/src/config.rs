use anyhow::{Context, Result};

const DEFAULT_STAGE_TIMEOUT_SECS: u64 = 300;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub tavily_api_key: String,
    /// Per-stage budget covering the stage's internal retries.
    pub stage_timeout_secs: u64,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            tavily_api_key: require_env("TAVILY_API_KEY")?,
            stage_timeout_secs: std::env::var("STAGE_TIMEOUT_SECS")
                .unwrap_or_else(|_| DEFAULT_STAGE_TIMEOUT_SECS.to_string())
                .parse::<u64>()
                .context("STAGE_TIMEOUT_SECS must be a number of seconds")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
