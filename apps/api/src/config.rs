use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_CORS_ORIGINS: &str = "http://localhost,http://localhost:3000";

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    /// Fixed pause between remote scoring calls.
    pub scoring_delay: Duration,
    pub max_upload_bytes: usize,
    pub cors_origins: Vec<String>,
    /// Per-client quota on the service banner at `/`.
    pub root_rate_limit_per_minute: u32,
    /// Archive uploads are enabled only when a bucket is configured.
    pub s3_bucket: Option<String>,
    pub aws_region: String,
    pub s3_endpoint: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let scoring_delay_secs = parse_env_or("SCORING_DELAY_SECS", 15u64)?;
        let max_upload_mb = parse_env_or("MAX_UPLOAD_MB", 50usize)?;

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: parse_env_or("PORT", 8000u16)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            scoring_delay: Duration::from_secs(scoring_delay_secs),
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            cors_origins: split_origins(
                &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| DEFAULT_CORS_ORIGINS.to_string()),
            ),
            root_rate_limit_per_minute: parse_env_or("ROOT_RATE_LIMIT_PER_MINUTE", 10u32)?,
            s3_bucket: optional_env("S3_BUCKET"),
            aws_region: std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            s3_endpoint: optional_env("S3_ENDPOINT"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
