use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub port: u16,
    /// Anchor for absolute pagination links.
    pub base_url: String,
    pub identity_base_url: String,
    pub identity_api_key: String,
    pub xendit_base_url: String,
    pub xendit_api_key: String,
    pub xendit_callback_token: String,
    /// Offset of the venues' local time from UTC.
    pub venue_utc_offset_minutes: i32,
    pub sweep_interval: Duration,
    pub external_timeout: Duration,
    pub allowed_origins: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 30),
            port: parse_or("PORT", 8080),
            base_url: env::var("BASE_URL").context("BASE_URL must be set")?,
            identity_base_url: env::var("IDENTITY_BASE_URL")
                .context("IDENTITY_BASE_URL must be set")?,
            identity_api_key: env::var("IDENTITY_API_KEY")
                .context("IDENTITY_API_KEY must be set")?,
            xendit_base_url: env::var("XENDIT_BASE_URL")
                .unwrap_or_else(|_| "https://api.xendit.co".to_string()),
            xendit_api_key: env::var("XENDIT_API_KEY").context("XENDIT_API_KEY must be set")?,
            xendit_callback_token: env::var("XENDIT_CALLBACK_TOKEN")
                .context("XENDIT_CALLBACK_TOKEN must be set")?,
            venue_utc_offset_minutes: parse_or("VENUE_UTC_OFFSET_MINUTES", 7 * 60),
            sweep_interval: Duration::from_secs(parse_or("SWEEP_INTERVAL_SECS", 30)),
            external_timeout: Duration::from_secs(parse_or("EXTERNAL_TIMEOUT_SECS", 10)),
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        })
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
