use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::autosave::AutosaveConfig;

const DEFAULT_GATEWAY_URL: &str = "http://localhost:8080";

/// Persistence service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// When unset the service keeps resumes in memory.
    pub database_url: Option<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            port: parse_port(&env_or("PORT", "8080"))?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

/// Editor-side configuration: where the persistence service lives and how long
/// autosave waits for edits to settle.
#[derive(Debug, Clone)]
pub struct EditorConfig {
    pub gateway_url: String,
    pub autosave: AutosaveConfig,
}

impl EditorConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let delay = match std::env::var("AUTOSAVE_DELAY_MS") {
            Ok(raw) => parse_delay_ms(&raw)?,
            Err(_) => AutosaveConfig::default().delay,
        };

        Ok(EditorConfig {
            gateway_url: env_or("GATEWAY_URL", DEFAULT_GATEWAY_URL),
            autosave: AutosaveConfig { delay },
        })
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            autosave: AutosaveConfig::default(),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_port(raw: &str) -> Result<u16> {
    raw.trim()
        .parse::<u16>()
        .context("PORT must be a valid port number")
}

fn parse_delay_ms(raw: &str) -> Result<Duration> {
    let ms = raw
        .trim()
        .parse::<u64>()
        .with_context(|| format!("AUTOSAVE_DELAY_MS must be a number of milliseconds, got '{raw}'"))?;
    if ms == 0 {
        bail!("AUTOSAVE_DELAY_MS must be positive");
    }
    Ok(Duration::from_millis(ms))
}
