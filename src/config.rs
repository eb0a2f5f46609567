//! # Configuration Module
//!
//! Process configuration read from the environment (and an optional `.env`
//! file), plus the recovery settings shared by the capability adapters.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::logging::LogFormat;

pub const DEFAULT_VISION_API_BASE: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_VISION_MODEL: &str = "qwen/qwen-2.5-vl-7b-instruct:free";
pub const DEFAULT_VISION_MAX_TOKENS: u32 = 300;
pub const DEFAULT_GENERATION_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_GENERATION_MODEL: &str = "gpt-4";
pub const DEFAULT_GENERATION_MAX_TOKENS: u32 = 1000;
pub const DEFAULT_MAX_RECIPES_PER_USER: i64 = 50;
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 3;
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 5;

/// Recovery configuration for capability calls
#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    /// Deadline for a single capability call in seconds
    pub operation_timeout_secs: u64,
    /// Consecutive failures before the circuit opens
    pub circuit_breaker_threshold: u32,
    /// Seconds the circuit stays open before letting a call through
    pub circuit_breaker_reset_secs: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            operation_timeout_secs: 60,
            circuit_breaker_threshold: 5,
            circuit_breaker_reset_secs: 60, // 1 minute
        }
    }
}

impl RecoveryConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}

/// Endpoint settings for one OpenAI-compatible capability
#[derive(Debug, Clone)]
pub struct CapabilityConfig {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub database_url: String,
    pub database_max_connections: u32,
    pub vision: CapabilityConfig,
    pub generation: CapabilityConfig,
    pub recovery: RecoveryConfig,
    /// Upper bound on recipes shown in the saved-recipes list
    pub max_recipes_per_user: i64,
    /// How long in-flight updates may run after a shutdown signal
    pub shutdown_grace: Duration,
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from the process environment, reading `.env` first.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let require = |key: &str| get(key).ok_or_else(|| anyhow!("{key} must be set"));

        let telegram_bot_token = require("TELEGRAM_BOT_TOKEN")?;
        let database_url = require("DATABASE_URL")?;

        let shared_key = get("OPENAI_API_KEY");
        let vision_key = get("VISION_API_KEY")
            .or_else(|| shared_key.clone())
            .context("VISION_API_KEY or OPENAI_API_KEY must be set")?;
        let generation_key = get("GENERATION_API_KEY")
            .or(shared_key)
            .context("GENERATION_API_KEY or OPENAI_API_KEY must be set")?;

        let vision = CapabilityConfig {
            api_base: get("VISION_API_BASE").unwrap_or_else(|| DEFAULT_VISION_API_BASE.to_string()),
            api_key: vision_key,
            model: get("VISION_MODEL").unwrap_or_else(|| DEFAULT_VISION_MODEL.to_string()),
            max_tokens: parse_or("VISION_MAX_TOKENS", get("VISION_MAX_TOKENS"), DEFAULT_VISION_MAX_TOKENS)?,
        };

        let generation = CapabilityConfig {
            api_base: get("GENERATION_API_BASE")
                .unwrap_or_else(|| DEFAULT_GENERATION_API_BASE.to_string()),
            api_key: generation_key,
            model: get("GENERATION_MODEL").unwrap_or_else(|| DEFAULT_GENERATION_MODEL.to_string()),
            max_tokens: parse_or(
                "GENERATION_MAX_TOKENS",
                get("GENERATION_MAX_TOKENS"),
                DEFAULT_GENERATION_MAX_TOKENS,
            )?,
        };

        let defaults = RecoveryConfig::default();
        let recovery = RecoveryConfig {
            operation_timeout_secs: parse_or(
                "CAPABILITY_TIMEOUT_SECS",
                get("CAPABILITY_TIMEOUT_SECS"),
                defaults.operation_timeout_secs,
            )?,
            circuit_breaker_threshold: parse_or(
                "CIRCUIT_BREAKER_THRESHOLD",
                get("CIRCUIT_BREAKER_THRESHOLD"),
                defaults.circuit_breaker_threshold,
            )?,
            circuit_breaker_reset_secs: parse_or(
                "CIRCUIT_BREAKER_RESET_SECS",
                get("CIRCUIT_BREAKER_RESET_SECS"),
                defaults.circuit_breaker_reset_secs,
            )?,
        };

        // A bad limit is not worth refusing to start over.
        let max_recipes_per_user = get("MAX_RECIPES_PER_USER")
            .and_then(|value| value.trim().parse::<i64>().ok())
            .filter(|max| *max > 0)
            .unwrap_or(DEFAULT_MAX_RECIPES_PER_USER);

        let shutdown_grace = Duration::from_secs(parse_or(
            "SHUTDOWN_GRACE_SECS",
            get("SHUTDOWN_GRACE_SECS"),
            DEFAULT_SHUTDOWN_GRACE_SECS,
        )?);

        let database_max_connections = parse_or(
            "DATABASE_MAX_CONNECTIONS",
            get("DATABASE_MAX_CONNECTIONS"),
            DEFAULT_DATABASE_MAX_CONNECTIONS,
        )?;

        let log_format = match get("LOG_FORMAT") {
            Some(value) => value.parse()?,
            None if get("APP_ENVIRONMENT").as_deref() == Some("production") => LogFormat::Json,
            None => LogFormat::Pretty,
        };

        Ok(Self {
            telegram_bot_token,
            database_url,
            database_max_connections,
            vision,
            generation,
            recovery,
            max_recipes_per_user,
            shutdown_grace,
            log_format,
        })
    }
}

fn parse_or<T>(key: &str, value: Option<String>, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        None => Ok(default),
    }
}
