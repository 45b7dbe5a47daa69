//! Tracer configuration.
//!
//! Settings come from `LANGFUSE_*` environment variables, optionally loaded from a
//! `.env` file first. Secrets are held in [`SecretString`] so they never show up in
//! `Debug` output or logs.

use crate::error::{LanternError, Result};
use regex::Regex;
use secrecy::SecretString;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_HOST: &str = "https://cloud.langfuse.com";

/// Configuration for a [`TracerSystem`](crate::tracer::TracerSystem).
#[derive(Clone, Debug)]
pub struct LanternConfig {
    pub public_key: String,
    pub secret_key: SecretString,
    pub host: String,
    pub release: Option<String>,
    /// Number of queued events that triggers an early background flush, and the
    /// maximum number of events per ingestion request.
    pub flush_at: usize,
    pub flush_interval: Duration,
    /// Events beyond this many are dropped oldest-first.
    pub queue_capacity: usize,
    pub max_retries: u32,
    pub timeout: Duration,
    pub sample_rate: f64,
    pub enabled: bool,
    pub redact_pattern: Option<Regex>,
    pub max_field_bytes: usize,
}

impl LanternConfig {
    pub fn new(public_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            secret_key: SecretString::new(secret_key.into()),
            host: DEFAULT_HOST.to_string(),
            release: None,
            flush_at: 15,
            flush_interval: Duration::from_millis(500),
            queue_capacity: 10_000,
            max_retries: 3,
            timeout: Duration::from_secs(20),
            sample_rate: 1.0,
            enabled: true,
            redact_pattern: None,
            max_field_bytes: 100_000,
        }
    }

    /// Read the configuration from the process environment.
    ///
    /// Both keys are required unless `LANGFUSE_TRACING_ENABLED` is false.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load a `.env` file into the environment, then read the configuration.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self> {
        dotenv::from_path(path.as_ref()).map_err(|e| {
            LanternError::ConfigError(format!(
                "failed to load {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_env()
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let enabled = parse_or("LANGFUSE_TRACING_ENABLED", &lookup, parse_bool, true)?;
        let public_key = lookup("LANGFUSE_PUBLIC_KEY").filter(|v| !v.is_empty());
        let secret_key = lookup("LANGFUSE_SECRET_KEY").filter(|v| !v.is_empty());

        let (public_key, secret_key) = match (public_key, secret_key) {
            (Some(public_key), Some(secret_key)) => (public_key, secret_key),
            (public_key, secret_key) if !enabled => {
                (public_key.unwrap_or_default(), secret_key.unwrap_or_default())
            }
            (None, _) => {
                return Err(LanternError::ConfigError(
                    "LANGFUSE_PUBLIC_KEY is not set".to_string(),
                ))
            }
            (_, None) => {
                return Err(LanternError::ConfigError(
                    "LANGFUSE_SECRET_KEY is not set".to_string(),
                ))
            }
        };

        let mut config = Self::new(public_key, secret_key);
        config.enabled = enabled;
        if let Some(host) = lookup("LANGFUSE_HOST").filter(|v| !v.is_empty()) {
            config.host = host.trim_end_matches('/').to_string();
        }
        config.release = lookup("LANGFUSE_RELEASE").filter(|v| !v.is_empty());
        config.flush_at = parse_or("LANGFUSE_FLUSH_AT", &lookup, parse_usize, config.flush_at)?;
        config.flush_interval =
            parse_or("LANGFUSE_FLUSH_INTERVAL", &lookup, parse_seconds, config.flush_interval)?;
        config.max_retries =
            parse_or("LANGFUSE_MAX_RETRIES", &lookup, parse_u32, config.max_retries)?;
        config.timeout = parse_or("LANGFUSE_TIMEOUT", &lookup, parse_seconds, config.timeout)?;
        config.sample_rate =
            parse_or("LANGFUSE_SAMPLE_RATE", &lookup, parse_rate, config.sample_rate)?;

        if config.flush_at == 0 {
            return Err(LanternError::ConfigError(
                "LANGFUSE_FLUSH_AT must be at least 1".to_string(),
            ));
        }

        debug!(
            host = %config.host,
            enabled = config.enabled,
            flush_at = config.flush_at,
            sample_rate = config.sample_rate,
            "Loaded tracer configuration"
        );

        Ok(config)
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_redact_pattern(mut self, pattern: Regex) -> Self {
        self.redact_pattern = Some(pattern);
        self
    }

    pub fn ingestion_url(&self) -> String {
        format!("{}/api/public/ingestion", self.host)
    }
}

/// Load `.env` from the working directory (or a parent), ignoring a missing file.
///
/// Returns the path that was loaded, if any.
pub fn load_env_file() -> Option<std::path::PathBuf> {
    dotenv::dotenv().ok()
}

fn parse_or<T, F, P>(key: &str, lookup: &F, parse: P, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    P: Fn(&str) -> Option<T>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => parse(raw.trim())
            .ok_or_else(|| {
                LanternError::ConfigError(format!("invalid value for {}: {}", key, raw))
            }),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_usize(raw: &str) -> Option<usize> {
    raw.parse().ok()
}

fn parse_u32(raw: &str) -> Option<u32> {
    raw.parse().ok()
}

fn parse_seconds(raw: &str) -> Option<Duration> {
    raw.parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
}

fn parse_rate(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|rate| (0.0..=1.0).contains(rate))
}
