//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use lead_tracker_core::validation::DEFAULT_MIN_PASSWORD_LEN;
use lead_tracker_core::CorruptionPolicy;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub data_dir: PathBuf,
    pub log_level: Level,
    pub cors_origin: String,
    pub login_delay: Duration,
    pub min_password_len: usize,
    pub corruption_policy: CorruptionPolicy,
    pub login_rate_limit: usize,
    pub login_rate_window: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server Settings ---
        let bind_address = parse_or(&lookup, "BIND_ADDRESS", "0.0.0.0:3000")?;
        let data_dir = lookup("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data"));
        let cors_origin =
            lookup("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Auth Settings ---
        let login_delay_ms: u64 = parse_or(&lookup, "LOGIN_DELAY_MS", "1000")?;
        let min_password_len = parse_or(
            &lookup,
            "MIN_PASSWORD_LENGTH",
            &DEFAULT_MIN_PASSWORD_LEN.to_string(),
        )?;
        let login_rate_limit = parse_or(&lookup, "LOGIN_RATE_LIMIT", "10")?;
        let login_rate_window_secs: u64 = parse_or(&lookup, "LOGIN_RATE_WINDOW_SECS", "60")?;

        // --- Storage Settings ---
        let corruption_policy = parse_or(&lookup, "CORRUPTION_POLICY", "reset")?;

        Ok(Self {
            bind_address,
            data_dir,
            log_level,
            cors_origin,
            login_delay: Duration::from_millis(login_delay_ms),
            min_password_len,
            corruption_policy,
            login_rate_limit,
            login_rate_window: Duration::from_secs(login_rate_window_secs),
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(name).unwrap_or_else(|| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}
