use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{ensure, Context, Result};

use crate::llm_client::DEFAULT_BASE_URL;
use crate::reactions::generator::GenerationSettings;

const MAX_RETRIES_LIMIT: u32 = 10;
const MAX_BACKOFF_MS: u64 = 60_000;

/// Application configuration loaded from environment variables.
/// Every variable has a default; invalid numbers fail startup.
#[derive(Clone)]
pub struct Config {
    pub voter_file: PathBuf,
    /// Optional: without it every reaction fails with `not_configured`.
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: String,
    pub port: u16,
    pub rust_log: String,
    pub reaction_concurrency: usize,
    pub reaction_timeout_secs: u64,
    pub reaction_max_retries: u32,
    pub reaction_backoff_ms: u64,
    pub default_sample_size: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let config = Config {
            voter_file: lookup("VOTER_FILE")
                .unwrap_or_else(|| "sample_voter_file.csv".to_string())
                .into(),
            gemini_api_key: lookup("GEMINI_API_KEY").filter(|k| !k.trim().is_empty()),
            gemini_base_url: lookup("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            port: parse_or(&lookup, "PORT", 8080)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            reaction_concurrency: parse_or(&lookup, "REACTION_CONCURRENCY", 4)?,
            reaction_timeout_secs: parse_or(&lookup, "REACTION_TIMEOUT_SECS", 30)?,
            reaction_max_retries: parse_or(&lookup, "REACTION_MAX_RETRIES", 2)?,
            reaction_backoff_ms: parse_or(&lookup, "REACTION_BACKOFF_MS", 500)?,
            default_sample_size: parse_or(&lookup, "DEFAULT_SAMPLE_SIZE", 3)?,
        };

        ensure!(
            config.reaction_concurrency >= 1,
            "REACTION_CONCURRENCY must be at least 1"
        );
        ensure!(
            config.reaction_max_retries <= MAX_RETRIES_LIMIT,
            "REACTION_MAX_RETRIES must be at most {MAX_RETRIES_LIMIT}"
        );
        ensure!(
            config.reaction_backoff_ms <= MAX_BACKOFF_MS,
            "REACTION_BACKOFF_MS must be at most {MAX_BACKOFF_MS}"
        );
        ensure!(
            config.default_sample_size >= 0,
            "DEFAULT_SAMPLE_SIZE must be non-negative"
        );
        Ok(config)
    }

    pub fn generation_settings(&self) -> GenerationSettings {
        GenerationSettings {
            concurrency: self.reaction_concurrency,
            call_timeout: Duration::from_secs(self.reaction_timeout_secs),
            max_retries: self.reaction_max_retries,
            initial_backoff: Duration::from_millis(self.reaction_backoff_ms),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("voter_file", &self.voter_file)
            .field(
                "gemini_api_key",
                &self.gemini_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("gemini_base_url", &self.gemini_base_url)
            .field("port", &self.port)
            .field("rust_log", &self.rust_log)
            .field("reaction_concurrency", &self.reaction_concurrency)
            .field("reaction_timeout_secs", &self.reaction_timeout_secs)
            .field("reaction_max_retries", &self.reaction_max_retries)
            .field("reaction_backoff_ms", &self.reaction_backoff_ms)
            .field("default_sample_size", &self.default_sample_size)
            .finish()
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.voter_file, PathBuf::from("sample_voter_file.csv"));
        assert_eq!(config.port, 8080);
        assert_eq!(config.default_sample_size, 3);
        assert!(config.gemini_api_key.is_none());

        let settings = config.generation_settings();
        assert_eq!(settings.concurrency, 4);
        assert_eq!(settings.call_timeout, Duration::from_secs(30));
        assert_eq!(settings.max_retries, 2);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("VOTER_FILE", "/data/voters.csv"),
            ("GEMINI_API_KEY", "secret"),
            ("REACTION_CONCURRENCY", "8"),
            ("REACTION_BACKOFF_MS", "250"),
        ])
        .unwrap();
        assert_eq!(config.voter_file, PathBuf::from("/data/voters.csv"));
        assert_eq!(config.gemini_api_key.as_deref(), Some("secret"));
        assert_eq!(config.generation_settings().concurrency, 8);
        assert_eq!(
            config.generation_settings().initial_backoff,
            Duration::from_millis(250)
        );
    }

    #[test]
    fn test_invalid_values_fail() {
        let err = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
        assert!(config_from(&[("REACTION_CONCURRENCY", "0")]).is_err());
    }

    #[test]
    fn test_retry_and_backoff_are_bounded() {
        let err = config_from(&[("REACTION_MAX_RETRIES", "4294967295")]).unwrap_err();
        assert!(err.to_string().contains("REACTION_MAX_RETRIES"));
        let err = config_from(&[("REACTION_BACKOFF_MS", "18446744073709551615")]).unwrap_err();
        assert!(err.to_string().contains("REACTION_BACKOFF_MS"));

        let config = config_from(&[
            ("REACTION_MAX_RETRIES", "10"),
            ("REACTION_BACKOFF_MS", "60000"),
        ])
        .unwrap();
        assert_eq!(config.generation_settings().max_retries, 10);
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = config_from(&[("GEMINI_API_KEY", "super-secret")]).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
