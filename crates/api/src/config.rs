use std::env;
use std::path::PathBuf;
use std::time::Duration;

use farm_agents::DEFAULT_GENERATOR_TIMEOUT;
use farm_ml::{HttpGeneratorConfig, DEFAULT_MAX_OUTPUT_TOKENS};

pub const DEFAULT_BIND: &str = "0.0.0.0:5000";
pub const DEFAULT_GENERATOR_MODEL: &str = "flan-t5-base";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Runtime settings, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: String,
    /// `None` keeps the knowledge store in memory.
    pub database_url: Option<String>,
    pub generator: Option<HttpGeneratorConfig>,
    pub generator_timeout: Duration,
    pub freshness_model: Option<PathBuf>,
    pub allowed_origins: Vec<String>,
    pub rate_limit_window: Duration,
    pub rate_limit_max: usize,
    pub max_upload_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            database_url: None,
            generator: None,
            generator_timeout: DEFAULT_GENERATOR_TIMEOUT,
            freshness_model: None,
            allowed_origins: default_origins(),
            rate_limit_window: Duration::from_secs(60),
            rate_limit_max: 120,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let generator = non_empty_var("FARM_GENERATOR_URL").map(|endpoint| HttpGeneratorConfig {
            endpoint,
            model: non_empty_var("FARM_GENERATOR_MODEL")
                .unwrap_or_else(|| DEFAULT_GENERATOR_MODEL.to_string()),
            api_key: non_empty_var("FARM_GENERATOR_API_KEY"),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        });

        Self {
            bind: non_empty_var("FARM_BIND").unwrap_or(defaults.bind),
            database_url: non_empty_var("FARM_DATABASE_URL"),
            generator,
            generator_timeout: parsed_var::<u64>("FARM_GENERATOR_TIMEOUT_SECONDS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.generator_timeout),
            freshness_model: non_empty_var("FARM_FRESHNESS_MODEL").map(PathBuf::from),
            allowed_origins: non_empty_var("FARM_ALLOWED_ORIGINS")
                .map(|value| parse_origins(&value))
                .unwrap_or(defaults.allowed_origins),
            rate_limit_window: parsed_var::<u64>("FARM_RATE_LIMIT_WINDOW_SECONDS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.rate_limit_window),
            rate_limit_max: parsed_var("FARM_RATE_LIMIT_MAX").unwrap_or(defaults.rate_limit_max),
            max_upload_bytes: parsed_var("FARM_MAX_UPLOAD_BYTES")
                .unwrap_or(defaults.max_upload_bytes),
        }
    }
}

pub fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|origin| origin.trim().trim_end_matches('/').to_string())
        .filter(|origin| !origin.is_empty())
        .collect()
}

fn default_origins() -> Vec<String> {
    [
        "http://localhost:5500",
        "http://127.0.0.1:5500",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parsed_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    non_empty_var(key).and_then(|value| value.parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_trimmed_and_empty_entries_dropped() {
        assert_eq!(
            parse_origins(" https://farm.example/ ,, http://localhost:5500"),
            vec![
                "https://farm.example".to_string(),
                "http://localhost:5500".to_string()
            ]
        );
    }

    #[test]
    fn defaults_run_without_external_services() {
        let config = AppConfig::default();
        assert!(config.database_url.is_none());
        assert!(config.generator.is_none());
        assert!(config.freshness_model.is_none());
        assert_eq!(config.generator_timeout, Duration::from_secs(30));
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
    }
}
