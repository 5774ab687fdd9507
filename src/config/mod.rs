pub mod validation;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use self::validation::validate_config;

/// Environment variable naming an alternate config file path.
pub const CONFIG_PATH_ENV: &str = "ARCHCHAT_CONFIG";
/// Environment variable overriding `server.max_turn_duration_secs`.
pub const MAX_TURN_SECS_ENV: &str = "ARCHCHAT_MAX_TURN_SECS";

/// Error type for configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub base_path: String,
    /// Wall-clock ceiling for one chat turn, connect plus streaming.
    #[serde(default = "default_max_turn_duration_secs")]
    pub max_turn_duration_secs: u64,
    #[serde(default = "default_http_pool_max_idle_per_host")]
    pub http_pool_max_idle_per_host: usize,
    #[serde(default = "default_http_pool_idle_timeout_secs")]
    pub http_pool_idle_timeout_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_worker_threads: Option<usize>,
}

fn default_port() -> u16 {
    3000
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_max_turn_duration_secs() -> u64 {
    60
}
fn default_http_pool_max_idle_per_host() -> usize {
    16
}
fn default_http_pool_idle_timeout_secs() -> u64 {
    15
}

impl ServerConfig {
    #[must_use]
    pub fn max_turn_duration(&self) -> Duration {
        Duration::from_secs(self.max_turn_duration_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            base_path: String::new(),
            max_turn_duration_secs: default_max_turn_duration_secs(),
            http_pool_max_idle_per_host: default_http_pool_max_idle_per_host(),
            http_pool_idle_timeout_secs: default_http_pool_idle_timeout_secs(),
            runtime_worker_threads: None,
        }
    }
}

/// Model provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Credential; normally filled from `api_key_env` at startup.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Overrides the built-in architect system prompt.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Appended to the final user turn of every outbound request; `null` disables it.
    #[serde(default = "default_steering_suffix")]
    pub steering_suffix: Option<String>,
    /// Extended-thinking budget sent when a caller asks for reasoning.
    #[serde(default)]
    pub thinking_budget_tokens: Option<u64>,
}

fn default_base_url() -> String {
    "https://api.anthropic.com".to_string()
}
fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}
fn default_api_version() -> String {
    "2023-06-01".to_string()
}
fn default_model() -> String {
    "claude-3-5-sonnet-20241022".to_string()
}
fn default_max_tokens() -> u64 {
    8192
}
fn default_temperature() -> f64 {
    0.7
}
#[allow(clippy::unnecessary_wraps)]
fn default_steering_suffix() -> Option<String> {
    Some(" Do not ask any questions.".to_string())
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            api_key_env: default_api_key_env(),
            api_version: default_api_version(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            system_prompt: None,
            steering_suffix: default_steering_suffix(),
            thinking_budget_tokens: None,
        }
    }
}

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Feature flags and settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Log full inbound and outbound request bodies at debug level.
    #[serde(default)]
    pub log_payloads: bool,
}

fn default_log_level() -> String {
    "INFO".to_string()
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::Text,
            log_payloads: false,
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub features: FeaturesConfig,
}

/// Load configuration from a YAML file and validate it.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when reading the file fails, [`ConfigError::Yaml`]
/// when parsing fails, or [`ConfigError::Validation`] when semantic validation fails.
pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parse and validate configuration from YAML text.
///
/// # Errors
///
/// Returns [`ConfigError::Yaml`] or [`ConfigError::Validation`].
pub fn parse_config(contents: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = serde_yaml::from_str(contents)?;
    validate_config(&config)?;
    Ok(config)
}

/// Load configuration like [`load_config`], falling back to defaults when the
/// file does not exist, then apply environment overrides.
///
/// # Errors
///
/// Returns any error other than a missing file, or a validation error raised
/// after the environment overrides are applied.
pub fn load_config_with_env(path: &str) -> Result<AppConfig, ConfigError> {
    let mut config = match load_config(path) {
        Ok(config) => config,
        Err(ConfigError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            AppConfig::default()
        }
        Err(err) => return Err(err),
    };
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config)?;
    Ok(config)
}

/// Apply environment overrides using the given lookup.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] when an override cannot be parsed.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = lookup(&config.upstream.api_key_env) {
        let key = key.trim();
        if !key.is_empty() {
            config.upstream.api_key = Some(key.to_string());
        }
    }
    if let Some(raw) = lookup(MAX_TURN_SECS_ENV) {
        let secs = raw.trim().parse::<u64>().map_err(|_| {
            ConfigError::Validation(format!("{MAX_TURN_SECS_ENV} must be an integer, got '{raw}'"))
        })?;
        config.server.max_turn_duration_secs = secs;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_example_config() {
        let config = load_config("config.example.yaml");
        assert!(
            config.is_ok(),
            "Failed to load example config: {:?}",
            config.err()
        );
        let config = config.unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.max_turn_duration_secs, 60);
        assert_eq!(config.upstream.max_tokens, 8192);
        assert_eq!(
            config.upstream.steering_suffix.as_deref(),
            Some(" Do not ask any questions.")
        );
        assert!(config.upstream.api_key.is_none());
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = parse_config("{}").unwrap();
        assert_eq!(config.upstream.model, "claude-3-5-sonnet-20241022");
        assert!((config.upstream.temperature - 0.7).abs() < f64::EPSILON);
        assert_eq!(config.upstream.api_key_env, "ANTHROPIC_API_KEY");
        assert_eq!(config.features.log_level, "INFO");
    }

    #[test]
    fn test_log_format_parses_and_rejects_unknown() {
        let config = parse_config("features:\n  log_format: json\n").unwrap();
        assert_eq!(config.features.log_format, LogFormat::Json);
        assert_eq!(parse_config("{}").unwrap().features.log_format, LogFormat::Text);
        assert!(matches!(
            parse_config("features:\n  log_format: xml\n"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_null_steering_suffix_disables_it() {
        let config = parse_config("upstream:\n  steering_suffix: null\n").unwrap();
        assert!(config.upstream.steering_suffix.is_none());
    }

    #[test]
    fn test_env_overrides_credential_and_ceiling() {
        let mut config = AppConfig::default();
        apply_env_overrides(&mut config, |name| match name {
            "ANTHROPIC_API_KEY" => Some(" sk-test ".to_string()),
            MAX_TURN_SECS_ENV => Some("15".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.upstream.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.server.max_turn_duration(), Duration::from_secs(15));
    }

    #[test]
    fn test_blank_credential_is_ignored() {
        let mut config = AppConfig::default();
        apply_env_overrides(&mut config, |name| {
            (name == "ANTHROPIC_API_KEY").then(|| "   ".to_string())
        })
        .unwrap();
        assert!(config.upstream.api_key.is_none());
    }

    #[test]
    fn test_huge_ceiling_in_yaml_is_rejected() {
        let err = parse_config("server:\n  max_turn_duration_secs: 18446744073709551615\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_bad_ceiling_override_is_rejected() {
        let mut config = AppConfig::default();
        let err = apply_env_overrides(&mut config, |name| {
            (name == MAX_TURN_SECS_ENV).then(|| "soon".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }
}
