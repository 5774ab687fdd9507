use super::{AppConfig, ConfigError};

/// Validate the full application config, returning an error if any rule is violated.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] when any configuration invariant is violated.
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    validate_server_config(config)?;
    validate_upstream_config(config)?;
    validate_log_level(config)?;
    Ok(())
}

fn validation_err(msg: impl Into<String>) -> ConfigError {
    ConfigError::Validation(msg.into())
}

const MAX_TURN_DURATION_SECS: u64 = 3600;

fn validate_server_config(config: &AppConfig) -> Result<(), ConfigError> {
    let server = &config.server;
    if server.max_turn_duration_secs == 0 {
        return Err(validation_err(
            "server.max_turn_duration_secs must be greater than 0",
        ));
    }
    if server.max_turn_duration_secs > MAX_TURN_DURATION_SECS {
        return Err(validation_err(format!(
            "server.max_turn_duration_secs must be at most {MAX_TURN_DURATION_SECS}, got {}",
            server.max_turn_duration_secs
        )));
    }
    if server.http_pool_max_idle_per_host == 0 {
        return Err(validation_err(
            "server.http_pool_max_idle_per_host must be greater than 0",
        ));
    }
    if let Some(worker_threads) = server.runtime_worker_threads {
        if worker_threads == 0 {
            return Err(validation_err(
                "server.runtime_worker_threads must be greater than 0 when set",
            ));
        }
    }
    Ok(())
}

const MIN_THINKING_BUDGET_TOKENS: u64 = 1024;

fn validate_upstream_config(config: &AppConfig) -> Result<(), ConfigError> {
    let upstream = &config.upstream;
    let base_url = upstream.base_url.trim();
    if base_url.is_empty() {
        return Err(validation_err("upstream.base_url cannot be empty"));
    }
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(validation_err(format!(
            "upstream.base_url must start with http:// or https://, got '{base_url}'"
        )));
    }
    if upstream.model.trim().is_empty() {
        return Err(validation_err("upstream.model cannot be empty"));
    }
    if upstream.api_key_env.trim().is_empty() {
        return Err(validation_err("upstream.api_key_env cannot be empty"));
    }
    if upstream.max_tokens == 0 {
        return Err(validation_err("upstream.max_tokens must be greater than 0"));
    }
    if !(0.0..=1.0).contains(&upstream.temperature) {
        return Err(validation_err(format!(
            "upstream.temperature must be within [0.0, 1.0], got {}",
            upstream.temperature
        )));
    }
    if let Some(budget) = upstream.thinking_budget_tokens {
        if budget < MIN_THINKING_BUDGET_TOKENS {
            return Err(validation_err(format!(
                "upstream.thinking_budget_tokens must be at least {MIN_THINKING_BUDGET_TOKENS}"
            )));
        }
        if budget >= upstream.max_tokens {
            return Err(validation_err(
                "upstream.thinking_budget_tokens must be less than upstream.max_tokens",
            ));
        }
    }
    Ok(())
}

const VALID_LOG_LEVELS: &[&str] = &["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL", "DISABLED"];

fn validate_log_level(config: &AppConfig) -> Result<(), ConfigError> {
    let level = config.features.log_level.to_uppercase();
    if !VALID_LOG_LEVELS.contains(&level.as_str()) {
        return Err(validation_err(format!(
            "Invalid log_level '{}'. Must be one of: {}",
            config.features.log_level,
            VALID_LOG_LEVELS.join(", ")
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn zero_turn_ceiling_is_rejected() {
        let mut config = AppConfig::default();
        config.server.max_turn_duration_secs = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("max_turn_duration_secs"));
    }

    #[test]
    fn oversized_turn_ceiling_is_rejected() {
        let mut config = AppConfig::default();
        config.server.max_turn_duration_secs = MAX_TURN_DURATION_SECS;
        assert!(validate_config(&config).is_ok());

        config.server.max_turn_duration_secs = u64::MAX;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("at most 3600"));
    }

    #[test]
    fn temperature_out_of_range_is_rejected() {
        let mut config = AppConfig::default();
        config.upstream.temperature = 1.5;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn thinking_budget_must_fit_under_max_tokens() {
        let mut config = AppConfig::default();
        config.upstream.thinking_budget_tokens = Some(512);
        assert!(validate_config(&config).is_err());

        config.upstream.thinking_budget_tokens = Some(config.upstream.max_tokens);
        assert!(validate_config(&config).is_err());

        config.upstream.thinking_budget_tokens = Some(2048);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn base_url_needs_scheme() {
        let mut config = AppConfig::default();
        config.upstream.base_url = "api.anthropic.com".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn log_level_is_case_insensitive() {
        let mut config = AppConfig::default();
        config.features.log_level = "warning".to_string();
        assert!(validate_config(&config).is_ok());
        config.features.log_level = "verbose".to_string();
        assert!(validate_config(&config).is_err());
    }
}
