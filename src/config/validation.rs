use super::{AppConfig, ConfigError};

/// Validate the full application config, returning an error if any rule is violated.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] when any configuration invariant is violated.
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    validate_server_config(config)?;
    validate_upstream_config(config)?;
    validate_chat_config(config)?;
    validate_rate_limit_config(config)?;
    validate_log_level(config)?;
    Ok(())
}

fn validation_err(msg: impl Into<String>) -> ConfigError {
    ConfigError::Validation(msg.into())
}

fn validate_server_config(config: &AppConfig) -> Result<(), ConfigError> {
    let server = &config.server;
    if server.body_limit_bytes == 0 {
        return Err(validation_err(
            "server.body_limit_bytes must be greater than 0",
        ));
    }
    if server.http_pool_max_idle_per_host == 0 {
        return Err(validation_err(
            "server.http_pool_max_idle_per_host must be greater than 0",
        ));
    }
    if server.connect_timeout_secs == 0 {
        return Err(validation_err(
            "server.connect_timeout_secs must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_upstream_config(config: &AppConfig) -> Result<(), ConfigError> {
    let upstream = &config.upstream;
    if upstream.api_key.trim().is_empty() {
        return Err(validation_err("upstream.api_key cannot be empty"));
    }
    let parsed = url::Url::parse(&upstream.completions_url)
        .map_err(|err| validation_err(format!("upstream.completions_url is not a valid URL: {err}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(validation_err(
            "upstream.completions_url must use http:// or https://",
        ));
    }
    Ok(())
}

fn validate_chat_config(config: &AppConfig) -> Result<(), ConfigError> {
    let chat = &config.chat;
    if chat.model.trim().is_empty() {
        return Err(validation_err("chat.model cannot be empty"));
    }
    if !(0.0..=2.0).contains(&chat.temperature) {
        return Err(validation_err("chat.temperature must be between 0 and 2"));
    }
    if !(0.0..=1.0).contains(&chat.top_p) {
        return Err(validation_err("chat.top_p must be between 0 and 1"));
    }
    if !(-2.0..=2.0).contains(&chat.frequency_penalty) {
        return Err(validation_err(
            "chat.frequency_penalty must be between -2 and 2",
        ));
    }
    if !(-2.0..=2.0).contains(&chat.presence_penalty) {
        return Err(validation_err(
            "chat.presence_penalty must be between -2 and 2",
        ));
    }
    if chat.max_tokens == 0 {
        return Err(validation_err("chat.max_tokens must be greater than 0"));
    }
    Ok(())
}

fn validate_rate_limit_config(config: &AppConfig) -> Result<(), ConfigError> {
    let rate_limit = &config.rate_limit;
    if !rate_limit.enabled {
        return Ok(());
    }
    if rate_limit.max_requests == 0 {
        return Err(validation_err(
            "rate_limit.max_requests must be greater than 0 when enabled",
        ));
    }
    if rate_limit.window_secs == 0 {
        return Err(validation_err(
            "rate_limit.window_secs must be greater than 0 when enabled",
        ));
    }
    Ok(())
}

fn validate_log_level(config: &AppConfig) -> Result<(), ConfigError> {
    let valid_levels = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL", "DISABLED"];
    if !valid_levels.contains(&config.features.log_level.to_uppercase().as_str()) {
        return Err(validation_err(format!(
            "log_level must be one of {valid_levels:?}"
        )));
    }
    Ok(())
}
