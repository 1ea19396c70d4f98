use crate::config::types::{Config, ExtractorConfig, RequestDefaults};
use crate::ConfigError;
use reqwest::header::HeaderValue;

/// Upper bound for `redirects`
const MAX_REDIRECTS: usize = 100;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_extractor_config(&config.extractor)?;
    validate_request_defaults(&config.defaults)?;
    Ok(())
}

/// Validates extractor configuration
fn validate_extractor_config(config: &ExtractorConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    HeaderValue::from_str(&config.user_agent).map_err(|_| {
        ConfigError::Validation(format!(
            "user-agent must be a valid header value, got '{}'",
            config.user_agent
        ))
    })?;

    Ok(())
}

/// Validates request defaults
fn validate_request_defaults(config: &RequestDefaults) -> Result<(), ConfigError> {
    if config.redirects > MAX_REDIRECTS {
        return Err(ConfigError::Validation(format!(
            "redirects must be <= {}, got {}",
            MAX_REDIRECTS, config.redirects
        )));
    }

    Ok(())
}
