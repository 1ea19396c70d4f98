use crate::config::types::{Config, RequestDefaults};
use crate::config::validation::validate;
use crate::rules::Rule;
use crate::ConfigError;
use serde_json::Value;
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use colibri::config::load_config;
///
/// let config = load_config(Path::new("colibri.toml")).unwrap();
/// println!("User-Agent: {}", config.extractor.user_agent);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Loads a rule file
///
/// Files ending in `.toml` are read as TOML, anything else as JSON. Both use
/// the same case-insensitive field names; `defaults` fill in the request
/// settings the file leaves out.
///
/// # Arguments
///
/// * `path` - Path to the rule file
/// * `defaults` - Request defaults from the configuration
///
/// # Returns
///
/// * `Ok(Rule)` - A rule with a URL
/// * `Err(ConfigError)` - Unreadable file, malformed document, invalid
///   fields (all reported at once), or no URL
pub fn load_rules(path: &Path, defaults: &RequestDefaults) -> Result<Rule, ConfigError> {
    let content = std::fs::read_to_string(path)?;

    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    let value: Value = if is_toml {
        let doc: toml::Value = toml::from_str(&content)?;
        serde_json::to_value(doc)?
    } else {
        serde_json::from_str(&content)?
    };

    parse_rules(value, defaults)
}

/// Decodes a rule document on top of `defaults`
pub fn parse_rules(value: Value, defaults: &RequestDefaults) -> Result<Rule, ConfigError> {
    let rule = Rule::decode_onto(defaults.base_rule(), value).map_err(ConfigError::Rules)?;

    if rule.url.is_none() {
        return Err(ConfigError::Missing("rule URL"));
    }

    Ok(rule)
}
