use crate::rules::{Rule, DEFAULT_USER_AGENT};
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Colibri
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub extractor: ExtractorConfig,

    #[serde(default)]
    pub defaults: RequestDefaults,
}

/// Which collaborators the extractor installs
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// User-Agent for rules that do not set one
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Maximum number of links followed from the first response
    #[serde(rename = "max-follow-depth")]
    pub max_follow_depth: Option<usize>,

    /// Check robots.txt before each request
    #[serde(rename = "respect-robots")]
    pub respect_robots: bool,

    /// Space requests to the same host by the rule delay
    pub delay: bool,

    /// Keep a cookie store shared by rules with cookies enabled
    pub cookies: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_follow_depth: None,
            respect_robots: true,
            delay: true,
            cookies: true,
        }
    }
}

/// Request settings for rules that leave them out
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RequestDefaults {
    /// Request timeout (milliseconds, zero means no limit)
    pub timeout: u64,

    /// Minimum time between requests to the same host (milliseconds)
    pub delay: u64,

    /// Maximum number of redirects followed
    pub redirects: usize,

    /// Maximum number of body bytes read (zero means unbounded)
    #[serde(rename = "response-body-size")]
    pub response_body_size: u64,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            timeout: 30_000,
            delay: 0,
            redirects: 10,
            response_body_size: 0,
        }
    }
}

impl RequestDefaults {
    /// Returns an empty rule carrying these defaults
    pub fn base_rule(&self) -> Rule {
        Rule {
            timeout: Duration::from_millis(self.timeout),
            delay: Duration::from_millis(self.delay),
            redirects: self.redirects,
            response_body_size: self.response_body_size,
            ..Rule::default()
        }
    }
}
