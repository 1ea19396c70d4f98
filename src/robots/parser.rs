//! Robots.txt policy parsing
//!
//! Matching is delegated to the robotstxt crate; this module decides which
//! policy a robots.txt response stands for.

use robotstxt::DefaultMatcher;

/// The access policy of one host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedRobots {
    /// Every path may be fetched
    AllowAll,

    /// No path may be fetched
    DisallowAll,

    /// Raw robots.txt content, evaluated per request
    Rules(String),
}

impl ParsedRobots {
    /// Creates a policy from raw robots.txt content
    ///
    /// Empty content allows everything.
    pub fn from_content(content: &str) -> Self {
        if content.trim().is_empty() {
            Self::AllowAll
        } else {
            Self::Rules(content.to_string())
        }
    }

    /// Creates a policy from the response to a robots.txt request
    ///
    /// | Status | Policy             |
    /// |--------|--------------------|
    /// | 2xx    | parsed from `body` |
    /// | 4xx    | allow all          |
    /// | 5xx    | disallow all       |
    /// | other  | allow all          |
    ///
    /// # Arguments
    ///
    /// * `status` - HTTP status of the robots.txt response
    /// * `body` - Response body
    pub fn from_status_and_body(status: u16, body: &[u8]) -> Self {
        match status {
            200..=299 => Self::from_content(&String::from_utf8_lossy(body)),
            400..=499 => Self::AllowAll,
            500..=599 => Self::DisallowAll,
            _ => Self::AllowAll,
        }
    }

    /// Checks if a URL is allowed for the given user agent
    ///
    /// # Arguments
    ///
    /// * `url` - The full URL to check
    /// * `user_agent` - The User-Agent header; only its product token is matched
    ///   against `User-agent:` lines
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        match self {
            Self::AllowAll => true,
            Self::DisallowAll => false,
            Self::Rules(content) => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(content, product_token(user_agent), url)
            }
        }
    }
}

/// `colibri/0.2 (+https://example.com)` -> `colibri`
fn product_token(user_agent: &str) -> &str {
    let end = user_agent
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(user_agent.len());
    &user_agent[..end]
}
