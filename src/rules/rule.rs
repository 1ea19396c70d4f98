use crate::error_set::ErrorSet;
use crate::rules::decode;
use crate::rules::Selector;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Method;
use serde_json::{Map, Value};
use std::time::Duration;
use url::Url;

/// Declarative request configuration plus the selectors applied to its response
#[derive(Debug, Clone, Default)]
pub struct Rule {
    /// HTTP method (GET when not set)
    pub method: Method,

    /// Target URL of the request
    pub url: Option<Url>,

    /// Proxy to route the request through
    pub proxy: Option<Url>,

    /// Request headers
    pub header: HeaderMap,

    /// Time limit for the request (zero means no limit)
    pub timeout: Duration,

    /// Whether cookies are sent and stored
    pub cookies: bool,

    /// Whether robots.txt is ignored
    pub ignore_robots_txt: bool,

    /// Minimum spacing between requests to the same host
    pub delay: Duration,

    /// Maximum number of redirects followed
    pub redirects: usize,

    /// Maximum number of body bytes read (zero means unbounded)
    pub response_body_size: u64,

    /// Selectors evaluated against the response, in order
    ///
    /// Selectors decoded from a rule document come from a JSON object and are
    /// ordered by name, not by their position in the file.
    pub selectors: Vec<Selector>,

    /// Fields that are not part of the rule itself, kept verbatim
    pub extra: Map<String, Value>,
}

impl Rule {
    /// Creates a GET rule for `url`
    pub fn new(url: Url) -> Self {
        Self {
            url: Some(url),
            ..Self::default()
        }
    }

    /// Decodes a rule from a JSON value
    ///
    /// Keys are matched case-insensitively; unknown keys end up in
    /// [`Rule::extra`]. Every malformed field is reported under its key.
    pub fn from_json_value(value: Value) -> Result<Self, ErrorSet> {
        Self::decode_onto(Self::default(), value)
    }

    /// Decodes a rule from JSON text
    pub fn from_json_str(s: &str) -> Result<Self, ErrorSet> {
        let value: Value = serde_json::from_str(s).map_err(|e| {
            let mut errs = ErrorSet::new();
            errs.add("#", crate::Error::Decode(e.to_string()));
            errs
        })?;
        Self::from_json_value(value)
    }

    /// Decodes `value` on top of `base`, keeping base fields the value leaves out
    pub fn decode_onto(mut base: Self, value: Value) -> Result<Self, ErrorSet> {
        let Value::Object(raw) = value else {
            let mut errs = ErrorSet::new();
            errs.add("#", crate::Error::Decode("rules must be an object".to_string()));
            return Err(errs);
        };

        decode::decode_rule(&mut base, raw)?;
        Ok(base)
    }

    /// Returns the User-Agent header, if any
    pub fn user_agent(&self) -> Option<&str> {
        self.header.get(USER_AGENT).and_then(|v| v.to_str().ok())
    }

    /// Sets the User-Agent header
    pub fn set_user_agent(&mut self, user_agent: &str) -> crate::Result<()> {
        let value = HeaderValue::from_str(user_agent)
            .map_err(|e| crate::Error::Decode(format!("user agent: {}", e)))?;
        self.header.insert(USER_AGENT, value);
        Ok(())
    }

    /// Returns a copy of the request part of the rule without selectors
    pub(crate) fn request_only(&self) -> Self {
        Self {
            method: self.method.clone(),
            url: self.url.clone(),
            proxy: self.proxy.clone(),
            header: self.header.clone(),
            timeout: self.timeout,
            cookies: self.cookies,
            ignore_robots_txt: self.ignore_robots_txt,
            delay: self.delay,
            redirects: self.redirects,
            response_body_size: self.response_body_size,
            selectors: Vec::new(),
            extra: Map::new(),
        }
    }
}
