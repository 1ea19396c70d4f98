use crate::error_set::ErrorSet;
use crate::node::ExprType;
use crate::rules::decode;
use crate::rules::Rule;
use reqwest::header::{HeaderMap, USER_AGENT};
use reqwest::Method;
use serde_json::{Map, Value};
use std::time::Duration;
use url::Url;

/// A named, possibly nested, possibly link-following extraction instruction
#[derive(Debug, Clone, Default)]
pub struct Selector {
    /// Key of the extracted value in the output
    pub name: String,

    /// Expression locating the value
    pub expr: String,

    /// Expression language; `None` lets the node pick its default
    pub expr_type: Option<ExprType>,

    /// Whether every match is returned instead of the first one
    pub all: bool,

    /// Whether matched values are fetched as links
    pub follow: bool,

    /// Method override for followed links
    pub method: Option<Method>,

    /// Proxy override for followed links
    pub proxy: Option<Url>,

    /// Header override for followed links
    pub header: Option<HeaderMap>,

    /// Timeout override for followed links (zero inherits)
    pub timeout: Duration,

    /// Selectors evaluated against each match (decoded ones are ordered by name)
    pub selectors: Vec<Selector>,

    /// Unrecognized fields, kept verbatim
    pub extra: Map<String, Value>,
}

impl Selector {
    /// Creates a selector with a name and an expression
    pub fn new(name: impl Into<String>, expr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expr: expr.into(),
            ..Self::default()
        }
    }

    pub fn with_type(mut self, expr_type: ExprType) -> Self {
        self.expr_type = Some(expr_type);
        self
    }

    pub fn all(mut self) -> Self {
        self.all = true;
        self
    }

    pub fn follow(mut self) -> Self {
        self.follow = true;
        self
    }

    pub fn with_selectors(mut self, selectors: Vec<Selector>) -> Self {
        self.selectors = selectors;
        self
    }

    /// Decodes a selector from its JSON value; a bare string is an expression
    pub fn from_json_value(name: &str, value: Value) -> Result<Self, ErrorSet> {
        decode::decode_selector(name, value)
    }

    /// Derives the rule used to fetch links found by this selector
    ///
    /// Method, proxy and header set on the selector win over the source rule.
    /// Without a selector header only the source User-Agent is carried over.
    /// A zero timeout inherits the source timeout. Cookies, robots handling,
    /// delay, redirect and body size limits always come from the source rule.
    pub fn to_rule(&self, src: &Rule) -> Rule {
        let method = self.method.clone().unwrap_or_else(|| src.method.clone());
        let proxy = self.proxy.clone().or_else(|| src.proxy.clone());

        let header = match &self.header {
            Some(header) => header.clone(),
            None => {
                let mut header = HeaderMap::new();
                if let Some(ua) = src.header.get(USER_AGENT) {
                    header.insert(USER_AGENT, ua.clone());
                }
                header
            }
        };

        let timeout = if self.timeout.is_zero() {
            src.timeout
        } else {
            self.timeout
        };

        Rule {
            method,
            url: None,
            proxy,
            header,
            timeout,
            cookies: src.cookies,
            ignore_robots_txt: src.ignore_robots_txt,
            delay: src.delay,
            redirects: src.redirects,
            response_body_size: src.response_body_size,
            selectors: self.selectors.clone(),
            extra: self.extra.clone(),
        }
    }
}
