//! Colibri: rule-driven structured data extraction
//!
//! This crate fetches content according to a declarative [`Rule`], parses it with
//! a content-type specific parser and walks a recursively nestable tree of
//! [`Selector`]s over the parsed document. Selectors may treat matched values as
//! links to fetch and extract in turn, which makes the extractor a small crawler.
//!
//! Requests are orchestrated politely: robots.txt is honoured, requests to the
//! same host are spaced by a per-host delay, and redirect chains and body sizes
//! are bounded.

pub mod config;
pub mod crawler;
pub mod error_set;
pub mod node;
pub mod output;
pub mod parser;
pub mod robots;
pub mod rules;
pub mod url;

use thiserror::Error;

/// Main error type for Colibri operations
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Content-Type does not match any parser: {content_type:?}")]
    NotMatch { content_type: String },

    #[error("Expression type {expr_type} not compatible with {node} node")]
    ExprType {
        expr_type: node::ExprType,
        node: &'static str,
    },

    #[error("Invalid expression: {0}")]
    Expr(String),

    #[error("Page not accessible due to robots.txt restriction: {url}")]
    RobotsRestriction { url: String },

    #[error("Max redirects limit reached ({max})")]
    MaxRedirects {
        max: usize,
        redirects: Vec<::url::Url>,
    },

    #[error("Response body exceeds {limit} bytes")]
    BodyTooLarge {
        limit: u64,
        response: Box<crawler::Response>,
    },

    #[error("Invalid URL value: {0}")]
    UrlCoercion(String),

    #[error("Max follow depth reached ({0})")]
    MaxDepth(usize),

    #[error("Invalid value: {0}")]
    Decode(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("HTTP client error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected fault: {0}")]
    Panic(String),

    #[error("{0}")]
    Set(error_set::ErrorSet),

    #[error("{errors}")]
    Extraction {
        output: Box<output::Output>,
        errors: error_set::ErrorSet,
    },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid rules: {0}")]
    Rules(error_set::ErrorSet),

    #[error("{0} is not configured")]
    Missing(&'static str),
}

/// Result type alias for Colibri operations
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use crawler::{Colibri, Response};
pub use error_set::ErrorSet;
pub use node::{ExprType, Node};
pub use output::Output;
pub use rules::{Rule, Selector};
