//! Request rules and selector trees
//!
//! A [`Rule`] describes one request (method, URL, headers, politeness policy)
//! together with the selectors to evaluate against its response. Selectors may
//! nest, and a selector that follows links derives a fresh rule for each
//! sub-request with [`Selector::to_rule`].
//!
//! Rules are usually written as JSON objects with case-insensitive keys:
//!
//! ```
//! use colibri::Rule;
//!
//! let rule = Rule::from_json_str(r#"{
//!     "URL": "https://example.com",
//!     "delay": 500,
//!     "selectors": {
//!         "title": "//title",
//!         "links": {"expr": "//a/@href", "all": true, "follow": true}
//!     }
//! }"#).unwrap();
//!
//! assert_eq!(rule.selectors.len(), 2);
//! ```

mod decode;
mod rule;
mod selector;

pub use rule::Rule;
pub use selector::Selector;

/// Default User-Agent used when a rule does not carry one
pub const DEFAULT_USER_AGENT: &str = "colibri/0.2";
