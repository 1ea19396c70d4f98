//! URL handling for Colibri
//!
//! This module turns extracted values into absolute URLs and derives the
//! per-host keys used by the politeness machinery.

mod domain;

pub use domain::{host_key, is_robots_txt, robots_url, ROBOTS_TXT_PATH};

use crate::Error;
use serde_json::Value;
use url::Url;

/// Coerces an extracted value to a URL
///
/// Only strings are accepted. Relative references are resolved against
/// `base`, the URL of the response the value was found in.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use url::Url;
/// use colibri::url::to_url;
///
/// let base = Url::parse("https://example.com/list/").unwrap();
/// let url = to_url(&json!("../item/1"), &base).unwrap();
/// assert_eq!(url.as_str(), "https://example.com/item/1");
/// ```
pub fn to_url(value: &Value, base: &Url) -> Result<Url, Error> {
    let raw = value
        .as_str()
        .ok_or_else(|| Error::UrlCoercion(format!("{} must be a string", value)))?;

    let raw = raw.trim();
    if raw.is_empty() {
        return Err(Error::UrlCoercion("empty URL".to_string()));
    }

    base.join(raw)
        .map_err(|e| Error::UrlCoercion(format!("{}: {}", raw, e)))
}

/// Returns the string form of an extracted value, used to key coercion errors
pub fn value_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
