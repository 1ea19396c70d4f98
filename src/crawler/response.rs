use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};
use std::borrow::Cow;
use url::Url;

/// A fetched response
///
/// The body is fully buffered (and possibly truncated to the rule's body size
/// limit) by the time a response is handed to parsers.
#[derive(Debug, Clone)]
pub struct Response {
    /// Final URL, after redirects
    pub url: Url,

    /// HTTP status code
    pub status: u16,

    /// Response headers
    pub header: HeaderMap,

    /// URLs that answered with a redirect before the final one, in order
    pub redirects: Vec<Url>,

    /// Response body
    pub body: Vec<u8>,
}

impl Response {
    /// Creates an empty `200` response for `url`
    pub fn new(url: Url) -> Self {
        Self {
            url,
            status: 200,
            header: HeaderMap::new(),
            redirects: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Sets the Content-Type header; invalid header values are ignored
    pub fn with_content_type(mut self, content_type: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(content_type) {
            self.header.insert(CONTENT_TYPE, value);
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns the Content-Type header, or an empty string
    pub fn content_type(&self) -> &str {
        self.header
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }

    /// Returns the body as text, replacing invalid UTF-8 sequences
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Returns the `{url, code, header, redirects}` representation
    pub fn serializable(&self) -> Value {
        let mut header = Map::new();
        for name in self.header.keys() {
            let values: Vec<Value> = self
                .header
                .get_all(name)
                .iter()
                .map(|v| Value::String(String::from_utf8_lossy(v.as_bytes()).into_owned()))
                .collect();
            header.insert(name.as_str().to_string(), Value::Array(values));
        }

        let redirects: Vec<Value> = self
            .redirects
            .iter()
            .map(|u| Value::String(u.to_string()))
            .collect();

        json!({
            "url": self.url.as_str(),
            "code": self.status,
            "header": header,
            "redirects": redirects,
        })
    }
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.serializable().serialize(serializer)
    }
}
