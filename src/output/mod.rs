//! Extraction results
//!
//! An [`Output`] pairs the response a rule was fetched with and the data its
//! selectors extracted. It serializes as
//! `{"response": {"url", "code", "header", "redirects"}, "data": {...}}`,
//! the same shape followed links are embedded with.

use crate::crawler::Response;
use crate::ErrorSet;
use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};
use std::io::Write;

/// Result of extracting one rule
#[derive(Debug, Clone)]
pub struct Output {
    /// Response the data was extracted from
    pub response: Response,

    /// Selector name to extracted value; `None` when the rule has no selectors
    pub data: Option<Map<String, Value>>,
}

impl Output {
    pub fn new(response: Response) -> Self {
        Self {
            response,
            data: None,
        }
    }

    /// Returns the `{response, data}` representation
    pub fn serializable(&self) -> Value {
        json!({
            "response": self.response.serializable(),
            "data": self.data.clone().map_or(Value::Null, Value::Object),
        })
    }

    /// Returns the value extracted for `name`
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.data.as_ref()?.get(name)
    }
}

impl Serialize for Output {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.serializable().serialize(serializer)
    }
}

/// Writes a JSON document followed by a newline
///
/// # Arguments
///
/// * `out` - Destination
/// * `value` - Document to write
/// * `pretty` - Indent the document
pub fn write_json<W: Write>(mut out: W, value: &Value, pretty: bool) -> crate::Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| crate::Error::Decode(e.to_string()))?;

    writeln!(out, "{}", text)?;
    Ok(())
}

/// Builds the document printed for a failed extraction
///
/// Partial data is kept next to the structured error report.
pub fn failure_report(output: Option<&Output>, errors: &ErrorSet) -> Value {
    json!({
        "output": output.map_or(Value::Null, Output::serializable),
        "errors": errors.to_json(),
    })
}
