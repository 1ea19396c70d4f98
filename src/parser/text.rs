use crate::crawler::Response;
use crate::node::{ExprType, Node};
use crate::Error;
use regex::Regex;
use serde_json::Value;

/// Content types handled by [`TextNode`]
pub const TEXT_PATTERN: &str = r"^text/plain";

/// Plain text, queried with regular expressions
///
/// Every match is itself a `TextNode`, so nested selectors narrow the text
/// found by their parent.
#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    data: String,
}

impl TextNode {
    pub fn new(data: impl Into<String>) -> Self {
        Self { data: data.into() }
    }

    fn regex(expr: &str, expr_type: Option<ExprType>) -> crate::Result<Regex> {
        match expr_type {
            None | Some(ExprType::Regex) => Regex::new(expr)
                .map_err(|e| Error::Expr(format!("invalid regular expression: {}", e))),
            Some(other) => Err(Error::ExprType {
                expr_type: other,
                node: "text",
            }),
        }
    }
}

/// Wraps a plain text response body
pub fn parse_text(resp: &Response) -> crate::Result<TextNode> {
    Ok(TextNode::new(resp.text()))
}

impl Node for TextNode {
    fn find(&self, expr: &str, expr_type: Option<ExprType>) -> crate::Result<Option<Box<dyn Node>>> {
        let re = Self::regex(expr, expr_type)?;
        Ok(re
            .find(&self.data)
            .map(|m| Box::new(TextNode::new(m.as_str())) as Box<dyn Node>))
    }

    fn find_all(&self, expr: &str, expr_type: Option<ExprType>) -> crate::Result<Vec<Box<dyn Node>>> {
        let re = Self::regex(expr, expr_type)?;
        Ok(re
            .find_iter(&self.data)
            .map(|m| Box::new(TextNode::new(m.as_str())) as Box<dyn Node>)
            .collect())
    }

    fn value(&self) -> Value {
        Value::String(self.data.clone())
    }
}
