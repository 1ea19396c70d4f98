//! Uniform navigation over parsed documents
//!
//! Every supported content kind parses into a tree of [`Node`]s. The selector
//! resolver only ever talks to this trait; which expression types a node
//! accepts is decided by the node itself.

use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// The query language an expression is written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExprType {
    /// Path expressions over markup and structured records (the default)
    XPath,
    /// CSS selectors, markup only
    Css,
    /// Regular expressions, plain text only
    Regex,
}

impl ExprType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::XPath => "xpath",
            Self::Css => "css",
            Self::Regex => "regular",
        }
    }
}

impl fmt::Display for ExprType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExprType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("xpath") {
            Ok(Self::XPath)
        } else if s.eq_ignore_ascii_case("css") {
            Ok(Self::Css)
        } else if s.eq_ignore_ascii_case("regular") || s.eq_ignore_ascii_case("regex") {
            Ok(Self::Regex)
        } else {
            Err(format!("unknown expression type {:?}", s))
        }
    }
}

/// A handle into a parsed content tree
pub trait Node {
    /// Finds the first node matching `expr`, or `None` when nothing matches
    fn find(&self, expr: &str, expr_type: Option<ExprType>) -> crate::Result<Option<Box<dyn Node>>>;

    /// Finds every node matching `expr`; an empty vector is a valid outcome
    fn find_all(&self, expr: &str, expr_type: Option<ExprType>) -> crate::Result<Vec<Box<dyn Node>>>;

    /// Returns the scalar (or structured) value of the node
    fn value(&self) -> Value;
}
