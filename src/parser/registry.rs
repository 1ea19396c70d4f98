use crate::crawler::Response;
use crate::node::Node;
use crate::parser::{html, json, text, xml};
use crate::rules::Rule;
use crate::Error;
use regex::Regex;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Turns a response into a queryable root [`Node`]
pub trait Parser: Send + Sync {
    /// Reports whether a parser is available for `content_type`
    fn matches(&self, content_type: &str) -> bool;

    /// Parses the response body with the parser matching its Content-Type
    fn parse(&self, rule: &Rule, resp: &Response) -> crate::Result<Box<dyn Node>>;

    /// Releases every registered parser
    fn clear(&self);
}

/// Constructor registered for a content-type pattern
pub type ParseFn = dyn Fn(&Response) -> crate::Result<Box<dyn Node>> + Send + Sync;

struct Entry {
    pattern: String,
    re: Regex,
    parse: Arc<ParseFn>,
}

/// Ordered registry of content-type patterns and their constructors
///
/// Lookups take a read lock and run in parallel; registration takes the write
/// lock. The first registered pattern that matches wins.
#[derive(Default)]
pub struct Parsers {
    entries: RwLock<Vec<Entry>>,
}

impl Parsers {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the HTML, JSON, plain text and XML parsers
    pub fn with_defaults() -> crate::Result<Self> {
        let parsers = Self::new();
        parsers.set(html::HTML_PATTERN, |resp| {
            Ok(Box::new(html::parse_html(resp)?) as Box<dyn Node>)
        })?;
        parsers.set(json::JSON_PATTERN, |resp| {
            Ok(Box::new(json::parse_json(resp)?) as Box<dyn Node>)
        })?;
        parsers.set(text::TEXT_PATTERN, |resp| {
            Ok(Box::new(text::parse_text(resp)?) as Box<dyn Node>)
        })?;
        parsers.set(xml::XML_PATTERN, |resp| {
            Ok(Box::new(xml::parse_xml(resp)?) as Box<dyn Node>)
        })?;
        Ok(parsers)
    }

    /// Registers `parse` for Content-Types matching the regular expression
    /// `pattern`
    ///
    /// Registering an already known pattern replaces its constructor in place.
    pub fn set<F>(&self, pattern: &str, parse: F) -> crate::Result<()>
    where
        F: Fn(&Response) -> crate::Result<Box<dyn Node>> + Send + Sync + 'static,
    {
        let re = Regex::new(pattern)
            .map_err(|e| Error::Expr(format!("invalid content-type pattern: {}", e)))?;
        let parse: Arc<ParseFn> = Arc::new(parse);

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.iter_mut().find(|e| e.pattern == pattern) {
            Some(entry) => entry.parse = parse,
            None => entries.push(Entry {
                pattern: pattern.to_string(),
                re,
                parse,
            }),
        }

        Ok(())
    }

    /// Number of registered patterns
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, content_type: &str) -> Option<Arc<ParseFn>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|e| e.re.is_match(content_type))
            .map(|e| Arc::clone(&e.parse))
    }
}

impl Parser for Parsers {
    fn matches(&self, content_type: &str) -> bool {
        self.lookup(content_type).is_some()
    }

    fn parse(&self, _rule: &Rule, resp: &Response) -> crate::Result<Box<dyn Node>> {
        let content_type = resp.content_type();
        let parse = self.lookup(content_type).ok_or_else(|| Error::NotMatch {
            content_type: content_type.to_string(),
        })?;

        debug!("Parsing {} as {}", resp.url, content_type);
        parse(resp)
    }

    fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl std::fmt::Debug for Parsers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_list()
            .entries(entries.iter().map(|e| e.pattern.as_str()))
            .finish()
    }
}
