//! Selector resolution
//!
//! Walks a selector tree over a parsed document. Failures never stop the walk:
//! each failing selector, match index or followed URL is recorded in an
//! [`ErrorSet`] under its own name and the remaining work carries on.

use crate::crawler::{Colibri, Response};
use crate::node::Node;
use crate::rules::{Rule, Selector};
use crate::url::{to_url, value_key};
use crate::{Error, ErrorSet};
use serde_json::{Map, Value};
use tracing::{trace, warn};

/// Outcome of one selector
struct Found {
    value: Option<Value>,
    error: Option<Error>,
}

impl Found {
    fn value(value: Value) -> Self {
        Self {
            value: Some(value),
            error: None,
        }
    }

    fn failed(error: Error) -> Self {
        Self {
            value: None,
            error: Some(error),
        }
    }

    /// A value together with whatever failed while building it
    fn partial(value: Value, errors: ErrorSet) -> Self {
        Self {
            value: Some(value),
            error: (!errors.is_empty()).then_some(Error::Set(errors)),
        }
    }
}

/// Resolves selectors against one response
pub(crate) struct Resolver<'a> {
    colibri: &'a Colibri,
    response: &'a Response,
    depth: usize,
}

impl<'a> Resolver<'a> {
    /// # Arguments
    ///
    /// * `colibri` - Used to extract followed links
    /// * `response` - Response the document was parsed from; relative links
    ///   resolve against its URL
    /// * `depth` - Number of links followed to reach `response`
    pub(crate) fn new(colibri: &'a Colibri, response: &'a Response, depth: usize) -> Self {
        Self {
            colibri,
            response,
            depth,
        }
    }

    /// Resolves every selector of `rule` against `node`
    ///
    /// # Returns
    ///
    /// The extracted data keyed by selector name, and the failures keyed the
    /// same way. A selector that partially failed appears in both.
    pub(crate) fn find_selectors(&self, rule: &Rule, node: &dyn Node) -> (Map<String, Value>, ErrorSet) {
        let mut data = Map::new();
        let mut errors = ErrorSet::new();

        for selector in &rule.selectors {
            let found = if selector.all {
                self.find_all(rule, selector, node)
            } else {
                self.find_one(rule, selector, node)
            };

            if let Some(err) = found.error {
                trace!("Selector {:?} failed: {}", selector.name, err);
                errors.add(selector.name.as_str(), err);
            }

            if let Some(value) = found.value {
                if data.contains_key(&selector.name) {
                    warn!("Duplicate selector name {:?}, keeping the last value", selector.name);
                }
                data.insert(selector.name.clone(), value);
            }
        }

        (data, errors)
    }

    fn find_one(&self, src: &Rule, selector: &Selector, node: &dyn Node) -> Found {
        let child = match node.find(&selector.expr, selector.expr_type) {
            Ok(Some(child)) => child,
            Ok(None) => return Found::value(Value::Null),
            Err(e) => return Found::failed(e),
        };

        if selector.follow {
            let (outputs, errors) = self.follow(&selector.to_rule(src), vec![child.value()]);
            return Found::partial(Value::Array(outputs), errors);
        }

        if !selector.selectors.is_empty() {
            let (data, errors) = self.find_selectors(&selector.to_rule(src), child.as_ref());
            return Found::partial(Value::Object(data), errors);
        }

        Found::value(child.value())
    }

    fn find_all(&self, src: &Rule, selector: &Selector, node: &dyn Node) -> Found {
        let children = match node.find_all(&selector.expr, selector.expr_type) {
            Ok(children) => children,
            Err(e) => return Found::failed(e),
        };
        trace!("Selector {:?} matched {} nodes", selector.name, children.len());

        if selector.follow {
            let values = children.iter().map(|c| c.value()).collect();
            let (outputs, errors) = self.follow(&selector.to_rule(src), values);
            return Found::partial(Value::Array(outputs), errors);
        }

        if selector.selectors.is_empty() {
            return Found::value(Value::Array(children.iter().map(|c| c.value()).collect()));
        }

        let rule = selector.to_rule(src);
        let mut items = Vec::with_capacity(children.len());
        let mut errors = ErrorSet::new();

        for (i, child) in children.iter().enumerate() {
            let (data, item_errors) = self.find_selectors(&rule, child.as_ref());
            errors.add_set(format!("{}+#{}", selector.name, i), item_errors);
            items.push(Value::Object(data));
        }

        Found::partial(Value::Array(items), errors)
    }

    /// Extracts every value as a link with `rule`
    ///
    /// Values that are not URLs are recorded under their string form and
    /// skipped. Each URL is extracted in turn and its failure recorded under
    /// the URL; a failed extraction that still produced output contributes
    /// that output.
    fn follow(&self, rule: &Rule, values: Vec<Value>) -> (Vec<Value>, ErrorSet) {
        let mut errors = ErrorSet::new();
        let mut urls = Vec::with_capacity(values.len());

        for value in &values {
            match to_url(value, &self.response.url) {
                Ok(url) => urls.push(url),
                Err(e) => {
                    errors.add(value_key(value), e);
                }
            }
        }

        let mut outputs = Vec::with_capacity(urls.len());
        for url in urls {
            let mut child = rule.clone();
            child.url = Some(url.clone());

            trace!("Following {} at depth {}", url, self.depth + 1);
            match self.colibri.extract_at(&child, self.depth + 1) {
                Ok(output) => outputs.push(output.serializable()),
                Err(Error::Extraction { output, errors: failed }) => {
                    outputs.push(output.serializable());
                    errors.add_set(url.as_str(), failed);
                }
                Err(e) => {
                    errors.add(url.as_str(), e);
                }
            }
        }

        (outputs, errors)
    }
}
