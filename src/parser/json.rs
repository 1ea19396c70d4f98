//! JSON documents
//!
//! The decoded value is laid out as a tree: object keys become elements named
//! after the key, array items become unnamed elements and scalars become text.
//! `//name` therefore finds every `name` key at any depth and `value()` of a
//! match is the JSON value stored under it.

use crate::crawler::Response;
use crate::node::{ExprType, Node};
use crate::parser::path::{Item, Path, PathTree};
use crate::parser::tree::{NodeKind, Tree};
use crate::Error;
use serde_json::Value;
use std::rc::Rc;

/// Content types handled by [`JsonNode`]
pub const JSON_PATTERN: &str = r"^application/(json|x-json|([a-z]+\+json))";

/// Decoded value plus its tree layout
///
/// Tree nodes do not copy JSON values; `positions[id]` is the index of node
/// `id` within its parent array, which together with element names locates
/// the node's value inside `root`.
#[derive(Debug)]
struct Document {
    tree: Tree,
    root: Value,
    positions: Vec<usize>,
}

impl Document {
    /// Value of the element (or the element owning a text node) `id`
    fn value_of(&self, id: usize) -> Option<&Value> {
        let mut id = id;
        if self.tree.is_text(id) {
            id = self.tree.parent(id)?;
        }

        let mut chain = Vec::new();
        let mut current = id;
        while let Some(parent) = self.tree.parent(current) {
            chain.push(current);
            current = parent;
        }

        let mut value = &self.root;
        for id in chain.into_iter().rev() {
            value = match value {
                Value::Array(items) => items.get(*self.positions.get(id)?)?,
                Value::Object(map) => map.get(self.tree.element_name(id)?)?,
                _ => return None,
            };
        }
        Some(value)
    }
}

/// A node of a decoded JSON document
#[derive(Debug, Clone)]
pub struct JsonNode {
    doc: Rc<Document>,
    item: Item<usize>,
}

impl JsonNode {
    /// Lays out `value` as a tree and returns its root
    pub fn new(value: Value) -> Self {
        let mut tree = Tree::new();
        let mut positions = vec![0];
        build(&mut tree, &mut positions, Tree::ROOT, &value);

        Self {
            doc: Rc::new(Document {
                tree,
                root: value,
                positions,
            }),
            item: Item::Node(Tree::ROOT),
        }
    }

    fn query(&self, expr: &str, expr_type: Option<ExprType>) -> crate::Result<Vec<Item<usize>>> {
        match expr_type {
            None | Some(ExprType::XPath) => {
                let Item::Node(id) = self.item else {
                    return Ok(Vec::new());
                };
                Ok(Path::parse(expr)?.select(&self.doc.tree, id))
            }
            Some(other) => Err(Error::ExprType {
                expr_type: other,
                node: "JSON",
            }),
        }
    }

    fn wrap(&self, item: Item<usize>) -> Box<dyn Node> {
        Box::new(Self {
            doc: Rc::clone(&self.doc),
            item,
        })
    }
}

fn build(tree: &mut Tree, positions: &mut Vec<usize>, parent: usize, value: &Value) {
    match value {
        Value::Object(map) => {
            for (position, (key, child)) in map.iter().enumerate() {
                let kind = NodeKind::element(key.as_str(), Vec::new());
                let id = push(tree, positions, parent, kind, position);
                build(tree, positions, id, child);
            }
        }
        Value::Array(items) => {
            for (position, child) in items.iter().enumerate() {
                let id = push(tree, positions, parent, NodeKind::element("", Vec::new()), position);
                build(tree, positions, id, child);
            }
        }
        Value::Null => {}
        Value::String(s) => {
            push(tree, positions, parent, NodeKind::Text(s.clone()), 0);
        }
        scalar => {
            push(tree, positions, parent, NodeKind::Text(scalar.to_string()), 0);
        }
    }
}

fn push(tree: &mut Tree, positions: &mut Vec<usize>, parent: usize, kind: NodeKind, position: usize) -> usize {
    let id = tree.push(parent, kind);
    positions.push(position);
    id
}

/// Decodes a JSON response body
pub fn parse_json(resp: &Response) -> crate::Result<JsonNode> {
    let value: Value = serde_json::from_slice(&resp.body)
        .map_err(|e| Error::Parse(format!("invalid JSON document: {}", e)))?;
    Ok(JsonNode::new(value))
}

impl Node for JsonNode {
    fn find(&self, expr: &str, expr_type: Option<ExprType>) -> crate::Result<Option<Box<dyn Node>>> {
        Ok(self
            .query(expr, expr_type)?
            .into_iter()
            .next()
            .map(|item| self.wrap(item)))
    }

    fn find_all(&self, expr: &str, expr_type: Option<ExprType>) -> crate::Result<Vec<Box<dyn Node>>> {
        Ok(self
            .query(expr, expr_type)?
            .into_iter()
            .map(|item| self.wrap(item))
            .collect())
    }

    fn value(&self) -> Value {
        match &self.item {
            Item::Node(id) => self
                .doc
                .value_of(*id)
                .cloned()
                .unwrap_or_else(|| Value::String(self.doc.tree.string_value(*id))),
            attr => Value::String(attr.string_value(&self.doc.tree)),
        }
    }
}
