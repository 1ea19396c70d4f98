//! Arena tree shared by the XML and JSON parsers

use crate::parser::path::PathTree;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum NodeKind {
    Document,
    Element {
        name: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
}

impl NodeKind {
    pub(crate) fn element(name: impl Into<String>, attributes: Vec<(&str, &str)>) -> Self {
        Self::Element {
            name: name.into(),
            attributes: attributes
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
struct TreeNode {
    parent: Option<usize>,
    children: Vec<usize>,
    kind: NodeKind,
}

/// Nodes are stored in the order they are pushed, which parsers keep equal to
/// document order.
#[derive(Debug, Clone)]
pub(crate) struct Tree {
    nodes: Vec<TreeNode>,
}

impl Tree {
    pub(crate) const ROOT: usize = 0;

    pub(crate) fn new() -> Self {
        Self {
            nodes: vec![TreeNode {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Document,
            }],
        }
    }

    /// Appends a node under `parent` and returns its id
    pub(crate) fn push(&mut self, parent: usize, kind: NodeKind) -> usize {
        let id = self.nodes.len();
        self.nodes.push(TreeNode {
            parent: Some(parent),
            children: Vec::new(),
            kind,
        });
        self.nodes[parent].children.push(id);
        id
    }


    pub(crate) fn kind(&self, id: usize) -> Option<&NodeKind> {
        self.nodes.get(id).map(|n| &n.kind)
    }
}

impl PathTree for Tree {
    type Id = usize;

    fn parent(&self, id: usize) -> Option<usize> {
        self.nodes.get(id)?.parent
    }

    fn children(&self, id: usize) -> Vec<usize> {
        self.nodes
            .get(id)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn element_name(&self, id: usize) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Element { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }

    fn is_text(&self, id: usize) -> bool {
        matches!(self.kind(id), Some(NodeKind::Text(_)))
    }

    fn attribute(&self, id: usize, name: &str) -> Option<String> {
        match self.kind(id)? {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone()),
            _ => None,
        }
    }

    fn attribute_names(&self, id: usize) -> Vec<String> {
        match self.kind(id) {
            Some(NodeKind::Element { attributes, .. }) => {
                attributes.iter().map(|(k, _)| k.clone()).collect()
            }
            _ => Vec::new(),
        }
    }

    fn string_value(&self, id: usize) -> String {
        let mut out = String::new();
        let mut stack = vec![id];

        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(current) else {
                continue;
            };
            if let NodeKind::Text(text) = &node.kind {
                out.push_str(text);
            }
            stack.extend(node.children.iter().rev());
        }

        out
    }
}
