//! HTML documents
//!
//! Parsed with `scraper`. Nodes answer path expressions (the default) and
//! CSS selectors; regular expressions are rejected.

use crate::crawler::Response;
use crate::node::{ExprType, Node};
use crate::parser::path::{Item, Path, PathTree};
use crate::Error;
use ego_tree::NodeId;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::rc::Rc;

/// Content types handled by [`HtmlNode`]
pub const HTML_PATTERN: &str = r"^text/html";

/// A node of a parsed HTML document
#[derive(Debug, Clone)]
pub struct HtmlNode {
    doc: Rc<Html>,
    item: Item<NodeId>,
}

impl HtmlNode {
    /// Parses a full HTML document and returns its root
    pub fn parse(html: &str) -> Self {
        let doc = Html::parse_document(html);
        let root = doc.tree.root().id();
        Self {
            doc: Rc::new(doc),
            item: Item::Node(root),
        }
    }

    fn wrap(&self, item: Item<NodeId>) -> Box<dyn Node> {
        Box::new(Self {
            doc: Rc::clone(&self.doc),
            item,
        })
    }

    fn query(&self, expr: &str, expr_type: Option<ExprType>) -> crate::Result<Vec<Item<NodeId>>> {
        match expr_type.unwrap_or(ExprType::XPath) {
            ExprType::XPath => {
                let Item::Node(id) = self.item else {
                    return Ok(Vec::new());
                };
                Ok(Path::parse(expr)?.select(&*self.doc, id))
            }
            ExprType::Css => self.css(expr),
            other => Err(Error::ExprType {
                expr_type: other,
                node: "HTML",
            }),
        }
    }

    fn css(&self, expr: &str) -> crate::Result<Vec<Item<NodeId>>> {
        let selector = Selector::parse(expr)
            .map_err(|e| Error::Expr(format!("{:?} in selector {:?}", e, expr)))?;

        let Item::Node(id) = self.item else {
            return Ok(Vec::new());
        };
        let Some(node) = self.doc.tree.get(id) else {
            return Ok(Vec::new());
        };

        let found = match ElementRef::wrap(node) {
            Some(element) => element
                .select(&selector)
                .map(|e| Item::Node(e.id()))
                .collect(),
            None if node.value().is_document() => self
                .doc
                .select(&selector)
                .map(|e| Item::Node(e.id()))
                .collect(),
            None => Vec::new(),
        };

        Ok(found)
    }
}

/// Parses an HTML response body
pub fn parse_html(resp: &Response) -> crate::Result<HtmlNode> {
    Ok(HtmlNode::parse(&resp.text()))
}

impl Node for HtmlNode {
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
        Value::String(self.item.string_value(&*self.doc))
    }
}

impl PathTree for Html {
    type Id = NodeId;

    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.tree.get(id)?.parent().map(|p| p.id())
    }

    fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.tree
            .get(id)
            .map(|n| n.children().map(|c| c.id()).collect())
            .unwrap_or_default()
    }

    fn element_name(&self, id: NodeId) -> Option<&str> {
        self.tree.get(id)?.value().as_element().map(|e| e.name())
    }

    fn is_text(&self, id: NodeId) -> bool {
        self.tree.get(id).is_some_and(|n| n.value().is_text())
    }

    fn attribute(&self, id: NodeId, name: &str) -> Option<String> {
        self.tree
            .get(id)?
            .value()
            .as_element()?
            .attr(name)
            .map(str::to_owned)
    }

    fn attribute_names(&self, id: NodeId) -> Vec<String> {
        self.tree
            .get(id)
            .and_then(|n| n.value().as_element())
            .map(|e| e.attrs().map(|(k, _)| k.to_string()).collect())
            .unwrap_or_default()
    }

    fn string_value(&self, id: NodeId) -> String {
        let Some(node) = self.tree.get(id) else {
            return String::new();
        };
        node.descendants()
            .filter_map(|n| n.value().as_text().map(|t| &**t))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PAGE: &str = r#"<html><head><title>My test page</title></head><body>
        <a id="first" href="https://page.test/html/1">Link 1</a>
        <a href="https://page.test/html/2">Link 2</a>
        <a href="/html/3">Link 3</a>
        <ul><li class="item">one</li><li class="item">two</li></ul>
    </body></html>"#;

    fn root() -> HtmlNode {
        HtmlNode::parse(PAGE)
    }

    #[test]
    fn test_path_title() {
        let title = root().find("//title", None).unwrap().unwrap();
        assert_eq!(title.value(), json!("My test page"));
    }

    #[test]
    fn test_css_title() {
        let title = root().find("title", Some(ExprType::Css)).unwrap().unwrap();
        assert_eq!(title.value(), json!("My test page"));
    }

    #[test]
    fn test_no_match_is_none() {
        assert!(root().find("//p", None).unwrap().is_none());
        assert!(root().find("p", Some(ExprType::Css)).unwrap().is_none());
    }

    #[test]
    fn test_find_all_text() {
        let links: Vec<Value> = root()
            .find_all("//a/text()", None)
            .unwrap()
            .iter()
            .map(|n| n.value())
            .collect();
        assert_eq!(links, vec![json!("Link 1"), json!("Link 2"), json!("Link 3")]);
    }

    #[test]
    fn test_find_all_empty() {
        assert!(root().find_all("//span", None).unwrap().is_empty());
        assert!(root().find_all("div", Some(ExprType::Css)).unwrap().is_empty());
    }

    #[test]
    fn test_attribute_relative_to_matched_element() {
        let anchors = root().find_all("a", Some(ExprType::Css)).unwrap();
        assert_eq!(anchors.len(), 3);

        let href = anchors[2].find("/@href", None).unwrap().unwrap();
        assert_eq!(href.value(), json!("/html/3"));

        assert!(anchors[1].find("/@id", None).unwrap().is_none());
        let id = anchors[0].find("/@id", Some(ExprType::XPath)).unwrap().unwrap();
        assert_eq!(id.value(), json!("first"));
    }

    #[test]
    fn test_css_scoped_to_node() {
        let list = root().find("//ul", None).unwrap().unwrap();
        let items = list.find_all("li.item", Some(ExprType::Css)).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].value(), json!("two"));
    }

    #[test]
    fn test_regex_rejected() {
        let err = root().find("Link", Some(ExprType::Regex)).err().unwrap();
        assert!(matches!(err, Error::ExprType { .. }));
    }

    #[test]
    fn test_invalid_expressions() {
        assert!(matches!(root().find("//a[", None), Err(Error::Expr(_))));
        assert!(matches!(
            root().find("a[[", Some(ExprType::Css)),
            Err(Error::Expr(_))
        ));
    }

    #[test]
    fn test_parse_response() {
        let resp = Response::new(url::Url::parse("https://page.test/").unwrap())
            .with_content_type("text/html")
            .with_body(PAGE);
        let root = parse_html(&resp).unwrap();
        assert!(root.find("//li", None).unwrap().is_some());
    }
}
