use crate::crawler::Response;
use crate::node::{ExprType, Node};
use crate::parser::path::{Item, Path};
use crate::parser::tree::{NodeKind, Tree};
use crate::Error;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::Value;
use std::rc::Rc;

/// Content types handled by [`XmlNode`]
pub const XML_PATTERN: &str = r"(?i)((application|image|message|model)/((\w|\.|-)+\+?)?|text/)(wb)?xml";

/// A node of a parsed XML document
#[derive(Debug, Clone)]
pub struct XmlNode {
    tree: Rc<Tree>,
    item: Item<usize>,
}

impl XmlNode {
    /// Parses an XML document and returns its root
    ///
    /// # Arguments
    ///
    /// * `xml` - Document text
    ///
    /// # Returns
    ///
    /// * `Ok(XmlNode)` - The document node
    /// * `Err(Error::Parse)` - The document is malformed
    pub fn parse(xml: &str) -> crate::Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut tree = Tree::new();
        let mut open = vec![Tree::ROOT];

        loop {
            let parent = open.last().copied().unwrap_or(Tree::ROOT);
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let id = tree.push(parent, element(&e)?);
                    open.push(id);
                }
                Ok(Event::Empty(e)) => {
                    tree.push(parent, element(&e)?);
                }
                Ok(Event::End(_)) => {
                    if open.len() > 1 {
                        open.pop();
                    }
                }
                Ok(Event::Text(t)) => {
                    let text = t.unescape().map_err(|e| parse_error(&reader, e))?;
                    if !text.is_empty() {
                        tree.push(parent, NodeKind::Text(text.into_owned()));
                    }
                }
                Ok(Event::CData(c)) => {
                    let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                    tree.push(parent, NodeKind::Text(text));
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(parse_error(&reader, e)),
            }
        }

        Ok(Self {
            tree: Rc::new(tree),
            item: Item::Node(Tree::ROOT),
        })
    }

    fn query(&self, expr: &str, expr_type: Option<ExprType>) -> crate::Result<Vec<Item<usize>>> {
        match expr_type {
            None | Some(ExprType::XPath) => {
                let Item::Node(id) = self.item else {
                    return Ok(Vec::new());
                };
                Ok(Path::parse(expr)?.select(&*self.tree, id))
            }
            Some(other) => Err(Error::ExprType {
                expr_type: other,
                node: "XML",
            }),
        }
    }

    fn wrap(&self, item: Item<usize>) -> Box<dyn Node> {
        Box::new(Self {
            tree: Rc::clone(&self.tree),
            item,
        })
    }
}

fn element(start: &BytesStart<'_>) -> crate::Result<NodeKind> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();

    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::Parse(format!("invalid XML attribute: {}", e)))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| Error::Parse(format!("invalid XML attribute {}: {}", key, e)))?
            .into_owned();
        attributes.push((key, value));
    }

    Ok(NodeKind::Element { name, attributes })
}

fn parse_error(reader: &Reader<&[u8]>, err: quick_xml::Error) -> Error {
    Error::Parse(format!(
        "invalid XML document at position {}: {}",
        reader.buffer_position(),
        err
    ))
}

/// Parses an XML response body
pub fn parse_xml(resp: &Response) -> crate::Result<XmlNode> {
    XmlNode::parse(&resp.text())
}

impl Node for XmlNode {
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
        Value::String(self.item.string_value(&*self.tree))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>News &amp; Notes</title>
    <item><title>First</title><link>https://feed.test/1</link></item>
    <item><title>Second</title><link>https://feed.test/2</link></item>
    <item lang="es"><title><![CDATA[Tercero <b>]]></title><link>https://feed.test/3</link></item>
    <empty flag="yes"/>
  </channel>
</rss>"#;

    fn root() -> XmlNode {
        XmlNode::parse(FEED).unwrap()
    }

    #[test]
    fn test_find_unescaped_text() {
        let title = root().find("/rss/channel/title", None).unwrap().unwrap();
        assert_eq!(title.value(), json!("News & Notes"));
    }

    #[test]
    fn test_find_all_items() {
        let links: Vec<Value> = root()
            .find_all("//item/link", None)
            .unwrap()
            .iter()
            .map(|n| n.value())
            .collect();
        assert_eq!(
            links,
            vec![
                json!("https://feed.test/1"),
                json!("https://feed.test/2"),
                json!("https://feed.test/3")
            ]
        );
    }

    #[test]
    fn test_cdata_and_attributes() {
        let item = root().find("//item[@lang='es']", None).unwrap().unwrap();
        assert_eq!(item.find("/title", None).unwrap().unwrap().value(), json!("Tercero <b>"));
        assert_eq!(item.find("/@lang", None).unwrap().unwrap().value(), json!("es"));

        let flag = root().find("//empty/@flag", None).unwrap().unwrap();
        assert_eq!(flag.value(), json!("yes"));
    }

    #[test]
    fn test_positional_predicate() {
        let second = root().find("//item[2]/title", None).unwrap().unwrap();
        assert_eq!(second.value(), json!("Second"));
    }

    #[test]
    fn test_css_rejected() {
        assert!(matches!(
            root().find("item", Some(ExprType::Css)),
            Err(Error::ExprType { .. })
        ));
    }

    #[test]
    fn test_large_sitemap_in_document_order() {
        let mut sitemap = String::from(r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#);
        for i in 0..20_000 {
            sitemap.push_str(&format!(
                "<url><loc>https://site.test/{}</loc><priority>0.5</priority></url>",
                i
            ));
        }
        sitemap.push_str("</urlset>");
        let doc = XmlNode::parse(&sitemap).unwrap();

        let start = std::time::Instant::now();
        let locs = doc.find_all("//loc", None).unwrap();
        let elapsed = start.elapsed();

        assert_eq!(locs.len(), 20_000);
        assert_eq!(locs[0].value(), json!("https://site.test/0"));
        assert_eq!(locs[19_999].value(), json!("https://site.test/19999"));
        assert!(elapsed < std::time::Duration::from_secs(2), "took {:?}", elapsed);
    }

    #[test]
    fn test_malformed_document() {
        assert!(matches!(
            XmlNode::parse("<a><b></a>"),
            Err(Error::Parse(_))
        ));
    }
}
