//! Content parsers for Colibri
//!
//! A [`Parsers`] registry maps Content-Type patterns to constructors that turn
//! a response body into a root [`Node`](crate::Node). Built-in node kinds:
//!
//! | Kind  | Content types                         | Expressions         |
//! |-------|---------------------------------------|---------------------|
//! | HTML  | `text/html`                           | paths (default), CSS |
//! | JSON  | `application/json`, `*+json`          | paths               |
//! | text  | `text/plain`                          | regular expressions |
//! | XML   | `application/xml`, `text/xml`, `*+xml` | paths              |

mod html;
mod json;
pub(crate) mod path;
mod registry;
mod text;
pub(crate) mod tree;
mod xml;

pub use html::{parse_html, HtmlNode, HTML_PATTERN};
pub use json::{parse_json, JsonNode, JSON_PATTERN};
pub use registry::{ParseFn, Parser, Parsers};
pub use text::{parse_text, TextNode, TEXT_PATTERN};
pub use xml::{parse_xml, XmlNode, XML_PATTERN};
