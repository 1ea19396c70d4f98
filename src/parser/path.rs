//! Path expressions over parsed trees
//!
//! Supports the subset of XPath that extraction rules use in practice:
//!
//! - `/` and `//` separators, `.` and `..`
//! - name tests, `*`, `text()`, `node()`
//! - attributes with `@name` and `@*`
//! - predicates `[n]`, `[last()]`, `[@a]`, `[@a='v']`, `[name]`,
//!   `[name='v']`, `[text()='v']` and their `!=` forms
//!
//! A leading `/` anchors at the node the query runs on, not at the document
//! root, so nested selectors can write `/@href` to read an attribute of the
//! matched element.

use crate::Error;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Navigation primitives a tree must offer to be queried
pub(crate) trait PathTree {
    type Id: Copy + Eq + Hash;

    fn parent(&self, id: Self::Id) -> Option<Self::Id>;

    fn children(&self, id: Self::Id) -> Vec<Self::Id>;

    /// Element name, `None` for text, document and other non-element nodes
    fn element_name(&self, id: Self::Id) -> Option<&str>;

    fn is_text(&self, id: Self::Id) -> bool;

    fn attribute(&self, id: Self::Id, name: &str) -> Option<String>;

    fn attribute_names(&self, id: Self::Id) -> Vec<String>;

    /// Concatenated text of the node and its descendants
    fn string_value(&self, id: Self::Id) -> String;
}

/// A selected node or attribute
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Item<Id> {
    Node(Id),
    Attr(Id, String),
}

impl<Id: Copy + Eq + Hash> Item<Id> {
    /// String value of the item
    pub(crate) fn string_value<T: PathTree<Id = Id>>(&self, tree: &T) -> String {
        match self {
            Item::Node(id) => tree.string_value(*id),
            Item::Attr(id, name) => tree.attribute(*id, name).unwrap_or_default(),
        }
    }
}

/// A compiled path expression
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Path {
    steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq)]
struct Step {
    descendant: bool,
    test: Test,
    predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, PartialEq)]
enum Test {
    SelfNode,
    Parent,
    Name(String),
    AnyElement,
    Text,
    AnyNode,
    Attr(String),
    AnyAttr,
}

#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    Position(usize),
    Last,
    Exists(Operand),
    Compare {
        operand: Operand,
        literal: String,
        negate: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Attr(String),
    Child(String),
    Text,
}

fn syntax(expr: &str, msg: &str) -> Error {
    Error::Expr(format!("{} in path {:?}", msg, expr))
}

impl Path {
    /// Compiles a path expression
    pub(crate) fn parse(expr: &str) -> Result<Self, Error> {
        let src = expr.trim();
        if src.is_empty() {
            return Err(syntax(expr, "empty expression"));
        }

        let mut cursor = Cursor::new(src);
        let mut steps = Vec::new();
        let mut descendant = if cursor.eat_str("//") {
            true
        } else {
            cursor.eat('/');
            false
        };

        if cursor.at_end() {
            if descendant {
                return Err(syntax(expr, "missing step after '//'"));
            }
            return Ok(Self { steps });
        }

        loop {
            steps.push(cursor.step(descendant).map_err(|msg| syntax(expr, msg))?);

            if cursor.at_end() {
                break;
            }
            if cursor.eat_str("//") {
                descendant = true;
            } else if cursor.eat('/') {
                descendant = false;
            } else {
                return Err(syntax(expr, "unexpected character"));
            }
            if cursor.at_end() {
                return Err(syntax(expr, "trailing separator"));
            }
        }

        Ok(Self { steps })
    }

    /// Evaluates the path with `context` as the starting node, in document order
    pub(crate) fn select<T: PathTree>(&self, tree: &T, context: T::Id) -> Vec<Item<T::Id>> {
        let mut current = vec![Item::Node(context)];
        let mut document_order: Option<HashMap<T::Id, usize>> = None;

        for step in &self.steps {
            let mut next: Vec<Item<T::Id>> = Vec::new();
            let mut seen: HashSet<Item<T::Id>> = HashSet::new();

            for item in &current {
                let Item::Node(id) = item else {
                    continue;
                };

                let origins = if step.descendant {
                    descendants_or_self(tree, *id)
                } else {
                    vec![*id]
                };

                for origin in origins {
                    for candidate in step.apply(tree, origin) {
                        if seen.insert(candidate.clone()) {
                            next.push(candidate);
                        }
                    }
                }
            }

            // results gathered from several origins are restored to document order
            if (step.descendant || current.len() > 1) && next.len() > 1 {
                let order = document_order.get_or_insert_with(|| {
                    descendants_or_self(tree, context)
                        .into_iter()
                        .enumerate()
                        .map(|(position, id)| (id, position))
                        .collect()
                });
                next.sort_by_cached_key(|item| {
                    let id = match item {
                        Item::Node(id) | Item::Attr(id, _) => id,
                    };
                    order.get(id).copied().unwrap_or(usize::MAX)
                });
            }

            current = next;
        }

        current
    }
}

impl Step {
    fn apply<T: PathTree>(&self, tree: &T, origin: T::Id) -> Vec<Item<T::Id>> {
        let mut candidates: Vec<Item<T::Id>> = match &self.test {
            Test::SelfNode => vec![Item::Node(origin)],
            Test::Parent => tree.parent(origin).map(Item::Node).into_iter().collect(),
            Test::Name(name) => tree
                .children(origin)
                .into_iter()
                .filter(|c| tree.element_name(*c) == Some(name.as_str()))
                .map(Item::Node)
                .collect(),
            Test::AnyElement => tree
                .children(origin)
                .into_iter()
                .filter(|c| tree.element_name(*c).is_some())
                .map(Item::Node)
                .collect(),
            Test::Text => tree
                .children(origin)
                .into_iter()
                .filter(|c| tree.is_text(*c))
                .map(Item::Node)
                .collect(),
            Test::AnyNode => tree.children(origin).into_iter().map(Item::Node).collect(),
            Test::Attr(name) => match tree.attribute(origin, name) {
                Some(_) => vec![Item::Attr(origin, name.clone())],
                None => Vec::new(),
            },
            Test::AnyAttr => tree
                .attribute_names(origin)
                .into_iter()
                .map(|name| Item::Attr(origin, name))
                .collect(),
        };

        for predicate in &self.predicates {
            candidates = match predicate {
                Predicate::Position(n) => candidates.into_iter().nth(n - 1).into_iter().collect(),
                Predicate::Last => candidates.pop().into_iter().collect(),
                other => candidates
                    .into_iter()
                    .filter(|item| other.matches(tree, item))
                    .collect(),
            };
        }

        candidates
    }
}

impl Predicate {
    fn matches<T: PathTree>(&self, tree: &T, item: &Item<T::Id>) -> bool {
        let Item::Node(id) = item else {
            return false;
        };

        match self {
            Predicate::Exists(operand) => !operand.values(tree, *id).is_empty(),
            Predicate::Compare {
                operand,
                literal,
                negate,
            } => {
                let values = operand.values(tree, *id);
                if *negate {
                    values.iter().any(|v| v != literal)
                } else {
                    values.iter().any(|v| v == literal)
                }
            }
            Predicate::Position(_) | Predicate::Last => true,
        }
    }
}

impl Operand {
    fn values<T: PathTree>(&self, tree: &T, id: T::Id) -> Vec<String> {
        match self {
            Operand::Attr(name) => tree.attribute(id, name).into_iter().collect(),
            Operand::Child(name) => tree
                .children(id)
                .into_iter()
                .filter(|c| tree.element_name(*c) == Some(name.as_str()))
                .map(|c| tree.string_value(c))
                .collect(),
            Operand::Text => tree
                .children(id)
                .into_iter()
                .filter(|c| tree.is_text(*c))
                .map(|c| tree.string_value(c))
                .collect(),
        }
    }
}

/// Pre-order walk starting at `id`
fn descendants_or_self<T: PathTree>(tree: &T, id: T::Id) -> Vec<T::Id> {
    let mut out = Vec::new();
    let mut stack = vec![id];

    while let Some(current) = stack.pop() {
        out.push(current);
        let mut children = tree.children(current);
        children.reverse();
        stack.extend(children);
    }

    out
}

struct Cursor {
    chars: Vec<char>,
    pos: usize,
}

impl Cursor {
    fn new(src: &str) -> Self {
        Self {
            chars: src.chars().collect(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, s: &str) -> bool {
        let len = s.chars().count();
        let matches = self.pos + len <= self.chars.len()
            && self.chars[self.pos..self.pos + len].iter().copied().eq(s.chars());
        if matches {
            self.pos += len;
        }
        matches
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn name(&mut self) -> Option<String> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            let allowed = c.is_alphanumeric()
                || c == '_'
                || c == '-'
                || c == ':'
                || (c == '.' && self.pos > start);
            if !allowed {
                break;
            }
            self.pos += 1;
        }

        (self.pos > start).then(|| self.chars[start..self.pos].iter().collect())
    }

    fn step(&mut self, descendant: bool) -> Result<Step, &'static str> {
        let test = if self.eat_str("..") {
            Test::Parent
        } else if self.eat('.') {
            Test::SelfNode
        } else if self.eat('@') {
            if self.eat('*') {
                Test::AnyAttr
            } else {
                Test::Attr(self.name().ok_or("missing attribute name")?)
            }
        } else if self.eat('*') {
            Test::AnyElement
        } else {
            let name = self.name().ok_or("missing step")?;
            if self.eat('(') {
                if !self.eat(')') {
                    return Err("unsupported function arguments");
                }
                match name.as_str() {
                    "text" => Test::Text,
                    "node" => Test::AnyNode,
                    _ => return Err("unsupported function"),
                }
            } else {
                Test::Name(name)
            }
        };

        let mut predicates = Vec::new();
        while self.eat('[') {
            self.skip_ws();
            predicates.push(self.predicate()?);
            self.skip_ws();
            if !self.eat(']') {
                return Err("unterminated predicate");
            }
        }

        Ok(Step {
            descendant,
            test,
            predicates,
        })
    }

    fn predicate(&mut self) -> Result<Predicate, &'static str> {
        if self.peek().is_some_and(|c| c.is_ascii_digit()) {
            let start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
            let digits: String = self.chars[start..self.pos].iter().collect();
            let n: usize = digits.parse().map_err(|_| "invalid position")?;
            if n == 0 {
                return Err("positions start at 1");
            }
            return Ok(Predicate::Position(n));
        }

        if self.eat_str("last()") {
            return Ok(Predicate::Last);
        }

        let operand = if self.eat('@') {
            Operand::Attr(self.name().ok_or("missing attribute name")?)
        } else if self.eat_str("text()") {
            Operand::Text
        } else {
            Operand::Child(self.name().ok_or("invalid predicate")?)
        };

        self.skip_ws();
        let negate = if self.eat_str("!=") {
            true
        } else if self.eat('=') {
            false
        } else {
            return Ok(Predicate::Exists(operand));
        };

        self.skip_ws();
        let literal = self.literal()?;
        Ok(Predicate::Compare {
            operand,
            literal,
            negate,
        })
    }

    fn literal(&mut self) -> Result<String, &'static str> {
        match self.peek() {
            Some(quote @ ('\'' | '"')) => {
                self.pos += 1;
                let start = self.pos;
                while self.peek().is_some_and(|c| c != quote) {
                    self.pos += 1;
                }
                if self.at_end() {
                    return Err("unterminated string literal");
                }
                let literal = self.chars[start..self.pos].iter().collect();
                self.pos += 1;
                Ok(literal)
            }
            Some(c) if c.is_ascii_digit() || c == '-' => {
                let start = self.pos;
                self.pos += 1;
                while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '.') {
                    self.pos += 1;
                }
                Ok(self.chars[start..self.pos].iter().collect())
            }
            _ => Err("expected literal"),
        }
    }
}
