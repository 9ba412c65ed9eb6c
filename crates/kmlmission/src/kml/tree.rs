//! Generic XML tree.
//!
//! Documents are converted into a schema-free [`Node`] tree before any
//! geometry lookup happens, so the locator never depends on a particular
//! KML layout.

use roxmltree::Document;

use crate::error::{Error, Result};

/// Key under which an element's own text is stored when it also has
/// attributes or child elements.
pub const TEXT_KEY: &str = "#text";

/// Prefix for attribute keys.
pub const ATTRIBUTE_PREFIX: &str = "@_";

/// A node of the generic document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Trimmed element text or an untyped attribute value.
    Text(String),
    /// A numeric attribute value.
    Number(f64),
    /// A boolean attribute value.
    Bool(bool),
    /// Repeated sibling elements sharing one name, in document order.
    List(Vec<Node>),
    /// Named children in document order.
    Map(Vec<(String, Node)>),
}

impl Node {
    /// Look up a child by key. Only maps have children.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Self::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// The text content of this node, if it has any.
    ///
    /// For maps this is the `#text` entry.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Map(_) => self.get(TEXT_KEY).and_then(Node::text),
            _ => None,
        }
    }

    /// Check if this node is a map.
    #[must_use]
    pub fn is_map(&self) -> bool {
        matches!(self, Self::Map(_))
    }
}

/// Deepest element nesting accepted in a document.
///
/// KML in the wild rarely goes past a few dozen levels. Anything deeper is
/// refused before the XML parser runs.
pub const MAX_DEPTH: usize = 256;

/// Parse XML text into a generic tree.
///
/// The returned node is a map holding the root element under its local name.
///
/// # Errors
///
/// Returns [`crate::Error::UnparsableDocument`] if the text is not
/// well-formed XML or nests elements deeper than [`MAX_DEPTH`].
pub fn parse_tree(text: &str) -> Result<Node> {
    check_depth(text)?;
    let doc = Document::parse(text)?;
    let root = doc.root_element();
    Ok(Node::Map(vec![(
        root.tag_name().name().to_string(),
        convert_element(root),
    )]))
}

/// Scan the markup for element nesting beyond [`MAX_DEPTH`].
///
/// Comments, CDATA, processing instructions and declarations are skipped, and
/// `>` inside quoted attribute values does not end a tag. Unterminated markup
/// is left for the parser to report.
fn check_depth(text: &str) -> Result<()> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut pos = 0;

    while let Some(offset) = bytes[pos..].iter().position(|&b| b == b'<') {
        let start = pos + offset;
        let rest = &bytes[start..];

        let consumed = if rest.starts_with(b"<!--") {
            skip_past(rest, b"-->")
        } else if rest.starts_with(b"<![CDATA[") {
            skip_past(rest, b"]]>")
        } else if rest.starts_with(b"<?") {
            skip_past(rest, b"?>")
        } else if rest.starts_with(b"<!") {
            skip_past(rest, b">")
        } else if rest.starts_with(b"</") {
            depth = depth.saturating_sub(1);
            skip_past(rest, b">")
        } else {
            start_tag_end(rest).map(|(len, self_closing)| {
                if !self_closing {
                    depth += 1;
                }
                len
            })
        };

        if depth > MAX_DEPTH {
            return Err(Error::unparsable(format!(
                "elements nested deeper than {MAX_DEPTH} levels"
            )));
        }
        let Some(consumed) = consumed else {
            break;
        };
        pos = start + consumed;
    }

    Ok(())
}

/// Length of `haystack` up to and including the first `needle`.
fn skip_past(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|index| index + needle.len())
}

/// Length of the start tag at the head of `rest`, and whether it closes itself.
fn start_tag_end(rest: &[u8]) -> Option<(usize, bool)> {
    let mut quote: Option<u8> = None;
    for (index, &byte) in rest.iter().enumerate().skip(1) {
        match (quote, byte) {
            (Some(open), _) if byte == open => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(byte),
            (None, b'>') => return Some((index + 1, rest[index - 1] == b'/')),
            (None, _) => {}
        }
    }
    None
}

/// An element whose children are still being converted.
struct Frame<'a, 'input> {
    name: &'a str,
    children: roxmltree::Children<'a, 'input>,
    entries: Vec<(String, Node)>,
    text: String,
}

impl<'a, 'input> Frame<'a, 'input> {
    fn open(element: roxmltree::Node<'a, 'input>) -> Self {
        let entries = element
            .attributes()
            .map(|attr| {
                (
                    format!("{ATTRIBUTE_PREFIX}{}", attr.name()),
                    typed_scalar(attr.value()),
                )
            })
            .collect();
        Self {
            name: element.tag_name().name(),
            children: element.children(),
            entries,
            text: String::new(),
        }
    }

    fn close(self) -> (&'a str, Node) {
        let Self {
            name,
            mut entries,
            text,
            ..
        } = self;
        let text = text.trim();

        if entries.is_empty() {
            return (name, Node::Text(text.to_string()));
        }
        if !text.is_empty() {
            entries.push((TEXT_KEY.to_string(), Node::Text(text.to_string())));
        }
        (name, Node::Map(entries))
    }
}

/// Convert an element and its descendants, using a heap stack of open
/// elements instead of recursion.
fn convert_element(root: roxmltree::Node<'_, '_>) -> Node {
    let mut stack = vec![Frame::open(root)];

    while let Some(frame) = stack.last_mut() {
        if let Some(child) = frame.children.next() {
            if child.is_element() {
                stack.push(Frame::open(child));
            } else if child.is_text() {
                frame.text.push_str(child.text().unwrap_or_default());
            }
            continue;
        }

        let Some(finished) = stack.pop() else {
            break;
        };
        let (name, node) = finished.close();
        match stack.last_mut() {
            Some(parent) => insert_child(&mut parent.entries, name, node),
            None => return node,
        }
    }

    Node::Text(String::new())
}

/// Add a child under `name`, turning repeated names into a list that keeps
/// the position of the first occurrence.
fn insert_child(entries: &mut Vec<(String, Node)>, name: &str, node: Node) {
    match entries.iter_mut().find(|(k, _)| k == name) {
        Some((_, Node::List(items))) => items.push(node),
        Some((_, existing)) => {
            let first = std::mem::replace(existing, Node::List(Vec::new()));
            *existing = Node::List(vec![first, node]);
        }
        None => entries.push((name.to_string(), node)),
    }
}

/// Interpret an attribute value as a typed scalar where unambiguous.
fn typed_scalar(raw: &str) -> Node {
    let value = raw.trim();
    match value {
        "true" => return Node::Bool(true),
        "false" => return Node::Bool(false),
        _ => {}
    }
    match value.parse::<f64>() {
        Ok(number) if number.is_finite() => Node::Number(number),
        _ => Node::Text(value.to_string()),
    }
}
