use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

use ego_tree::{NodeId, NodeRef};
use scraper::node::Node;
use scraper::{Html, Selector};

use crate::decode::{decode_html, DecodeError};

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements whose text children are written verbatim. The parser runs with
/// scripting enabled, so `noscript` content arrives as text.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "xmp", "iframe", "noembed", "noframes", "plaintext", "noscript",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key: String = key.into();
        self.set_attr(&key, value);
        self
    }

    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Case-insensitive comparison of an attribute's value.
    pub fn attr_is(&self, key: &str, expected: &str) -> bool {
        self.attr(key)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case(expected))
    }

    pub fn set_attr(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(key)) {
            Some((_, existing)) => *existing = value,
            None => self.attrs.push((key.to_string(), value)),
        }
    }

    /// Moves the value of `from` to `to`, keeping `from`'s position.
    /// Returns false when `from` is absent.
    pub fn rename_attr(&mut self, from: &str, to: &str) -> bool {
        let Some(idx) = self.attrs.iter().position(|(k, _)| k.eq_ignore_ascii_case(from)) else {
            return false;
        };
        self.attrs[idx].0 = to.to_string();
        let mut pos = 0;
        self.attrs.retain(|(k, _)| {
            let keep = pos == idx || !k.eq_ignore_ascii_case(to);
            pos += 1;
            keep
        });
        true
    }

    /// Whitespace-separated token lookup, as used by `rel` and `class`.
    pub fn has_token(&self, key: &str, token: &str) -> bool {
        self.attr(key).is_some_and(|v| {
            v.split_ascii_whitespace()
                .any(|t| t.eq_ignore_ascii_case(token))
        })
    }

    /// Opening tag as it would be serialized, for change records and logs.
    pub fn open_tag(&self) -> String {
        let mut out = String::new();
        write_open_tag(self, &mut out);
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Doctype {
        name: String,
        public_id: String,
        system_id: String,
    },
    Element(Element),
    Text(String),
    Comment(String),
}

/// One node of the mutable document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomNode {
    pub kind: NodeKind,
    pub children: Vec<DomNode>,
    /// Id of the parsed node this one was built from; `None` for nodes
    /// created afterwards.
    origin: Option<NodeId>,
}

impl DomNode {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Text(text.into()),
            children: Vec::new(),
            origin: None,
        }
    }

    pub fn origin(&self) -> Option<NodeId> {
        self.origin
    }

    pub fn as_element(&self) -> Option<&Element> {
        match &self.kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match &mut self.kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Concatenated direct text children only.
    pub fn own_text(&self) -> String {
        self.children
            .iter()
            .filter_map(|child| match &child.kind {
                NodeKind::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Concatenated text of the whole subtree.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// Replaces all children with a single text node.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children = vec![DomNode::text(text)];
    }
}

fn collect_text(node: &DomNode, out: &mut String) {
    for child in &node.children {
        match &child.kind {
            NodeKind::Text(t) => out.push_str(t),
            NodeKind::Element(_) => collect_text(child, out),
            _ => {}
        }
    }
}

/// What a visitor wants done with the node it just saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Keep the node and descend into its children.
    Continue,
    /// Keep the node but do not descend.
    SkipChildren,
    /// Detach the node together with its subtree.
    Remove,
}

pub trait NodeVisitor {
    fn visit(&mut self, node: &mut DomNode) -> Visit;
}

impl<F> NodeVisitor for F
where
    F: FnMut(&mut DomNode) -> Visit,
{
    fn visit(&mut self, node: &mut DomNode) -> Visit {
        self(node)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("cannot read document: {0}")]
    Read(#[from] io::Error),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// A parsed markup document. The tree as parsed is kept next to the mutable
/// one so CSS selectors can be evaluated against it.
#[derive(Debug, Clone)]
pub struct Document {
    root: DomNode,
    parsed: Html,
}

impl Document {
    pub fn parse(html: &str) -> Self {
        let parsed = Html::parse_document(html);
        let root = convert(parsed.tree.root()).unwrap_or(DomNode {
            kind: NodeKind::Document,
            children: Vec::new(),
            origin: None,
        });
        Self { root, parsed }
    }

    /// Ids of the parsed elements matching `selector`. Matching sees the
    /// document as it was read, before any mutation.
    pub fn select(&self, selector: &Selector) -> HashSet<NodeId> {
        self.parsed.select(selector).map(|el| el.id()).collect()
    }

    /// Decodes raw bytes and parses them. Returns the document together with
    /// the label of the encoding that was used.
    pub fn from_bytes(bytes: &[u8]) -> Result<(Self, String), ParseError> {
        let decoded = decode_html(bytes)?;
        Ok((Self::parse(&decoded.html), decoded.encoding_label))
    }

    pub fn read(path: &Path) -> Result<(Self, String), ParseError> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    pub fn root(&self) -> &DomNode {
        &self.root
    }

    /// Depth-first pre-order walk over every node below the document root.
    pub fn walk(&mut self, visitor: &mut dyn NodeVisitor) {
        walk_children(&mut self.root, visitor);
    }

    /// Calls `f` for every element, in document order.
    pub fn for_each_element<'a>(&'a self, mut f: impl FnMut(&'a DomNode, &'a Element)) {
        fn go<'a>(node: &'a DomNode, f: &mut dyn FnMut(&'a DomNode, &'a Element)) {
            for child in &node.children {
                if let NodeKind::Element(el) = &child.kind {
                    f(child, el);
                }
                go(child, f);
            }
        }
        go(&self.root, &mut f);
    }

    /// Points `<meta charset>` and `http-equiv` content-type declarations at
    /// UTF-8, the encoding [`Document::to_html`] produces. Returns how many
    /// declarations changed.
    pub fn declare_utf8(&mut self) -> usize {
        let mut changed = 0;
        self.walk(&mut |node: &mut DomNode| {
            let Some(el) = node.as_element_mut() else {
                return Visit::Continue;
            };
            if !el.is("meta") {
                return Visit::Continue;
            }
            if el.attr("charset").is_some() && !el.attr_is("charset", "utf-8") {
                el.set_attr("charset", "utf-8");
                changed += 1;
            } else if el.attr_is("http-equiv", "content-type")
                && el.attr("content").is_some_and(|c| {
                    let c = c.to_ascii_lowercase();
                    c.contains("charset=") && !c.contains("charset=utf-8")
                })
            {
                el.set_attr("content", "text/html; charset=utf-8");
                changed += 1;
            }
            Visit::SkipChildren
        });
        changed
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for child in &self.root.children {
            serialize(child, false, &mut out);
        }
        out
    }
}

fn walk_children(node: &mut DomNode, visitor: &mut dyn NodeVisitor) {
    let mut idx = 0;
    while idx < node.children.len() {
        match visitor.visit(&mut node.children[idx]) {
            Visit::Remove => {
                node.children.remove(idx);
                continue;
            }
            Visit::SkipChildren => {}
            Visit::Continue => walk_children(&mut node.children[idx], visitor),
        }
        idx += 1;
    }
}

fn convert(node: NodeRef<'_, Node>) -> Option<DomNode> {
    let kind = match node.value() {
        Node::Document | Node::Fragment => NodeKind::Document,
        Node::Doctype(doctype) => NodeKind::Doctype {
            name: doctype.name().to_string(),
            public_id: doctype.public_id().to_string(),
            system_id: doctype.system_id().to_string(),
        },
        Node::Element(element) => NodeKind::Element(Element {
            name: element.name().to_string(),
            attrs: element
                .attrs
                .iter()
                .map(|(name, value)| {
                    (qualified_name(name.prefix.as_deref(), &name.local), value.to_string())
                })
                .collect(),
        }),
        Node::Text(text) => NodeKind::Text(String::from(&**text)),
        Node::Comment(comment) => NodeKind::Comment(String::from(&**comment)),
        // The HTML parser turns processing instructions into comments.
        Node::ProcessingInstruction(_) => return None,
    };
    let children = node.children().filter_map(convert).collect();
    Some(DomNode {
        kind,
        children,
        origin: Some(node.id()),
    })
}

/// `prefix:local` for foreign attributes such as `xlink:href`.
fn qualified_name(prefix: Option<&str>, local: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}:{local}"),
        None => local.to_string(),
    }
}

fn serialize(node: &DomNode, raw_text: bool, out: &mut String) {
    match &node.kind {
        NodeKind::Document => {
            for child in &node.children {
                serialize(child, false, out);
            }
        }
        NodeKind::Doctype {
            name,
            public_id,
            system_id,
        } => {
            out.push_str("<!DOCTYPE ");
            out.push_str(name);
            if !public_id.is_empty() {
                out.push_str(&format!(" PUBLIC \"{public_id}\""));
                if !system_id.is_empty() {
                    out.push_str(&format!(" \"{system_id}\""));
                }
            } else if !system_id.is_empty() {
                out.push_str(&format!(" SYSTEM \"{system_id}\""));
            }
            out.push('>');
        }
        NodeKind::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeKind::Text(text) => {
            if raw_text {
                out.push_str(text);
            } else {
                escape_into(text, false, out);
            }
        }
        NodeKind::Element(el) => {
            write_open_tag(el, out);
            let lower = el.name.to_ascii_lowercase();
            if VOID_ELEMENTS.contains(&lower.as_str()) {
                return;
            }
            let raw = RAW_TEXT_ELEMENTS.contains(&lower.as_str());
            for child in &node.children {
                serialize(child, raw, out);
            }
            out.push_str("</");
            out.push_str(&el.name);
            out.push('>');
        }
    }
}

fn write_open_tag(el: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&el.name);
    for (key, value) in &el.attrs {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        escape_into(value, true, out);
        out.push('"');
    }
    out.push('>');
}

fn escape_into(text: &str, attr_mode: bool, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' if attr_mode => out.push_str("&quot;"),
            '<' if !attr_mode => out.push_str("&lt;"),
            '>' if !attr_mode => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}
