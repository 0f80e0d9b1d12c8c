//! Markup-string-to-tree parsing
//!
//! Turns an XML string into an owned tree where each element exposes its
//! attributes under an `attributes` slot, its direct text content under a
//! `text` slot, and its child elements keyed by tag name. Repeated sibling
//! elements with the same tag collapse into an ordered list under that
//! tag; the [`Children`] variant keeps the single-vs-list distinction and
//! [`Children::nodes`] normalizes either shape to a sequence.
//!
//! Real-world package documents are inconsistent about namespace prefixes
//! and casing, so [`XmlNode::child`] and [`XmlNode::attr`] match on the
//! prefix-stripped local name, ASCII-case-insensitively. The raw names are
//! preserved as the map keys.

use std::collections::BTreeMap;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::XmlError;

/// Strip any `prefix:` from a tag or attribute name.
pub fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

/// One or many sibling elements sharing a tag name
#[derive(Debug, Clone, PartialEq)]
pub enum Children {
    Single(XmlNode),
    Many(Vec<XmlNode>),
}

impl Children {
    /// Normalize to a sequence regardless of shape.
    pub fn nodes(&self) -> Vec<&XmlNode> {
        match self {
            Children::Single(node) => vec![node],
            Children::Many(nodes) => nodes.iter().collect(),
        }
    }

    /// Whether the source had a single element (not a list) under this tag
    pub fn is_single(&self) -> bool {
        matches!(self, Children::Single(_))
    }

    fn push(&mut self, node: XmlNode) {
        match std::mem::replace(self, Children::Many(Vec::new())) {
            Children::Single(first) => *self = Children::Many(vec![first, node]),
            Children::Many(mut nodes) => {
                nodes.push(node);
                *self = Children::Many(nodes);
            }
        }
    }
}

/// An element in the parsed tree
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlNode {
    /// Attributes as declared, keyed by raw name
    pub attributes: BTreeMap<String, String>,
    /// Direct text content, concatenated across text nodes
    pub text: String,
    /// Child elements keyed by raw tag name
    pub children: BTreeMap<String, Children>,
}

impl XmlNode {
    /// Look up a child element set by local tag name, ignoring prefix and
    /// ASCII case.
    pub fn child(&self, local: &str) -> Option<&Children> {
        self.children
            .iter()
            .find(|(name, _)| local_name(name).eq_ignore_ascii_case(local))
            .map(|(_, children)| children)
    }

    /// Child elements under a tag, normalized to a sequence (empty when
    /// the tag is absent).
    pub fn child_nodes(&self, local: &str) -> Vec<&XmlNode> {
        self.child(local).map(Children::nodes).unwrap_or_default()
    }

    /// First child element under a tag
    pub fn first_child(&self, local: &str) -> Option<&XmlNode> {
        self.child_nodes(local).first().copied()
    }

    /// Look up an attribute by local name, ignoring prefix and ASCII case.
    pub fn attr(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| local_name(name).eq_ignore_ascii_case(local))
            .map(|(_, value)| value.as_str())
    }

    fn attach(&mut self, name: String, node: XmlNode) {
        match self.children.entry(name) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(Children::Single(node));
            }
            std::collections::btree_map::Entry::Occupied(mut slot) => {
                slot.get_mut().push(node);
            }
        }
    }
}

/// Parse a markup string into its root element.
pub fn parse(input: &str) -> Result<XmlNode, XmlError> {
    let mut reader = Reader::from_str(input);
    reader.trim_text(true);

    // (raw tag name, node under construction)
    let mut stack: Vec<(String, XmlNode)> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                let name = std::str::from_utf8(start.name().as_ref())?.to_string();
                stack.push((name, element_node(&start)?));
            }
            Event::Empty(start) => {
                let name = std::str::from_utf8(start.name().as_ref())?.to_string();
                let node = element_node(&start)?;
                close(&mut stack, &mut root, name, node);
            }
            Event::Text(text) => {
                if let Some((_, node)) = stack.last_mut() {
                    node.text.push_str(&text.unescape()?);
                }
            }
            Event::CData(cdata) => {
                if let Some((_, node)) = stack.last_mut() {
                    let bytes = cdata.into_inner();
                    node.text.push_str(std::str::from_utf8(&bytes)?);
                }
            }
            Event::End(_) => {
                if let Some((name, node)) = stack.pop() {
                    close(&mut stack, &mut root, name, node);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    root.ok_or(XmlError::NoRoot)
}

fn element_node(start: &quick_xml::events::BytesStart) -> Result<XmlNode, XmlError> {
    let mut node = XmlNode::default();
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
        let value = attr.unescape_value()?.into_owned();
        node.attributes.insert(key, value);
    }
    Ok(node)
}

fn close(
    stack: &mut Vec<(String, XmlNode)>,
    root: &mut Option<XmlNode>,
    name: String,
    node: XmlNode,
) {
    match stack.last_mut() {
        Some((_, parent)) => parent.attach(name, node),
        // Only the first document-level element becomes the root.
        None => {
            if root.is_none() {
                *root = Some(node);
            }
        }
    }
}
