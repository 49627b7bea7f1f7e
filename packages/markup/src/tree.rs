//! # Live Tree
//!
//! Arena-backed DOM used as the rendering surface's live content.
//!
//! Nodes are addressed by [`NodeId`]. Removing a subtree frees its slots
//! without reusing them, so a stale id held across a content replacement
//! resolves to nothing instead of to an unrelated node.

use crate::error::{MarkupError, MarkupResult};
use crate::lexer::{decode_entities, is_raw_text, parse_attributes, tokenize, Token};
use crate::serializer;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Elements that never have children or a closing tag
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];

pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<Attribute>,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|classes| classes.split_ascii_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeKind {
    /// Fragment root (the surface's root container)
    Root,
    Element(Element),
    Text { content: String },
    Comment { content: String },
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena DOM with a single fragment root
#[derive(Debug, Clone)]
pub struct Dom {
    nodes: Vec<Option<NodeData>>,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom {
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(NodeData {
                kind: NodeKind::Root,
                parent: None,
                children: Vec::new(),
            })],
        }
    }

    /// Build a tree from a fragment
    pub fn parse_fragment(html: &str) -> Self {
        let mut dom = Self::new();
        let root = dom.root();
        dom.build_children(root, html);
        dom
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of live nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.children(self.root()).is_empty()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.data(node).is_some()
    }

    pub fn kind(&self, node: NodeId) -> Option<&NodeKind> {
        self.data(node).map(|d| &d.kind)
    }

    pub fn element(&self, node: NodeId) -> Option<&Element> {
        match self.kind(node) {
            Some(NodeKind::Element(el)) => Some(el),
            _ => None,
        }
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|el| el.tag.as_str())
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        self.element(node).is_some()
    }

    pub fn text(&self, node: NodeId) -> Option<&str> {
        match self.kind(node) {
            Some(NodeKind::Text { content }) => Some(content),
            _ => None,
        }
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.data(node).and_then(|d| d.parent)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.data(node).map(|d| d.children.as_slice()).unwrap_or(&[])
    }

    /// Ancestors from the parent upward, root included
    pub fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(node), move |&n| self.parent(n))
    }

    /// Nearest node, starting at `node` itself, matching the predicate
    pub fn closest<F>(&self, node: NodeId, mut predicate: F) -> Option<NodeId>
    where
        F: FnMut(&Dom, NodeId) -> bool,
    {
        std::iter::once(node)
            .chain(self.ancestors(node))
            .find(|&n| predicate(self, n))
    }

    /// All descendants in document order, `node` excluded
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node).and_then(|el| el.attr(name))
    }

    /// Set an attribute, keeping its position if it already exists
    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) -> MarkupResult<()> {
        let el = self.element_mut(node)?;
        match el.attrs.iter_mut().find(|a| a.name == name) {
            Some(attr) => attr.value = value.to_string(),
            None => el.attrs.push(Attribute {
                name: name.to_string(),
                value: value.to_string(),
            }),
        }
        Ok(())
    }

    pub fn remove_attr(&mut self, node: NodeId, name: &str) -> MarkupResult<()> {
        let el = self.element_mut(node)?;
        el.attrs.retain(|a| a.name != name);
        Ok(())
    }

    pub fn set_text(&mut self, node: NodeId, content: &str) -> MarkupResult<()> {
        let data = self.data_mut(node)?;
        match &mut data.kind {
            NodeKind::Text { content: existing } => {
                *existing = content.to_string();
                Ok(())
            }
            _ => Err(MarkupError::NotText(node)),
        }
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, node: NodeId) -> String {
        if let Some(text) = self.text(node) {
            return text.to_string();
        }
        self.descendants(node)
            .into_iter()
            .filter_map(|n| self.text(n))
            .collect()
    }

    /// Replace the children of `node` with the parsed fragment
    pub fn set_inner_html(&mut self, node: NodeId, html: &str) -> MarkupResult<()> {
        match self.kind(node) {
            None => return Err(MarkupError::UnknownNode(node)),
            Some(NodeKind::Root) => {}
            Some(NodeKind::Element(el)) if !is_void(&el.tag) => {}
            Some(_) => return Err(MarkupError::NotContainer(node)),
        }

        let old_children = std::mem::take(&mut self.data_mut(node)?.children);
        for child in old_children {
            self.free_subtree(child);
        }

        self.build_children(node, html);
        Ok(())
    }

    pub fn inner_html(&self, node: NodeId) -> String {
        serializer::inner_html(self, node)
    }

    pub fn outer_html(&self, node: NodeId) -> String {
        serializer::outer_html(self, node)
    }

    fn build_children(&mut self, parent: NodeId, html: &str) {
        let mut open: Vec<NodeId> = vec![parent];

        for token in tokenize(html) {
            let current = *open.last().unwrap_or(&parent);
            match token {
                Token::OpenTag(tag) => {
                    let name = tag.name.to_ascii_lowercase();
                    let attrs = parse_attributes(tag.attrs)
                        .into_iter()
                        .map(|(name, value)| Attribute { name, value })
                        .collect();
                    let void = is_void(&name);
                    let id = self.append(
                        current,
                        NodeKind::Element(Element { tag: name, attrs }),
                    );
                    if !void && !tag.self_closing {
                        open.push(id);
                    }
                }
                Token::CloseTag(name) => {
                    let name = name.to_ascii_lowercase();
                    // Never pop the node we are building into
                    let position = open
                        .iter()
                        .skip(1)
                        .rposition(|&n| self.tag(n) == Some(name.as_str()));
                    match position {
                        Some(pos) => open.truncate(pos + 1),
                        None => tracing::trace!(tag = %name, "Dropping stray close tag"),
                    }
                }
                Token::Text(raw) if self.tag(current).is_some_and(is_raw_text) => {
                    self.append_text(current, raw);
                }
                Token::Text(raw) => {
                    let decoded = decode_entities(raw);
                    self.append_text(current, &decoded);
                }
                Token::Comment(content) => {
                    self.append(
                        current,
                        NodeKind::Comment {
                            content: content.to_string(),
                        },
                    );
                }
                Token::Doctype => {}
            }
        }
    }

    /// Append text, merging into a trailing text sibling
    fn append_text(&mut self, parent: NodeId, content: &str) {
        if content.is_empty() {
            return;
        }
        let last = self.children(parent).last().copied();
        if let Some(last) = last {
            if let Some(NodeData {
                kind: NodeKind::Text { content: existing },
                ..
            }) = self.nodes.get_mut(last.0).and_then(|n| n.as_mut())
            {
                existing.push_str(content);
                return;
            }
        }
        self.append(
            parent,
            NodeKind::Text {
                content: content.to_string(),
            },
        );
    }

    fn append(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(NodeData {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        }));
        if let Some(Some(data)) = self.nodes.get_mut(parent.0) {
            data.children.push(id);
        }
        id
    }

    fn free_subtree(&mut self, node: NodeId) {
        let mut stack = vec![node];
        while let Some(next) = stack.pop() {
            if let Some(data) = self.nodes.get_mut(next.0).and_then(|n| n.take()) {
                stack.extend(data.children);
            }
        }
    }

    fn data(&self, node: NodeId) -> Option<&NodeData> {
        self.nodes.get(node.0).and_then(|n| n.as_ref())
    }

    fn data_mut(&mut self, node: NodeId) -> MarkupResult<&mut NodeData> {
        self.nodes
            .get_mut(node.0)
            .and_then(|n| n.as_mut())
            .ok_or(MarkupError::UnknownNode(node))
    }

    fn element_mut(&mut self, node: NodeId) -> MarkupResult<&mut Element> {
        match &mut self.data_mut(node)?.kind {
            NodeKind::Element(el) => Ok(el),
            _ => Err(MarkupError::NotAnElement(node)),
        }
    }
}
