//! Deterministic HTML serialization of the live tree.
//!
//! Output is what a browser's `innerHTML` would give for the same tree:
//! attributes in insertion order, double-quoted, void elements without a
//! closing tag, `<script>`/`<style>` content written as is. Parsing the
//! output and serializing again is stable.

use crate::lexer::is_raw_text;
use crate::tree::{is_void, Dom, NodeId, NodeKind};

pub fn inner_html(dom: &Dom, node: NodeId) -> String {
    let mut buffer = String::new();
    for &child in dom.children(node) {
        write_node(dom, child, &mut buffer);
    }
    buffer
}

pub fn outer_html(dom: &Dom, node: NodeId) -> String {
    let mut buffer = String::new();
    write_node(dom, node, &mut buffer);
    buffer
}

fn write_node(dom: &Dom, node: NodeId, buffer: &mut String) {
    match dom.kind(node) {
        Some(NodeKind::Root) => {
            for &child in dom.children(node) {
                write_node(dom, child, buffer);
            }
        }
        Some(NodeKind::Element(el)) => {
            buffer.push('<');
            buffer.push_str(&el.tag);
            for attr in &el.attrs {
                buffer.push(' ');
                buffer.push_str(&attr.name);
                buffer.push_str("=\"");
                buffer.push_str(&escape_attribute(&attr.value));
                buffer.push('"');
            }
            buffer.push('>');

            if is_void(&el.tag) {
                return;
            }

            for &child in dom.children(node) {
                write_node(dom, child, buffer);
            }
            buffer.push_str("</");
            buffer.push_str(&el.tag);
            buffer.push('>');
        }
        Some(NodeKind::Text { content }) => {
            let raw = dom
                .parent(node)
                .and_then(|parent| dom.tag(parent))
                .is_some_and(is_raw_text);
            if raw {
                buffer.push_str(content);
            } else {
                buffer.push_str(&escape_text(content));
            }
        }
        Some(NodeKind::Comment { content }) => {
            buffer.push_str("<!--");
            buffer.push_str(content);
            buffer.push_str("-->");
        }
        None => {}
    }
}

pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
    out
}
