//! # Editability Walker
//!
//! Marks text-bearing elements of freshly rendered content as directly
//! editable.
//!
//! An element qualifies when its tag is on [`EDITABLE_TAGS`] and it has at
//! least one direct text child with non-whitespace content. Qualifying
//! elements get `contenteditable="true"` and `spellcheck="false"`.
//!
//! Editability inherits down the tree, so an element that does not qualify
//! but sits inside an editable one is explicitly locked with
//! `contenteditable="false"`. Without that, wrappers such as an icon
//! `<span>` inside a paragraph would become editable through their parent.
//! Elements outside any editable region are left untouched, except that
//! a stale `contenteditable="true"` from an earlier walk is removed. Such
//! marks come back inside edited markup, for example on a heading the
//! user emptied.
//!
//! Run once per root replacement only: re-marking nodes that already hold
//! focus would move the caret.

use livepage_markup::{Dom, NodeId, NodeKind};

pub const EDITABLE_TAGS: &[&str] = &[
    "h1", "h2", "h3", "h4", "h5", "h6", "p", "span", "button", "a", "li", "b", "strong", "div",
];

pub const EDITABLE_ATTR: &str = "contenteditable";
pub const SPELLCHECK_ATTR: &str = "spellcheck";

/// What a walk changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkReport {
    /// Elements marked editable
    pub editable: Vec<NodeId>,
    /// Elements explicitly locked inside an editable ancestor
    pub locked: Vec<NodeId>,
    /// Elements whose stale editable mark was removed
    pub cleared: Vec<NodeId>,
}

/// Whether `node` qualifies as a live-editable text element
pub fn qualifies(dom: &Dom, node: NodeId) -> bool {
    let Some(tag) = dom.tag(node) else {
        return false;
    };
    EDITABLE_TAGS.contains(&tag) && has_own_text(dom, node)
}

fn has_own_text(dom: &Dom, node: NodeId) -> bool {
    dom.children(node).iter().any(|&child| {
        dom.text(child)
            .map(|text| !text.trim().is_empty())
            .unwrap_or(false)
    })
}

/// Walk everything under `root` and mark it
pub fn walk(dom: &mut Dom, root: NodeId) -> WalkReport {
    let mut report = WalkReport::default();
    let mut stack: Vec<(NodeId, bool)> = dom
        .children(root)
        .iter()
        .rev()
        .map(|&child| (child, false))
        .collect();

    while let Some((node, inside_editable)) = stack.pop() {
        if !dom.is_element(node) {
            continue;
        }

        let editable = qualifies(dom, node);
        let marked = if editable {
            mark(dom, node, &[(EDITABLE_ATTR, "true"), (SPELLCHECK_ATTR, "false")])
        } else if inside_editable {
            mark(dom, node, &[(EDITABLE_ATTR, "false")])
        } else {
            if unmark(dom, node) {
                report.cleared.push(node);
            }
            false
        };

        if marked {
            if editable {
                report.editable.push(node);
            } else {
                report.locked.push(node);
            }
        }

        let children_inside = editable || inside_editable;
        stack.extend(
            dom.children(node)
                .iter()
                .rev()
                .map(|&child| (child, children_inside)),
        );
    }

    tracing::debug!(
        editable = report.editable.len(),
        locked = report.locked.len(),
        cleared = report.cleared.len(),
        "Editability walk complete"
    );
    report
}

fn mark(dom: &mut Dom, node: NodeId, attrs: &[(&str, &str)]) -> bool {
    attrs
        .iter()
        .all(|(name, value)| dom.set_attr(node, name, value).is_ok())
}

/// Drop a walker-set editable mark from a node that no longer qualifies
fn unmark(dom: &mut Dom, node: NodeId) -> bool {
    if dom.attr(node, EDITABLE_ATTR) != Some("true") {
        return false;
    }
    if dom.remove_attr(node, EDITABLE_ATTR).is_err() {
        return false;
    }
    if dom.attr(node, SPELLCHECK_ATTR) == Some("false") {
        let _ = dom.remove_attr(node, SPELLCHECK_ATTR);
    }
    true
}

/// Effective editability of `node`, inherited the way a browser does:
/// the nearest element carrying `contenteditable` decides.
pub fn is_editable(dom: &Dom, node: NodeId) -> bool {
    let decided = dom.closest(node, |d, n| d.attr(n, EDITABLE_ATTR).is_some());
    match decided.and_then(|n| dom.attr(n, EDITABLE_ATTR)) {
        Some(value) => value.is_empty() || value.eq_ignore_ascii_case("true"),
        None => false,
    }
}

/// Whether typing into `text_node` is possible
pub fn is_text_editable(dom: &Dom, text_node: NodeId) -> bool {
    matches!(dom.kind(text_node), Some(NodeKind::Text { .. }))
        && dom
            .parent(text_node)
            .map(|parent| is_editable(dom, parent))
            .unwrap_or(false)
}
