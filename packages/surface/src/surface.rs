//! # Rendering Surface
//!
//! Surface side of the synchronization protocol. The surface owns a live
//! tree and the last HTML string it wrote into it; the host only ever sees
//! it through wire messages.
//!
//! ## SYNC
//!
//! 1. Serialize the incoming blocks into container markup
//! 2. Compare with `last_rendered_html`
//! 3. Equal: nothing happens (echo suppression)
//! 4. Different: replace the root, remember the string, run the walker
//!
//! ## Input
//!
//! Every edit inside a block container sends that container's full inner
//! markup as CHANGE. Before posting, the surface records as
//! `last_rendered_html` the serialization the host will produce once it
//! has applied the change: the last synced blocks with the edited one
//! swapped for its new content. The SYNC the host sends back then
//! compares equal and leaves the live tree (and the caret) alone.
//!
//! The live root itself is not usable for this, because the walker's
//! marks on untouched blocks never reach the host.

use crate::bootstrap::ResourceRegistry;
use crate::error::{SurfaceError, SurfaceResult};
use crate::walker;
use livepage_markup::{Dom, NodeId};
use livepage_protocol::{
    decode_host_message, render_blocks, Block, HostMessage, SurfaceMessage, ACTIVE_CLASS,
    BLOCK_ID_ATTR,
};
use std::ops::Range;
use tokio::sync::mpsc::UnboundedSender;

/// Caret position inside a text node, in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caret {
    pub node: NodeId,
    pub offset: usize,
}

/// Result of applying one SYNC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Root content replaced and re-walked
    Replaced,
    /// Serialized content matched the last render
    Unchanged,
}

pub struct RenderingSurface {
    url: String,
    dom: Dom,
    last_rendered_html: String,
    synced_blocks: Vec<Block>,
    synced_selection: Option<String>,
    root_replacements: u64,
    caret: Option<Caret>,
    booted: bool,
    outbound: UnboundedSender<String>,
}

impl RenderingSurface {
    /// Load a fresh surface from a local bootstrap resource.
    ///
    /// The surface starts un-booted and ignores everything until [`boot`].
    ///
    /// [`boot`]: RenderingSurface::boot
    pub fn load(
        registry: &ResourceRegistry,
        url: &str,
        outbound: UnboundedSender<String>,
    ) -> SurfaceResult<Self> {
        let document = registry.resolve(url)?;
        tracing::debug!(url = %url, bytes = document.len(), "Loaded bootstrap document");

        Ok(Self {
            url: url.to_string(),
            dom: Dom::new(),
            last_rendered_html: String::new(),
            synced_blocks: Vec::new(),
            synced_selection: None,
            root_replacements: 0,
            caret: None,
            booted: false,
            outbound,
        })
    }

    /// Attach listeners and announce readiness. Only the first call posts READY.
    pub fn boot(&mut self) {
        if self.booted {
            return;
        }
        self.booted = true;
        tracing::debug!(url = %self.url, "Surface booted");
        self.post(SurfaceMessage::Ready);
    }

    pub fn is_booted(&self) -> bool {
        self.booted
    }

    /// Handle one raw inbound message. Never fails.
    pub fn handle_message(&mut self, raw: &str) -> Option<SyncOutcome> {
        if !self.booted {
            tracing::debug!("Dropping message received before boot");
            return None;
        }

        match decode_host_message(raw)? {
            HostMessage::Sync {
                blocks,
                selected_id,
            } => Some(self.apply_sync(&blocks, selected_id.as_deref())),
        }
    }

    /// Apply a SYNC payload
    pub fn apply_sync(&mut self, blocks: &[Block], selected_id: Option<&str>) -> SyncOutcome {
        let html = render_blocks(blocks, selected_id);
        self.synced_blocks = blocks.to_vec();
        self.synced_selection = selected_id.map(str::to_string);

        if html == self.last_rendered_html {
            tracing::trace!(blocks = blocks.len(), "Echo suppressed");
            return SyncOutcome::Unchanged;
        }

        let root = self.dom.root();
        if let Err(e) = self.dom.set_inner_html(root, &html) {
            tracing::warn!(error = %e, "Failed to replace surface root");
            return SyncOutcome::Unchanged;
        }

        self.last_rendered_html = html;
        self.root_replacements += 1;
        self.caret = None;
        walker::walk(&mut self.dom, root);

        tracing::debug!(
            blocks = blocks.len(),
            replacements = self.root_replacements,
            "Surface root replaced"
        );
        SyncOutcome::Replaced
    }

    /// Insert `text` at a character offset of an editable text node
    pub fn type_text(&mut self, node: NodeId, offset: usize, text: &str) -> SurfaceResult<()> {
        let current = self.editable_text(node)?;
        let offset = offset.min(current.chars().count());
        let at = byte_offset(&current, offset);

        let mut updated = current;
        updated.insert_str(at, text);
        self.dom.set_text(node, &updated)?;

        self.caret = Some(Caret {
            node,
            offset: offset + text.chars().count(),
        });
        self.dispatch_input(node);
        Ok(())
    }

    /// Delete a character range of an editable text node
    pub fn delete_text(&mut self, node: NodeId, range: Range<usize>) -> SurfaceResult<()> {
        let current = self.editable_text(node)?;
        let start = byte_offset(&current, range.start);
        let end = byte_offset(&current, range.end.max(range.start));

        let mut updated = current;
        updated.replace_range(start..end, "");
        self.dom.set_text(node, &updated)?;

        self.caret = Some(Caret {
            node,
            offset: updated[..start].chars().count(),
        });
        self.dispatch_input(node);
        Ok(())
    }

    /// Replace the whole content of an editable text node
    pub fn set_text(&mut self, node: NodeId, text: &str) -> SurfaceResult<()> {
        self.editable_text(node)?;
        self.dom.set_text(node, text)?;
        self.caret = Some(Caret {
            node,
            offset: text.chars().count(),
        });
        self.dispatch_input(node);
        Ok(())
    }

    /// Click anywhere; SELECT is posted when it lands inside a block
    pub fn click(&mut self, node: NodeId) -> bool {
        if !self.booted {
            return false;
        }
        match self.container_of(node) {
            Some((_, id)) => {
                self.post(SurfaceMessage::Select { id });
                true
            }
            None => false,
        }
    }

    pub fn root_replacements(&self) -> u64 {
        self.root_replacements
    }

    pub fn rendered_html(&self) -> String {
        self.dom.inner_html(self.dom.root())
    }

    pub fn last_rendered_html(&self) -> &str {
        &self.last_rendered_html
    }

    pub fn caret(&self) -> Option<Caret> {
        self.caret
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Container element of the block with this id
    pub fn block_node(&self, id: &str) -> Option<NodeId> {
        let root = self.dom.root();
        self.dom
            .children(root)
            .iter()
            .copied()
            .find(|&n| self.dom.attr(n, BLOCK_ID_ATTR) == Some(id))
    }

    /// Id of the block currently highlighted as active
    pub fn active_block(&self) -> Option<String> {
        let root = self.dom.root();
        self.dom
            .children(root)
            .iter()
            .copied()
            .find(|&n| {
                self.dom
                    .element(n)
                    .map(|el| el.has_class(ACTIVE_CLASS))
                    .unwrap_or(false)
            })
            .and_then(|n| self.dom.attr(n, BLOCK_ID_ATTR).map(str::to_string))
    }

    /// First text node, in document order, containing `needle`
    pub fn find_text(&self, needle: &str) -> Option<NodeId> {
        let root = self.dom.root();
        self.dom
            .descendants(root)
            .into_iter()
            .find(|&n| self.dom.text(n).map(|t| t.contains(needle)).unwrap_or(false))
    }

    fn editable_text(&self, node: NodeId) -> SurfaceResult<String> {
        if !self.booted {
            return Err(SurfaceError::NotBooted);
        }
        if !walker::is_text_editable(&self.dom, node) {
            return Err(SurfaceError::NotEditable(node));
        }
        Ok(self.dom.text(node).unwrap_or_default().to_string())
    }

    fn dispatch_input(&mut self, target: NodeId) {
        let Some((container, id)) = self.container_of(target) else {
            return;
        };

        let content = self.dom.inner_html(container);
        if let Some(block) = self.synced_blocks.iter_mut().find(|b| b.id == id) {
            block.markup = content.clone();
        }
        self.last_rendered_html =
            render_blocks(&self.synced_blocks, self.synced_selection.as_deref());
        tracing::trace!(block_id = %id, bytes = content.len(), "Posting block change");
        self.post(SurfaceMessage::Change { id, content });
    }

    fn container_of(&self, node: NodeId) -> Option<(NodeId, String)> {
        let container = self
            .dom
            .closest(node, |d, n| d.attr(n, BLOCK_ID_ATTR).is_some())?;
        let id = self.dom.attr(container, BLOCK_ID_ATTR)?.to_string();
        Some((container, id))
    }

    fn post(&self, message: SurfaceMessage) {
        if self.outbound.send(message.to_wire()).is_err() {
            tracing::debug!(message = message.name(), "Host is gone; message dropped");
        }
    }
}

fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}
