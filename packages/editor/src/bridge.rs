//! # Surface Bridge
//!
//! Host-side owner of one rendering surface. The bridge registers the
//! bootstrap document as a local resource, launches the surface on it, and
//! mediates all traffic:
//!
//! - outbound SYNCs are dropped, not queued, until the surface reports READY
//! - inbound wire strings are decoded totally; malformed ones are ignored
//! - dropping the bridge revokes the bootstrap resource
//!
//! What the host does in response to each message lives in the session.

use crate::errors::EditorResult;
use livepage_protocol::{decode_surface_message, Block, HostMessage, SurfaceMessage};
use livepage_surface::{ResourceHandle, ResourceRegistry};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub use livepage_surface::{SurfaceLauncher, SurfaceLink};

type ChangeHandler = Box<dyn FnMut(&str, &str) + Send>;
type SelectHandler = Box<dyn FnMut(&str) + Send>;
type ReadyHandler = Box<dyn FnMut() + Send>;

pub struct SurfaceBridge {
    outbound: UnboundedSender<String>,
    ready: bool,
    dropped_syncs: u64,
    on_change: Vec<ChangeHandler>,
    on_select: Vec<SelectHandler>,
    on_ready: Vec<ReadyHandler>,
    resource: ResourceHandle,
}

impl SurfaceBridge {
    /// Register the bootstrap document and launch a surface on it.
    ///
    /// Returns the bridge and the pipe of raw inbound messages, which the
    /// caller feeds back through [`SurfaceBridge::dispatch`].
    pub fn create(
        registry: &ResourceRegistry,
        launcher: &dyn SurfaceLauncher,
    ) -> EditorResult<(Self, UnboundedReceiver<String>)> {
        let resource = registry.register_bootstrap();
        let link = launcher.launch(registry, &resource)?;
        tracing::debug!(url = %resource.url(), "Surface launched");

        Ok((
            Self {
                outbound: link.outbound,
                ready: false,
                dropped_syncs: 0,
                on_change: Vec::new(),
                on_select: Vec::new(),
                on_ready: Vec::new(),
                resource,
            },
            link.inbound,
        ))
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn resource_url(&self) -> &str {
        self.resource.url()
    }

    /// SYNCs dropped because the surface was not ready yet
    pub fn dropped_syncs(&self) -> u64 {
        self.dropped_syncs
    }

    /// Send the given state to the surface. Returns whether it was sent.
    pub fn post_sync(&mut self, blocks: &[Block], selected_id: Option<&str>) -> bool {
        if !self.ready {
            self.dropped_syncs += 1;
            tracing::debug!(blocks = blocks.len(), "Surface not ready; SYNC dropped");
            return false;
        }

        let wire = HostMessage::sync(blocks, selected_id).to_wire();
        if self.outbound.send(wire).is_err() {
            tracing::debug!("Surface is gone; SYNC dropped");
            return false;
        }

        tracing::trace!(blocks = blocks.len(), selected = ?selected_id, "SYNC posted");
        true
    }

    pub fn on_change(&mut self, handler: impl FnMut(&str, &str) + Send + 'static) {
        self.on_change.push(Box::new(handler));
    }

    pub fn on_select(&mut self, handler: impl FnMut(&str) + Send + 'static) {
        self.on_select.push(Box::new(handler));
    }

    pub fn on_ready(&mut self, handler: impl FnMut() + Send + 'static) {
        self.on_ready.push(Box::new(handler));
    }

    /// Decode one raw inbound message and run the registered handlers.
    ///
    /// Total: anything that does not decode is dropped and yields `None`.
    pub fn dispatch(&mut self, raw: &str) -> Option<SurfaceMessage> {
        let message = decode_surface_message(raw)?;

        match &message {
            SurfaceMessage::Ready => {
                if self.ready {
                    tracing::debug!("Duplicate READY");
                }
                self.ready = true;
                for handler in &mut self.on_ready {
                    handler();
                }
            }
            SurfaceMessage::Change { id, content } => {
                for handler in &mut self.on_change {
                    handler(id, content);
                }
            }
            SurfaceMessage::Select { id } => {
                for handler in &mut self.on_select {
                    handler(id);
                }
            }
        }

        Some(message)
    }
}

impl Drop for SurfaceBridge {
    fn drop(&mut self) {
        tracing::debug!(url = %self.resource.url(), "Releasing surface");
    }
}
