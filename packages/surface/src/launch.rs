//! The seam between a host and whatever actually renders.

use crate::bootstrap::{ResourceHandle, ResourceRegistry};
use crate::error::SurfaceResult;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Both ends of the host's connection to one surface.
///
/// Each direction is a strict FIFO pipe of wire strings.
#[derive(Debug)]
pub struct SurfaceLink {
    /// Host → surface
    pub outbound: UnboundedSender<String>,
    /// Surface → host
    pub inbound: UnboundedReceiver<String>,
}

/// Something that can bring up a surface from a local bootstrap resource
pub trait SurfaceLauncher {
    fn launch(
        &self,
        registry: &ResourceRegistry,
        resource: &ResourceHandle,
    ) -> SurfaceResult<SurfaceLink>;
}
