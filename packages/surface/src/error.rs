use livepage_markup::{MarkupError, NodeId};
use thiserror::Error;

pub type SurfaceResult<T> = Result<T, SurfaceError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("Bootstrap must come from a local resource, got: {0}")]
    RemoteBootstrap(String),

    #[error("Bootstrap resource is revoked or unknown: {0}")]
    ResourceRevoked(String),

    #[error("Surface has not booted")]
    NotBooted,

    #[error("Node {0} is not editable")]
    NotEditable(NodeId),

    #[error("No text node contains {0:?}")]
    TextNotFound(String),

    #[error("Surface was already launched")]
    AlreadyLaunched,

    #[error("Surface is gone")]
    Closed,

    #[error("Markup error: {0}")]
    Markup(#[from] MarkupError),
}
