//! # Livepage Surface
//!
//! The isolated side of live preview editing.
//!
//! ```text
//! ResourceRegistry ──blob: URL──▶ RenderingSurface ──walk──▶ editable tree
//!        ▲                              │
//!   bootstrap document           wire strings only
//!                                       ▼
//!                                     host
//! ```
//!
//! A surface never shares its tree with the host. It is loaded from a
//! locally registered bootstrap document and talks through two FIFO pipes.
//! [`RenderingSurface`] is the synchronous state machine; [`headless`]
//! runs one on a tokio task for tests and the command line, while
//! [`BOOTSTRAP_HTML`] carries the same behavior into a browser frame.

pub mod bootstrap;
pub mod error;
pub mod headless;
pub mod launch;
pub mod surface;
pub mod walker;

pub use bootstrap::{ResourceHandle, ResourceRegistry, BOOTSTRAP_HTML, LOCAL_SCHEME, ROOT_ELEMENT_ID};
pub use error::{SurfaceError, SurfaceResult};
pub use headless::{HeadlessLauncher, SurfaceCommand, SurfaceController, SurfaceSnapshot};
pub use launch::{SurfaceLauncher, SurfaceLink};
pub use surface::{Caret, RenderingSurface, SyncOutcome};
pub use walker::{is_editable, is_text_editable, qualifies, walk, WalkReport, EDITABLE_TAGS};
