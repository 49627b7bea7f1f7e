//! # Livepage Editor
//!
//! Host side of live preview editing.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ DocumentModel: primary + variant + selection│
//! └─────────────────────────────────────────────┘
//!            ↑ CHANGE / SELECT       ↓ SYNC
//! ┌─────────────────────────────────────────────┐
//! │ SurfaceBridge: readiness gate, dispatch     │
//! └─────────────────────────────────────────────┘
//!                     ↕ wire strings
//! ┌─────────────────────────────────────────────┐
//! │ rendering surface (livepage-surface)        │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Model is source of truth**: the surface only holds a copy
//! 2. **Echo suppression over turn-taking**: redundant SYNCs are harmless
//! 3. **Latest state wins**: SYNCs before READY are dropped, debounced
//!    writes carry the newest snapshot
//! 4. **No ambient state**: everything hangs off an [`EditorSession`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use livepage_editor::{DocumentModel, EditorConfig, EditorSession, MemoryStore, StorePersist};
//! use livepage_surface::{HeadlessLauncher, ResourceRegistry};
//!
//! let registry = ResourceRegistry::new();
//! let (launcher, controller) = HeadlessLauncher::new();
//! let store = Arc::new(MemoryStore::new());
//! let persist = Arc::new(StorePersist::new(store, "page"));
//!
//! let (mut session, inbound) =
//!     EditorSession::new(model, EditorConfig::default(), &registry, &launcher, persist)?;
//! session.run(inbound).await;
//! ```

mod bridge;
mod collab;
mod config;
mod debounce;
mod document;
mod errors;
mod history;
mod session;

pub use bridge::{SurfaceBridge, SurfaceLauncher, SurfaceLink};
pub use collab::{
    GenerateError, GenerateInput, Generator, MemoryStore, Persist, PersistError, RecordStore,
    StorePersist,
};
pub use config::EditorConfig;
pub use debounce::{DebouncedWriter, PersistFailure};
pub use document::{DocumentModel, DocumentSnapshot, Sequence};
pub use errors::{EditorError, EditorResult};
pub use history::{History, MarkupEdit};
pub use session::EditorSession;

// Re-export protocol types for convenience
pub use livepage_protocol::{Block, SurfaceMessage};
