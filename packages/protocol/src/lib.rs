//! # Livepage Protocol
//!
//! The message contract between the host (which owns the document model)
//! and the rendering surface (which owns the live, editable tree).
//!
//! ```text
//! host ──SYNC {blocks, selectedId}──▶ surface
//! host ◀──CHANGE {id, content}─────── surface
//! host ◀──SELECT {id}──────────────── surface
//! host ◀──READY───────────────────── surface   (once per surface instance)
//! ```
//!
//! Decoding is total on both ends: the channel has no schema enforcement,
//! so an unexpected payload is dropped rather than surfaced as an error.

pub mod messages;
pub mod render;

pub use messages::{decode_host_message, decode_surface_message, Block, HostMessage, SurfaceMessage};
pub use render::{render_blocks, ACTIVE_CLASS, BLOCK_CLASS, BLOCK_ID_ATTR};
