//! # Livepage Markup
//!
//! HTML fragment handling for the rendering surface.
//!
//! ```text
//! markup string ──tokenize──▶ tokens ──build──▶ Dom ──serialize──▶ markup string
//! ```
//!
//! The serializer is the inverse the synchronization protocol relies on:
//! whatever the surface reads back out of its live tree must compare
//! byte-for-byte with what the host serializes for the same content.

pub mod error;
pub mod lexer;
pub mod serializer;
pub mod tree;

pub use error::{MarkupError, MarkupResult};
pub use lexer::{
    decode_entities, is_raw_text, parse_attributes, tokenize, OpenTag, Token, RAW_TEXT_ELEMENTS,
};
pub use serializer::{escape_attribute, escape_text};
pub use tree::{is_void, Attribute, Dom, Element, NodeId, NodeKind, VOID_ELEMENTS};
