//! Error types for the editor

use crate::collab::{GenerateError, PersistError};
use livepage_surface::SurfaceError;
use thiserror::Error;

pub type EditorResult<T> = Result<T, EditorError>;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Surface error: {0}")]
    Surface(#[from] SurfaceError),

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error("Generation error: {0}")]
    Generate(#[from] GenerateError),

    #[error("Record store error: {0}")]
    Store(#[source] PersistError),

    #[error("Invalid stored document: {0}")]
    Json(#[from] serde_json::Error),
}
