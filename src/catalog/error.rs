//! Catalog loading errors.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors that can occur while fetching a catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// No catalog exists for the context.
    #[error("catalog not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Reading the catalog failed.
    #[error("failed to read catalog: {0}")]
    Io(#[from] io::Error),

    /// The catalog is not a valid payload.
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    /// The context id cannot name a catalog.
    #[error("invalid context id: {0:?}")]
    InvalidContext(String),
}
