//! Where catalogs come from.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use super::error::{CatalogError, CatalogResult};
use super::payload::CatalogPayload;

/// Fetches the catalog for a document context.
///
/// Implementations are shared across language server tasks and must be
/// cheap to call concurrently.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch the catalog for `context`.
    async fn fetch(&self, context: &str) -> CatalogResult<CatalogPayload>;
}

/// Reads `<dir>/<context>.json`.
#[derive(Debug, Clone)]
pub struct FileCatalogSource {
    dir: PathBuf,
}

impl FileCatalogSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the catalog file for a context.
    pub fn path_for(&self, context: &str) -> CatalogResult<PathBuf> {
        validate_context(context)?;
        Ok(self.dir.join(format!("{context}.json")))
    }
}

#[async_trait]
impl CatalogSource for FileCatalogSource {
    async fn fetch(&self, context: &str) -> CatalogResult<CatalogPayload> {
        let path = self.path_for(context)?;
        debug!(path = %path.display(), "reading catalog");

        let json = match tokio::fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(CatalogError::NotFound(path)),
            Err(e) => return Err(e.into()),
        };

        CatalogPayload::from_json(&json)
    }
}

/// Catalogs held in memory, for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryCatalogSource {
    catalogs: DashMap<String, CatalogPayload>,
}

impl MemoryCatalogSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the catalog for a context.
    pub fn insert(&self, context: impl Into<String>, payload: CatalogPayload) {
        self.catalogs.insert(context.into(), payload);
    }

    pub fn remove(&self, context: &str) {
        self.catalogs.remove(context);
    }
}

#[async_trait]
impl CatalogSource for MemoryCatalogSource {
    async fn fetch(&self, context: &str) -> CatalogResult<CatalogPayload> {
        validate_context(context)?;
        self.catalogs
            .get(context)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| CatalogError::NotFound(PathBuf::from(context)))
    }
}

/// Context ids become file names, so only a conservative character set is
/// allowed and `..` is rejected.
fn validate_context(context: &str) -> CatalogResult<()> {
    let valid = !context.is_empty()
        && !context.contains("..")
        && context
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if valid {
        Ok(())
    } else {
        Err(CatalogError::InvalidContext(context.to_string()))
    }
}
