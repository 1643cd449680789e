//! # calcsense
//!
//! Context-sensitive completion and hover for two editor languages: a
//! VB-like calculation expression language and a Gherkin-like scenario
//! sentence language.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │          Catalog (per-context metadata payload)          │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [into_registry]
//! ┌─────────────────────────────────────────────────────────┐
//! │        Registry (immutable, shared as Arc snapshot)      │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [Engine + LanguageProfile]
//! ┌─────────────────────────────────────────────────────────┐
//! │  preprocess → classify context → completions / hover     │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [tower-lsp backend]
//! ┌─────────────────────────────────────────────────────────┐
//! │             stdio / WebSocket editor clients             │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod catalog;
pub mod config;
pub mod logging;
pub mod lsp;
pub mod registry;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::catalog::{CatalogPayload, CatalogSource, FileCatalogSource};
    pub use crate::lsp::{Engine, LanguageKind, LanguageProfile};
    pub use crate::registry::{Registry, RegistryBuilder, Symbol};
}
