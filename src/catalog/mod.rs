//! Context catalogs.
//!
//! A catalog is the metadata payload the host application supplies for one
//! document context: variables, local functions, default types, keywords,
//! and for scenario documents the datasets and calculations they reference.
//! [`CatalogSource`] fetches one; [`CatalogPayload::into_registry`] turns it
//! into a [`Registry`](crate::registry::Registry).

mod error;
mod payload;
mod source;

pub use error::{CatalogError, CatalogResult};
pub use payload::{
    CalculationPayload, CatalogPayload, DatasetPayload, DefaultTypePayload, FunctionPayload,
    KeywordPayload, ParameterPayload, SymbolPayload,
};
pub use source::{CatalogSource, FileCatalogSource, MemoryCatalogSource};
