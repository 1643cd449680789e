//! LSP capability handlers

pub mod completions;
pub mod hover;
