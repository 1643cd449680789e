//! Document analysis - preprocessing, context detection

pub mod context;
pub mod document;
pub mod language;
pub mod preprocess;
