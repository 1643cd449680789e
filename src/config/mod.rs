//! Configuration module for calcsense.
//!
//! Handles catalog location, per-language settings, and logging defaults.

mod settings;

pub use settings::{
    expand_env_vars, CatalogSettings, LanguageSettings, LogSettings, Settings, SettingsError,
};
