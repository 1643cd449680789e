//! TOML-based configuration for calcsense.
//!
//! Supports a config file (calcsense.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [catalog]
//! dir = "${CALCSENSE_CATALOG_DIR}"
//! default_context = "default"
//!
//! [languages.expression]
//! extensions = ["calc", "vbx"]
//! aggregate_functions = ["Sum", "Average", "Avg", "Min", "Max", "Count"]
//!
//! [languages.sentence]
//! extensions = ["feature", "scenario"]
//!
//! [log]
//! level = "info"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::lsp::analysis::language::{default_aggregate_functions, LanguageKind, LanguageProfile};

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Unknown language: {0}")]
    UnknownLanguage(String),

    #[error("Invalid pattern for {language}: {source}")]
    InvalidPattern {
        language: String,
        #[source]
        source: regex::Error,
    },
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Where catalogs are loaded from.
    pub catalog: CatalogSettings,

    /// Per-language settings, keyed by language name.
    pub languages: BTreeMap<String, LanguageSettings>,

    /// Logging configuration.
    pub log: LogSettings,
}

impl Default for Settings {
    fn default() -> Self {
        let mut languages = BTreeMap::new();
        languages.insert(
            LanguageKind::Expression.as_str().to_string(),
            LanguageSettings {
                extensions: vec!["calc".to_string(), "vbx".to_string()],
                aggregate_functions: default_aggregate_functions(),
            },
        );
        languages.insert(
            LanguageKind::Sentence.as_str().to_string(),
            LanguageSettings {
                extensions: vec!["feature".to_string(), "scenario".to_string()],
                aggregate_functions: Vec::new(),
            },
        );

        Self {
            catalog: CatalogSettings::default(),
            languages,
            log: LogSettings::default(),
        }
    }
}

/// Catalog location.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// Directory holding `<context>.json` files (supports ${ENV_VAR} expansion).
    pub dir: String,

    /// Context used for documents that never switched context.
    pub default_context: String,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            dir: "./catalogs".to_string(),
            default_context: "default".to_string(),
        }
    }
}

impl CatalogSettings {
    /// Get the catalog directory with environment variables expanded.
    pub fn resolved_dir(&self) -> Result<PathBuf, SettingsError> {
        expand_env_vars(&self.dir).map(PathBuf::from)
    }
}

/// Settings for one editor language.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LanguageSettings {
    /// File extensions (without the dot) mapped to this language.
    pub extensions: Vec<String>,

    /// Function names that open an aggregate argument.
    pub aggregate_functions: Vec<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogSettings {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `CALCSENSE_CONFIG`
    /// 2. `./calcsense.toml`
    /// 3. `~/.config/calcsense/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("CALCSENSE_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("calcsense.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("calcsense").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Reject language sections that name no known language.
    pub fn validate(&self) -> Result<(), SettingsError> {
        for name in self.languages.keys() {
            if LanguageKind::parse(name).is_none() {
                return Err(SettingsError::UnknownLanguage(name.clone()));
            }
        }
        Ok(())
    }

    /// Settings for one language, falling back to the built-in defaults.
    pub fn language(&self, kind: LanguageKind) -> LanguageSettings {
        self.languages
            .iter()
            .find(|(name, _)| LanguageKind::parse(name) == Some(kind))
            .map(|(_, settings)| settings.clone())
            .or_else(|| Settings::default().languages.remove(kind.as_str()))
            .unwrap_or_default()
    }

    /// Build the profile for a language from its configured aggregate functions.
    pub fn profile(&self, kind: LanguageKind) -> Result<LanguageProfile, SettingsError> {
        let settings = self.language(kind);
        LanguageProfile::build(kind, &settings.aggregate_functions).map_err(|source| {
            SettingsError::InvalidPattern {
                language: kind.to_string(),
                source,
            }
        })
    }

    /// The language a file belongs to, by extension.
    pub fn language_for_path(&self, path: &Path) -> Option<LanguageKind> {
        let ext = path.extension()?.to_str()?;
        [LanguageKind::Expression, LanguageKind::Sentence]
            .into_iter()
            .find(|kind| {
                self.language(*kind)
                    .extensions
                    .iter()
                    .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext))
            })
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let braced = chars.peek() == Some(&'{');
        if braced {
            chars.next(); // consume '{'
        }

        let mut var_name = String::new();
        while let Some(&ch) = chars.peek() {
            if braced && ch == '}' {
                chars.next(); // consume '}'
                break;
            }
            if !braced && !(ch.is_alphanumeric() || ch == '_') {
                break;
            }
            var_name.push(ch);
            chars.next();
        }

        if var_name.is_empty() && !braced {
            // Just a lone $, keep it
            result.push('$');
            continue;
        }

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
