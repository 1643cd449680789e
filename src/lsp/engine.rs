//! Completion and hover entry points for one document context.

use std::sync::Arc;

use tower_lsp::lsp_types::{CompletionItem, Hover, Position};
use tracing::debug;

use super::analysis::context::{detect_context, ClassifyEnv, CursorText};
use super::analysis::document::{lsp_position_to_byte_offset, split_line_at};
use super::analysis::language::LanguageProfile;
use super::capabilities::completions::{get_completions, resolve_completion_item, CompletionRequest};
use super::capabilities::hover::{get_hover, HoverRequest};
use crate::registry::Registry;

/// Answers completion and hover requests against one registry snapshot.
///
/// Cloning is cheap; a clone keeps answering from the same snapshot even
/// after the workspace has swapped in a newer registry.
#[derive(Debug, Clone)]
pub struct Engine {
    profile: Arc<LanguageProfile>,
    registry: Arc<Registry>,
}

impl Engine {
    pub fn new(profile: Arc<LanguageProfile>, registry: Arc<Registry>) -> Self {
        Self { profile, registry }
    }

    pub fn profile(&self) -> &LanguageProfile {
        &self.profile
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Completion items for the cursor at `position` in `buffer`.
    ///
    /// `trigger` is the character that opened the request, if any. The
    /// context is read from the text itself, so it is only logged.
    pub fn provide_completions(
        &self,
        buffer: &str,
        position: Position,
        trigger: Option<char>,
    ) -> Vec<CompletionItem> {
        if self.registry.is_empty() {
            return Vec::new();
        }

        let (prefix, suffix) = split_line_at(buffer, position);
        let cursor = CursorText::new(prefix, suffix);
        let env = ClassifyEnv {
            profile: &self.profile,
            aggregates_enabled: self.registry.aggregates_enabled(),
        };

        let Some(context) = detect_context(&cursor, &env) else {
            debug!(?trigger, line = position.line, "no completion context");
            return Vec::new();
        };

        let offset = lsp_position_to_byte_offset(buffer, position);
        let request = CompletionRequest {
            profile: &self.profile,
            registry: &self.registry,
            prefix,
            next_char: cursor.next_char(),
            text_before_cursor: &buffer[..offset],
        };

        let items = get_completions(&context, &request);
        debug!(?trigger, count = items.len(), "completions");
        items
    }

    /// Hover documentation for the token spanning `position`.
    pub fn provide_hover(&self, buffer: &str, position: Position) -> Option<Hover> {
        if self.registry.is_empty() {
            return None;
        }

        let (prefix, suffix) = split_line_at(buffer, position);
        get_hover(&HoverRequest {
            profile: &self.profile,
            registry: &self.registry,
            position,
            prefix,
            suffix,
        })
    }

    /// Fill in the insert text of an accepted item.
    ///
    /// Resolution needs no registry, so the language server calls this
    /// without looking up a document.
    pub fn resolve_completion(item: CompletionItem) -> CompletionItem {
        resolve_completion_item(item)
    }
}
