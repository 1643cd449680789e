//! textDocument/hover handler
//!
//! Provides hover information for variables, local functions, default types,
//! and in scenario documents, datasets and calculations.

use std::sync::LazyLock;

use regex::Regex;
use tower_lsp::lsp_types::{Hover, HoverContents, MarkupContent, MarkupKind, Position, Range};

use crate::lsp::analysis::document::byte_offset_to_utf16_offset;
use crate::lsp::analysis::language::{LanguageKind, LanguageProfile};
use crate::registry::{Registry, Symbol};

/// Dotted word ending at the cursor. It may end in the dot when the cursor
/// sits on the first character of a member.
static DOTTED_TAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9_]+(?:\.[A-Za-z0-9_]*)*$").unwrap());

/// Plain word ending at the cursor.
static WORD_TAIL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Za-z0-9_]+$").unwrap());

/// Plain word starting at the cursor.
static WORD_HEAD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+").unwrap());

/// Everything a hover request looks at.
#[derive(Debug, Clone, Copy)]
pub struct HoverRequest<'a> {
    pub profile: &'a LanguageProfile,
    pub registry: &'a Registry,
    pub position: Position,
    /// The cursor's line up to the cursor.
    pub prefix: &'a str,
    /// The cursor's line from the cursor on.
    pub suffix: &'a str,
}

/// A token spanning the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoverToken {
    pub text: String,
    /// Byte offset of the token start within the prefix.
    start: usize,
    /// Byte offset of the token end within the suffix.
    end: usize,
}

impl HoverRequest<'_> {
    fn token(&self, backward: &Regex) -> Option<HoverToken> {
        let start = backward.find(self.prefix).map_or(self.prefix.len(), |m| m.start());
        let end = WORD_HEAD.find(self.suffix).map_or(0, |m| m.end());
        let text = format!("{}{}", &self.prefix[start..], &self.suffix[..end]);
        let text = text.trim();

        (!text.is_empty()).then(|| HoverToken {
            text: text.to_string(),
            start,
            end,
        })
    }

    /// The dotted path spanning the cursor, e.g. `provider.name`.
    pub fn path_token(&self) -> Option<HoverToken> {
        self.token(&DOTTED_TAIL)
    }

    /// The plain word spanning the cursor.
    pub fn word_token(&self) -> Option<HoverToken> {
        self.token(&WORD_TAIL)
    }

    /// The full name inside an open reference quote, spaces included.
    pub fn quoted_token(&self) -> Option<HoverToken> {
        let quote = self.profile.reference_quote?;
        if self.prefix.chars().filter(|c| *c == quote).count() % 2 == 0 {
            return None;
        }

        let start = self.prefix.rfind(quote)? + quote.len_utf8();
        let end = self.suffix.find(quote).unwrap_or(self.suffix.len());
        let text = format!("{}{}", &self.prefix[start..], &self.suffix[..end]);
        let text = text.trim();

        (!text.is_empty()).then(|| HoverToken {
            text: text.to_string(),
            start,
            end,
        })
    }

    fn range(&self, token: &HoverToken) -> Range {
        let cursor = self.position.character;
        let before = self.prefix.len() - token.start;
        let back = byte_offset_to_utf16_offset(&self.prefix[token.start..], before) as u32;
        let forward = byte_offset_to_utf16_offset(self.suffix, token.end) as u32;

        Range {
            start: Position {
                line: self.position.line,
                character: cursor.saturating_sub(back),
            },
            end: Position {
                line: self.position.line,
                character: cursor + forward,
            },
        }
    }
}

/// Resolve the token under the cursor.
///
/// Lookups run in order (variable path, local function, default type, then
/// dataset and calculation for scenario documents) and the first hit wins.
pub fn get_hover(request: &HoverRequest<'_>) -> Option<Hover> {
    let registry = request.registry;

    if let Some(token) = request.path_token() {
        if let Some(symbol) = registry.resolve_path(&token.text) {
            return Some(markdown_hover(symbol_markdown(symbol), request.range(&token)));
        }
    }

    let word = request.word_token();
    if let Some(token) = &word {
        if let Some(function) = registry.function(&token.text) {
            let header = match &function.return_type {
                Some(ret) => format!("Return type: {ret}"),
                None => format!("`{}`", function.signature()),
            };
            let value = join_parts([Some(header.as_str()), function.description.as_deref()]);
            return Some(markdown_hover(value, request.range(token)));
        }

        if let Some(default_type) = registry.default_type(&token.text) {
            let header = format!("Type: {}", default_type.label);
            let value = join_parts([Some(header.as_str()), default_type.description.as_deref()]);
            return Some(markdown_hover(value, request.range(token)));
        }
    }

    if request.profile.kind != LanguageKind::Sentence {
        return None;
    }

    let token = request.quoted_token().or(word)?;

    if let Some(dataset) = registry.dataset(&token.text) {
        let header = format!("Dataset: {}", dataset.name);
        let value = join_parts([Some(header.as_str()), dataset.description.as_deref()]);
        return Some(markdown_hover(value, request.range(&token)));
    }

    if let Some(calculation) = registry.calculation(&token.text) {
        let header = format!("Calculation: {}", calculation.name);
        let value = join_parts([Some(header.as_str()), calculation.description.as_deref()]);
        return Some(markdown_hover(value, request.range(&token)));
    }

    None
}

fn symbol_markdown(symbol: &Symbol) -> String {
    let header = symbol.type_name.as_ref().map(|t| format!("Type: {t}"));
    let value = join_parts([header.as_deref(), symbol.description.as_deref()]);

    if value.is_empty() {
        format!("`{}`", symbol.name)
    } else {
        value
    }
}

fn join_parts<'a>(parts: impl IntoIterator<Item = Option<&'a str>>) -> String {
    parts
        .into_iter()
        .flatten()
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn markdown_hover(value: String, range: Range) -> Hover {
    Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value,
        }),
        range: Some(range),
    }
}
