//! textDocument/completion handler
//!
//! Provides completion items based on the detected context.

use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemKind, Documentation, MarkupContent, MarkupKind,
};

use crate::lsp::analysis::context::{CompletionContext, QuotedReference};
use crate::lsp::analysis::language::LanguageProfile;
use crate::lsp::analysis::preprocess::find_declared_variables;
use crate::registry::{
    aggregate_scope, resolve_children, DefaultType, Keyword, KeywordTable, LocalFunction,
    Registry, Symbol, CUSTOM_RESULT_MARKER,
};

/// Everything a completion request looks at.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub profile: &'a LanguageProfile,
    pub registry: &'a Registry,
    /// The cursor's line up to the cursor.
    pub prefix: &'a str,
    /// The character right after the cursor.
    pub next_char: Option<char>,
    /// The buffer from its start up to the cursor.
    pub text_before_cursor: &'a str,
}

impl CompletionRequest<'_> {
    /// Whether a reference quote is left open before the cursor.
    fn quote_open(&self) -> bool {
        self.profile.reference_quote.is_some_and(|quote| {
            self.prefix.chars().filter(|c| *c == quote).count() % 2 == 1
        })
    }

    /// `name`, closing the reference quote when `quote_open` holds unless the
    /// editor already has one right after the cursor.
    fn insert_text(&self, name: &str, quote_open: bool) -> String {
        match self.profile.reference_quote {
            Some(quote) if quote_open && self.next_char != Some(quote) => {
                format!("{name}{quote}")
            }
            _ => name.to_string(),
        }
    }
}

/// Get completion items for the given context.
pub fn get_completions(
    context: &CompletionContext,
    request: &CompletionRequest<'_>,
) -> Vec<CompletionItem> {
    match context {
        CompletionContext::MemberAccess { path, aggregate } => {
            complete_members(path, *aggregate, request)
        }
        CompletionContext::QuotedReference(reference) => complete_quoted(reference, request),
        CompletionContext::AggregateArgument => complete_aggregate_argument(request.registry),
        CompletionContext::TypeAnnotation => complete_types(request.registry),
        CompletionContext::General => complete_general(request),
    }
}

/// Children of `path`, or of its aggregate-scoped counterpart.
fn complete_members(
    path: &str,
    aggregate: bool,
    request: &CompletionRequest<'_>,
) -> Vec<CompletionItem> {
    let quote_open = request.quote_open();
    let to_item =
        |symbol: &Symbol| symbol_item(symbol, request.insert_text(&symbol.name, quote_open));

    if aggregate {
        let scope = aggregate_scope(request.registry.variables());
        resolve_children(path, &scope).into_iter().map(to_item).collect()
    } else {
        request
            .registry
            .resolve_children(path)
            .into_iter()
            .map(to_item)
            .collect()
    }
}

/// Names inside a reference quote. The classifier only matches an open
/// quote, so apostrophes earlier on the line do not matter.
fn complete_quoted(
    reference: &QuotedReference,
    request: &CompletionRequest<'_>,
) -> Vec<CompletionItem> {
    let registry = request.registry;

    match reference {
        QuotedReference::DatasetName => registry
            .datasets()
            .values()
            .map(|dataset| {
                reference_item(
                    &dataset.name,
                    CompletionItemKind::STRUCT,
                    "dataset",
                    dataset.description.as_deref(),
                    request.insert_text(&dataset.name, true),
                )
            })
            .collect(),
        QuotedReference::DatasetField { dataset } => registry
            .dataset(dataset)
            .map(|dataset| {
                dataset
                    .fields
                    .values()
                    .map(|field| symbol_item(field, request.insert_text(&field.name, true)))
                    .collect()
            })
            .unwrap_or_default(),
        QuotedReference::CalculationName => registry
            .calculations()
            .values()
            .map(|calculation| {
                reference_item(
                    &calculation.name,
                    CompletionItemKind::VALUE,
                    "calculation",
                    calculation.description.as_deref(),
                    request.insert_text(&calculation.name, true),
                )
            })
            .collect(),
    }
}

/// Aggregable variables plus default types.
fn complete_aggregate_argument(registry: &Registry) -> Vec<CompletionItem> {
    let scope = aggregate_scope(registry.variables());
    let mut items: Vec<CompletionItem> = scope
        .values()
        .map(|symbol| symbol_item(symbol, symbol.name.clone()))
        .collect();
    items.extend(complete_types(registry));
    items
}

fn complete_types(registry: &Registry) -> Vec<CompletionItem> {
    registry.default_types().values().map(type_item).collect()
}

/// Start of an expression: variables, declared locals, functions, and
/// depending on the prefix, types and keywords.
fn complete_general(request: &CompletionRequest<'_>) -> Vec<CompletionItem> {
    let registry = request.registry;
    let mut items: Vec<CompletionItem> = registry
        .variables()
        .values()
        .map(|symbol| symbol_item(symbol, symbol.name.clone()))
        .collect();

    for name in find_declared_variables(request.text_before_cursor, request.profile) {
        if registry.variables().contains_key(&name.to_lowercase()) {
            continue;
        }
        items.push(CompletionItem {
            label: name.clone(),
            kind: Some(CompletionItemKind::FIELD),
            insert_text: Some(name),
            ..Default::default()
        });
    }

    for function in registry.functions().values() {
        let item = function_item(function);
        match items
            .iter_mut()
            .find(|existing| existing.label.eq_ignore_ascii_case(&item.label))
        {
            Some(existing) => *existing = item,
            None => items.push(item),
        }
    }

    if request.profile.type_annotation_anywhere.is_match(request.prefix) {
        items.extend(complete_types(registry));
    }

    if keywords_triggered(request.prefix, registry.keywords()) {
        items.extend(registry.keywords().values().map(keyword_item));
    }

    items
}

/// Keywords are offered on an empty line or after a single letter that
/// starts one of them.
fn keywords_triggered(prefix: &str, keywords: &KeywordTable) -> bool {
    let trimmed = prefix.trim();
    let mut chars = trimmed.chars();

    match (chars.next(), chars.next()) {
        (None, _) => true,
        (Some(letter), None) if letter.is_alphabetic() => keywords.values().any(|keyword| {
            keyword
                .label
                .chars()
                .next()
                .is_some_and(|first| first.to_lowercase().eq(letter.to_lowercase()))
        }),
        _ => false,
    }
}

/// Append `(` to a function's insert text when the item is accepted.
///
/// Items documented with the custom-result marker are values and stay as
/// they are.
pub fn resolve_completion_item(mut item: CompletionItem) -> CompletionItem {
    if item.kind != Some(CompletionItemKind::FUNCTION) {
        return item;
    }
    if documentation_text(&item).is_some_and(|doc| doc.contains(CUSTOM_RESULT_MARKER)) {
        return item;
    }

    let text = item.insert_text.take().unwrap_or_else(|| item.label.clone());
    item.insert_text = Some(if text.ends_with('(') {
        text
    } else {
        format!("{text}(")
    });
    item
}

fn documentation_text(item: &CompletionItem) -> Option<&str> {
    match item.documentation.as_ref()? {
        Documentation::String(text) => Some(text.as_str()),
        Documentation::MarkupContent(markup) => Some(markup.value.as_str()),
    }
}

fn symbol_item(symbol: &Symbol, insert_text: String) -> CompletionItem {
    CompletionItem {
        label: symbol.name.clone(),
        kind: Some(CompletionItemKind::FIELD),
        detail: symbol.type_name.clone(),
        insert_text: Some(insert_text),
        documentation: markdown(
            [symbol.friendly_name.as_deref(), symbol.description.as_deref()]
                .into_iter()
                .flatten(),
        ),
        ..Default::default()
    }
}

fn function_item(function: &LocalFunction) -> CompletionItem {
    let params: Vec<String> = function
        .parameters
        .iter()
        .map(|p| match &p.description {
            Some(desc) => format!("- `{}`: {}", p.name, desc),
            None => format!("- `{}`", p.name),
        })
        .collect();
    let params = params.join("\n");

    CompletionItem {
        label: function.label.clone(),
        kind: Some(CompletionItemKind::FUNCTION),
        detail: Some(function.signature()),
        insert_text: Some(function.label.clone()),
        documentation: markdown(
            [
                function.friendly_name.as_deref(),
                function.description.as_deref(),
                (!params.is_empty()).then_some(params.as_str()),
            ]
            .into_iter()
            .flatten(),
        ),
        ..Default::default()
    }
}

fn type_item(default_type: &DefaultType) -> CompletionItem {
    CompletionItem {
        label: default_type.label.clone(),
        kind: Some(CompletionItemKind::CLASS),
        detail: Some("type".to_string()),
        insert_text: Some(default_type.label.clone()),
        documentation: markdown(default_type.description.as_deref()),
        ..Default::default()
    }
}

fn keyword_item(keyword: &Keyword) -> CompletionItem {
    CompletionItem {
        label: keyword.label.clone(),
        kind: Some(CompletionItemKind::KEYWORD),
        detail: keyword.template.as_ref().map(|_| "snippet".to_string()),
        insert_text: Some(keyword.insert_text().to_string()),
        ..Default::default()
    }
}

fn reference_item(
    name: &str,
    kind: CompletionItemKind,
    detail: &str,
    description: Option<&str>,
    insert_text: String,
) -> CompletionItem {
    CompletionItem {
        label: name.to_string(),
        kind: Some(kind),
        detail: Some(detail.to_string()),
        insert_text: Some(insert_text),
        documentation: markdown(description),
        ..Default::default()
    }
}

/// Markdown documentation from the non-empty parts, separated by a blank line.
fn markdown<'a>(parts: impl IntoIterator<Item = &'a str>) -> Option<Documentation> {
    let value = parts
        .into_iter()
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    (!value.is_empty()).then(|| {
        Documentation::MarkupContent(MarkupContent {
            kind: MarkupKind::Markdown,
            value,
        })
    })
}
