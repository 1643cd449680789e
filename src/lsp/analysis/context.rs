//! Completion context detection from the text before the cursor
//!
//! Classification is an ordered table of rules. Each rule looks at the
//! current line and either claims the cursor or passes; the first rule that
//! claims it decides the context. When no rule claims it, no completions are
//! offered.

use tracing::debug;

use super::language::{LanguageProfile, QuotedReferenceKind};

/// The context for providing completions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionContext {
    /// Directly after `path.`, expecting a child of `path`
    MemberAccess {
        /// Dotted path before the final dot
        path: String,
        /// Resolve against the aggregate scope instead of all variables
        aggregate: bool,
    },

    /// Inside an open reference quote
    QuotedReference(QuotedReference),

    /// Inside the argument of an aggregate function
    AggregateArgument,

    /// After an `As` type annotation
    TypeAnnotation,

    /// Start of an expression
    General,
}

/// What an open quoted reference names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotedReference {
    DatasetName,
    DatasetField {
        /// Dataset named earlier on the line
        dataset: String,
    },
    CalculationName,
}

/// The cursor's line, split at the cursor.
#[derive(Debug, Clone, Copy)]
pub struct CursorText<'a> {
    /// From the start of the line to the cursor
    pub prefix: &'a str,
    /// From the cursor to the end of the line
    pub suffix: &'a str,
}

impl<'a> CursorText<'a> {
    pub fn new(prefix: &'a str, suffix: &'a str) -> Self {
        Self { prefix, suffix }
    }

    /// The character immediately before the cursor.
    pub fn last_char(&self) -> Option<char> {
        self.prefix.chars().next_back()
    }

    /// The character immediately after the cursor.
    pub fn next_char(&self) -> Option<char> {
        self.suffix.chars().next()
    }

    /// The prefix without the identifier fragment being typed.
    pub fn head(&self) -> &'a str {
        self.prefix
            .trim_end_matches(|c: char| c.is_alphanumeric() || c == '_')
    }
}

/// Inputs a rule may consult besides the cursor text.
#[derive(Debug, Clone, Copy)]
pub struct ClassifyEnv<'a> {
    pub profile: &'a LanguageProfile,
    pub aggregates_enabled: bool,
}

impl ClassifyEnv<'_> {
    fn in_aggregate(&self, prefix: &str) -> bool {
        self.aggregates_enabled
            && self
                .profile
                .aggregate_opener
                .as_ref()
                .is_some_and(|opener| opener.is_match(prefix))
    }
}

pub type Classifier = fn(&CursorText<'_>, &ClassifyEnv<'_>) -> Option<CompletionContext>;

/// One entry of the classification table.
pub struct ContextRule {
    pub name: &'static str,
    pub classify: Classifier,
}

/// Rules in priority order.
pub static CONTEXT_RULES: &[ContextRule] = &[
    ContextRule {
        name: "member-access",
        classify: member_access,
    },
    ContextRule {
        name: "quoted-reference",
        classify: quoted_reference,
    },
    ContextRule {
        name: "aggregate-argument",
        classify: aggregate_argument,
    },
    ContextRule {
        name: "type-annotation",
        classify: type_annotation,
    },
    ContextRule {
        name: "general",
        classify: general,
    },
];

/// Classify the cursor, or `None` when no completions apply.
pub fn detect_context(cursor: &CursorText<'_>, env: &ClassifyEnv<'_>) -> Option<CompletionContext> {
    CONTEXT_RULES.iter().find_map(|rule| {
        let context = (rule.classify)(cursor, env)?;
        debug!(rule = rule.name, ?context, "classified completion context");
        Some(context)
    })
}

fn member_access(cursor: &CursorText<'_>, env: &ClassifyEnv<'_>) -> Option<CompletionContext> {
    let before_dot = cursor.prefix.strip_suffix('.')?;
    let start = before_dot
        .char_indices()
        .rev()
        .find(|(_, c)| is_path_boundary(*c))
        .map(|(idx, c)| idx + c.len_utf8())
        .unwrap_or(0);

    Some(CompletionContext::MemberAccess {
        path: before_dot[start..].to_string(),
        aggregate: env.in_aggregate(cursor.prefix),
    })
}

fn is_path_boundary(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | '\'' | '"')
}

fn quoted_reference(cursor: &CursorText<'_>, env: &ClassifyEnv<'_>) -> Option<CompletionContext> {
    env.profile.quoted_references.iter().find_map(|quoted| {
        let caps = quoted.pattern.captures(cursor.prefix)?;
        let reference = match quoted.kind {
            QuotedReferenceKind::DatasetField => QuotedReference::DatasetField {
                dataset: caps.get(1)?.as_str().to_string(),
            },
            QuotedReferenceKind::DatasetName => QuotedReference::DatasetName,
            QuotedReferenceKind::CalculationName => QuotedReference::CalculationName,
        };
        Some(CompletionContext::QuotedReference(reference))
    })
}

fn aggregate_argument(cursor: &CursorText<'_>, env: &ClassifyEnv<'_>) -> Option<CompletionContext> {
    env.in_aggregate(cursor.prefix)
        .then_some(CompletionContext::AggregateArgument)
}

fn type_annotation(cursor: &CursorText<'_>, env: &ClassifyEnv<'_>) -> Option<CompletionContext> {
    env.profile
        .type_annotation
        .is_match(cursor.head())
        .then_some(CompletionContext::TypeAnnotation)
}

fn general(cursor: &CursorText<'_>, env: &ClassifyEnv<'_>) -> Option<CompletionContext> {
    let head = cursor.head();
    let allowed = head.trim().is_empty()
        || env
            .profile
            .allowed_prefixes
            .iter()
            .any(|pattern| pattern.is_match(head));

    allowed.then_some(CompletionContext::General)
}
