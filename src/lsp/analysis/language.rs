//! Language profiles
//!
//! The expression language (calculation logic) and the sentence language
//! (test scenarios) share one engine. Everything that differs between them
//! lives in a [`LanguageProfile`]: comment and quote conventions, the
//! declaration pattern, the allowed-prefix patterns of the general context,
//! quoted-reference patterns and the built-in keywords.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::registry::Keyword;

/// Aggregate functions recognised when no configuration overrides them.
pub const DEFAULT_AGGREGATE_FUNCTIONS: &[&str] = &["Sum", "Average", "Avg", "Min", "Max", "Count"];

/// `Dim a, b` declarations.
static DIM_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)\bDim\s+([A-Za-z_]\w*(?:[ \t]*,[ \t]*[A-Za-z_]\w*)*)").unwrap()
});

/// `… As ` at the end of the statement head.
static TYPE_ANNOTATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\sas\s+$").unwrap());

/// `… As ` anywhere on the line.
static TYPE_ANNOTATION_ANYWHERE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\sas\s").unwrap());

static EXPRESSION_PREFIXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // statement keywords
        r"(?i)\b(?:if|elseif|then|else|while|until|return|case|not)\s+$",
        // logical operators
        r"(?i)\b(?:and|or|andalso|orelse|xor|mod|is)\s+$",
        // comparison, arithmetic, concatenation and argument separators
        r"[=<>+\-*/\\&^,(]\s*$",
        // loops and branches
        r"(?i)\bfor\s+each\s+\w+\s+in\s+$",
        r"(?i)\bfor\s+\w+\s*=\s*.+\s+to\s+$",
        r"(?i)\bselect\s+case\s+$",
        // type conversion openers
        r"(?i)\b(?:CBool|CByte|CDate|CDbl|CDec|CInt|CLng|CSng|CStr|CType)\(\s*$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static SENTENCE_PREFIXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)^\s*(?:given|when|then|and|but)\s+$",
        r"(?i)^\s*(?:feature|background|scenario(?:\s+outline)?|examples):\s*$",
        r"[=<>+\-*/,(]\s*$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static SENTENCE_QUOTED: LazyLock<Vec<QuotedPattern>> = LazyLock::new(|| {
    // The field pattern is strictly more specific than the dataset pattern and
    // is tried first.
    [
        (
            QuotedReferenceKind::DatasetField,
            r"(?i)\bthe\s+dataset\s+'([^']*)'\s+field\s+'[^']*$",
        ),
        (QuotedReferenceKind::DatasetName, r"(?i)\bthe\s+dataset\s+'[^']*$"),
        (
            QuotedReferenceKind::CalculationName,
            r"(?i)\bthe\s+result\s+for\s+'[^']*$",
        ),
    ]
    .into_iter()
    .map(|(kind, p)| QuotedPattern {
        kind,
        pattern: Regex::new(p).unwrap(),
    })
    .collect()
});

static EXPRESSION_PROFILE: LazyLock<LanguageProfile> = LazyLock::new(|| {
    LanguageProfile::expression(&default_aggregate_functions()).unwrap()
});

static SENTENCE_PROFILE: LazyLock<LanguageProfile> =
    LazyLock::new(|| LanguageProfile::sentence(&[]).unwrap());

/// Which editor language a document is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageKind {
    /// VB-like calculation expressions.
    Expression,
    /// Gherkin-like scenario sentences.
    Sentence,
}

impl LanguageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageKind::Expression => "expression",
            LanguageKind::Sentence => "sentence",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "expression" => Some(LanguageKind::Expression),
            "sentence" => Some(LanguageKind::Sentence),
            _ => None,
        }
    }
}

impl fmt::Display for LanguageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which registry table a quoted reference completes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotedReferenceKind {
    /// `the dataset '<name>' field '`
    DatasetField,
    /// `the dataset '`
    DatasetName,
    /// `the result for '`
    CalculationName,
}

/// A quoted-reference anchor, matched against the text before the cursor.
#[derive(Debug, Clone)]
pub struct QuotedPattern {
    pub kind: QuotedReferenceKind,
    pub pattern: Regex,
}

/// Per-language parameters of the completion and hover engine.
#[derive(Debug, Clone)]
pub struct LanguageProfile {
    pub kind: LanguageKind,
    pub comment_marker: char,
    pub string_quote: char,
    /// Character that stops the next quote from toggling string state.
    pub escape_char: Option<char>,
    /// Quote that delimits named references; completions inside an open one
    /// close it.
    pub reference_quote: Option<char>,
    /// Declaration statement; capture group 1 is the identifier list.
    pub declaration: Option<Regex>,
    /// Opening token of an aggregate function call.
    pub aggregate_opener: Option<Regex>,
    pub type_annotation: Regex,
    pub type_annotation_anywhere: Regex,
    pub allowed_prefixes: Vec<Regex>,
    pub quoted_references: Vec<QuotedPattern>,
    /// Used when the catalog does not supply keywords.
    pub keywords: Vec<Keyword>,
}

impl LanguageProfile {
    /// Profile for the calculation expression language.
    pub fn expression(aggregate_functions: &[String]) -> Result<Self, regex::Error> {
        let aggregate_opener = aggregate_pattern(aggregate_functions, "")?;
        let mut allowed_prefixes = EXPRESSION_PREFIXES.clone();
        if let Some(opener) = aggregate_pattern(aggregate_functions, r"\s*$")? {
            allowed_prefixes.push(opener);
        }

        Ok(Self {
            kind: LanguageKind::Expression,
            comment_marker: '\'',
            string_quote: '"',
            escape_char: None,
            reference_quote: None,
            declaration: Some(DIM_DECLARATION.clone()),
            aggregate_opener,
            type_annotation: TYPE_ANNOTATION.clone(),
            type_annotation_anywhere: TYPE_ANNOTATION_ANYWHERE.clone(),
            allowed_prefixes,
            quoted_references: Vec::new(),
            keywords: expression_keywords(),
        })
    }

    /// Profile for the scenario sentence language.
    pub fn sentence(aggregate_functions: &[String]) -> Result<Self, regex::Error> {
        Ok(Self {
            kind: LanguageKind::Sentence,
            comment_marker: '#',
            string_quote: '"',
            escape_char: Some('\\'),
            reference_quote: Some('\''),
            declaration: None,
            aggregate_opener: aggregate_pattern(aggregate_functions, "")?,
            type_annotation: TYPE_ANNOTATION.clone(),
            type_annotation_anywhere: TYPE_ANNOTATION_ANYWHERE.clone(),
            allowed_prefixes: SENTENCE_PREFIXES.clone(),
            quoted_references: SENTENCE_QUOTED.clone(),
            keywords: sentence_keywords(),
        })
    }

    pub fn build(kind: LanguageKind, aggregate_functions: &[String]) -> Result<Self, regex::Error> {
        match kind {
            LanguageKind::Expression => Self::expression(aggregate_functions),
            LanguageKind::Sentence => Self::sentence(aggregate_functions),
        }
    }

    /// The built-in profile for a language, with default aggregate functions
    /// for the expression language and none for the sentence language.
    pub fn default_for(kind: LanguageKind) -> &'static LanguageProfile {
        match kind {
            LanguageKind::Expression => &*EXPRESSION_PROFILE,
            LanguageKind::Sentence => &*SENTENCE_PROFILE,
        }
    }
}

pub fn default_aggregate_functions() -> Vec<String> {
    DEFAULT_AGGREGATE_FUNCTIONS.iter().map(|s| s.to_string()).collect()
}

/// `(?i)\b(?:Sum|Avg|…)\(` followed by `tail`, or `None` for an empty list.
fn aggregate_pattern(names: &[String], tail: &str) -> Result<Option<Regex>, regex::Error> {
    let alternatives: Vec<String> = names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .map(regex::escape)
        .collect();

    if alternatives.is_empty() {
        return Ok(None);
    }

    Regex::new(&format!(r"(?i)\b(?:{})\({}", alternatives.join("|"), tail)).map(Some)
}

fn expression_keywords() -> Vec<Keyword> {
    vec![
        Keyword::new("If").with_template("If condition Then\n\t\nElse\n\t\nEnd If"),
        Keyword::new("ElseIf"),
        Keyword::new("Else"),
        Keyword::new("End If"),
        Keyword::new("For Each").with_template("For Each item In collection\n\t\nNext"),
        Keyword::new("Next"),
        Keyword::new("Select Case")
            .with_template("Select Case value\n\tCase \n\t\t\n\tCase Else\n\t\t\nEnd Select"),
        Keyword::new("Case"),
        Keyword::new("While").with_template("While condition\n\t\nEnd While"),
        Keyword::new("Return"),
        Keyword::new("Dim"),
        Keyword::new("And"),
        Keyword::new("Or"),
        Keyword::new("Not"),
        Keyword::new("Nothing"),
        Keyword::new("True"),
        Keyword::new("False"),
    ]
}

fn sentence_keywords() -> Vec<Keyword> {
    vec![
        Keyword::new("Feature").with_template(
            "Feature: name\n\n\tScenario: name\n\t\tGiven \n\t\tWhen \n\t\tThen ",
        ),
        Keyword::new("Background").with_template("Background:\n\tGiven "),
        Keyword::new("Scenario")
            .with_template("Scenario: name\n\tGiven \n\tWhen \n\tThen "),
        Keyword::new("Examples").with_template("Examples:\n\t| column |\n\t| value |"),
        Keyword::new("Given"),
        Keyword::new("When"),
        Keyword::new("Then"),
        Keyword::new("And"),
        Keyword::new("But"),
    ]
}
