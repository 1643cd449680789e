//! Symbol types held by a [`Registry`](super::Registry).
//!
//! Every table is keyed by the lower-cased name so lookups are
//! case-insensitive, while the stored value keeps the original casing for
//! display.

use std::collections::BTreeMap;

/// Lower-cased symbol name -> symbol.
pub type SymbolTable = BTreeMap<String, Symbol>;

/// Lower-cased function label -> function.
pub type FunctionTable = BTreeMap<String, LocalFunction>;

/// Lower-cased type label -> type.
pub type TypeTable = BTreeMap<String, DefaultType>;

/// Lower-cased keyword label -> keyword.
pub type KeywordTable = BTreeMap<String, Keyword>;

/// Lower-cased dataset name -> dataset.
pub type DatasetTable = BTreeMap<String, DatasetSymbol>;

/// Lower-cased calculation name -> calculation.
pub type CalculationTable = BTreeMap<String, CalculationSymbol>;

/// A named, typed variable or field, optionally containing nested symbols.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Symbol {
    pub name: String,
    pub friendly_name: Option<String>,
    pub type_name: Option<String>,
    pub description: Option<String>,
    pub is_aggregable: bool,
    /// Present only when the symbol's type is composite.
    pub children: Option<SymbolTable>,
}

impl Symbol {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_friendly_name(mut self, friendly_name: impl Into<String>) -> Self {
        self.friendly_name = Some(friendly_name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn aggregable(mut self, is_aggregable: bool) -> Self {
        self.is_aggregable = is_aggregable;
        self
    }

    /// Attach child symbols. An empty iterator leaves the symbol a leaf.
    pub fn with_children(mut self, children: impl IntoIterator<Item = Symbol>) -> Self {
        let table = symbol_table(children);
        self.children = if table.is_empty() { None } else { Some(table) };
        self
    }

    /// The lookup key for this symbol.
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }

    pub fn is_composite(&self) -> bool {
        self.children.is_some()
    }
}

/// Build a table from symbols. Later duplicates replace earlier ones.
pub fn symbol_table(symbols: impl IntoIterator<Item = Symbol>) -> SymbolTable {
    symbols.into_iter().map(|s| (s.key(), s)).collect()
}

/// A parameter of a local function.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Parameter {
    pub name: String,
    pub description: Option<String>,
    pub type_name: Option<String>,
}

/// A callable function defined for the current document context.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LocalFunction {
    pub label: String,
    pub friendly_name: Option<String>,
    pub description: Option<String>,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<String>,
    /// User-authored function; exposed as a variable holding its result.
    pub is_custom: bool,
}

impl LocalFunction {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    pub fn with_return_type(mut self, return_type: impl Into<String>) -> Self {
        self.return_type = Some(return_type.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn custom(mut self, is_custom: bool) -> Self {
        self.is_custom = is_custom;
        self
    }

    pub fn key(&self) -> String {
        self.label.to_lowercase()
    }

    /// Display signature, e.g. `Round(value As Decimal, digits) As Decimal`.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .parameters
            .iter()
            .map(|p| match &p.type_name {
                Some(t) => format!("{} As {}", p.name, t),
                None => p.name.clone(),
            })
            .collect();

        match &self.return_type {
            Some(ret) => format!("{}({}) As {}", self.label, params.join(", "), ret),
            None => format!("{}({})", self.label, params.join(", ")),
        }
    }
}

pub fn function_table(functions: impl IntoIterator<Item = LocalFunction>) -> FunctionTable {
    functions.into_iter().map(|f| (f.key(), f)).collect()
}

/// A built-in type such as `Decimal` or `Date`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DefaultType {
    pub label: String,
    pub description: Option<String>,
    pub members: SymbolTable,
}

impl DefaultType {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn key(&self) -> String {
        self.label.to_lowercase()
    }
}

pub fn type_table(types: impl IntoIterator<Item = DefaultType>) -> TypeTable {
    types.into_iter().map(|t| (t.key(), t)).collect()
}

/// A reserved word, optionally inserted as a multi-line skeleton.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Keyword {
    pub label: String,
    pub template: Option<String>,
}

impl Keyword {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            template: None,
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn key(&self) -> String {
        self.label.to_lowercase()
    }

    /// Text inserted when the keyword is accepted.
    pub fn insert_text(&self) -> &str {
        self.template.as_deref().unwrap_or(&self.label)
    }
}

pub fn keyword_table(keywords: impl IntoIterator<Item = Keyword>) -> KeywordTable {
    keywords.into_iter().map(|k| (k.key(), k)).collect()
}

/// A dataset that scenario sentences can reference by name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DatasetSymbol {
    pub name: String,
    pub description: Option<String>,
    pub fields: SymbolTable,
}

impl DatasetSymbol {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_fields(mut self, fields: impl IntoIterator<Item = Symbol>) -> Self {
        self.fields = symbol_table(fields);
        self
    }

    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }
}

pub fn dataset_table(datasets: impl IntoIterator<Item = DatasetSymbol>) -> DatasetTable {
    datasets.into_iter().map(|d| (d.key(), d)).collect()
}

/// A calculation whose result scenario sentences can reference.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CalculationSymbol {
    pub name: String,
    pub description: Option<String>,
}

impl CalculationSymbol {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }
}

pub fn calculation_table(
    calculations: impl IntoIterator<Item = CalculationSymbol>,
) -> CalculationTable {
    calculations.into_iter().map(|c| (c.key(), c)).collect()
}
