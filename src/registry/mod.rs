//! Symbol registry for one document context.
//!
//! A [`Registry`] is built once per context (usually from a catalog payload)
//! and then shared read-only behind an `Arc`. Switching context builds a new
//! registry instead of mutating the old one, so a request that started against
//! one snapshot finishes against it.

mod scope;
mod symbol;

pub use scope::{aggregate_scope, DATASETS_BRANCH};
pub use symbol::*;

/// Root-level pseudo-symbol that is never offered for completion.
pub const AGGREGATIONS_SYMBOL: &str = "aggregations";

/// Documentation marker for custom functions exposed as result variables.
pub const CUSTOM_RESULT_MARKER: &str = "(custom calculation result)";

/// Immutable snapshot of every table the engine consults.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    variables: SymbolTable,
    functions: FunctionTable,
    default_types: TypeTable,
    keywords: KeywordTable,
    datasets: DatasetTable,
    calculations: CalculationTable,
    aggregates_enabled: bool,
}

impl Registry {
    /// A registry with every table empty. All lookups return nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn variables(&self) -> &SymbolTable {
        &self.variables
    }

    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    pub fn default_types(&self) -> &TypeTable {
        &self.default_types
    }

    pub fn keywords(&self) -> &KeywordTable {
        &self.keywords
    }

    pub fn datasets(&self) -> &DatasetTable {
        &self.datasets
    }

    pub fn calculations(&self) -> &CalculationTable {
        &self.calculations
    }

    pub fn aggregates_enabled(&self) -> bool {
        self.aggregates_enabled
    }

    /// Resolve a dotted path against the root variable table.
    pub fn resolve_path(&self, path: &str) -> Option<&Symbol> {
        resolve_path(path, &self.variables)
    }

    /// Children of the symbol addressed by a dotted path.
    pub fn resolve_children(&self, path: &str) -> Vec<&Symbol> {
        resolve_children(path, &self.variables)
    }

    pub fn function(&self, label: &str) -> Option<&LocalFunction> {
        self.functions.get(&label.to_lowercase())
    }

    pub fn default_type(&self, label: &str) -> Option<&DefaultType> {
        self.default_types.get(&label.to_lowercase())
    }

    pub fn dataset(&self, name: &str) -> Option<&DatasetSymbol> {
        self.datasets.get(&name.to_lowercase())
    }

    pub fn calculation(&self, name: &str) -> Option<&CalculationSymbol> {
        self.calculations.get(&name.to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
            && self.functions.is_empty()
            && self.default_types.is_empty()
            && self.keywords.is_empty()
            && self.datasets.is_empty()
            && self.calculations.is_empty()
    }
}

/// Assembles a [`Registry`]. Each setter replaces its table wholesale.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    registry: Registry,
}

impl RegistryBuilder {
    /// Replace the root variables. The `aggregations` pseudo-symbol is dropped.
    pub fn set_variables(&mut self, mut table: SymbolTable) -> &mut Self {
        table.remove(AGGREGATIONS_SYMBOL);
        self.registry.variables = table;
        self
    }

    pub fn set_local_functions(&mut self, table: FunctionTable) -> &mut Self {
        self.registry.functions = table;
        self
    }

    pub fn set_default_types(&mut self, table: TypeTable) -> &mut Self {
        self.registry.default_types = table;
        self
    }

    pub fn set_keywords(&mut self, table: KeywordTable) -> &mut Self {
        self.registry.keywords = table;
        self
    }

    pub fn set_datasets(&mut self, table: DatasetTable) -> &mut Self {
        self.registry.datasets = table;
        self
    }

    pub fn set_calculations(&mut self, table: CalculationTable) -> &mut Self {
        self.registry.calculations = table;
        self
    }

    pub fn set_aggregates_enabled(&mut self, enabled: bool) -> &mut Self {
        self.registry.aggregates_enabled = enabled;
        self
    }

    pub fn build(&mut self) -> Registry {
        std::mem::take(&mut self.registry)
    }
}

/// Walk `path` left to right, case-insensitively.
///
/// Every segment but the last must name a composite symbol; a missing segment
/// or a leaf in the middle of the path yields `None`.
pub fn resolve_path<'a>(path: &str, table: &'a SymbolTable) -> Option<&'a Symbol> {
    let mut segments = path.split('.').peekable();
    let mut current = table;

    while let Some(segment) = segments.next() {
        let symbol = current.get(&segment.to_lowercase())?;
        if segments.peek().is_none() {
            return Some(symbol);
        }
        current = symbol.children.as_ref()?;
    }

    None
}

/// The children of the symbol addressed by `path`, or nothing.
pub fn resolve_children<'a>(path: &str, table: &'a SymbolTable) -> Vec<&'a Symbol> {
    resolve_path(path, table)
        .and_then(|symbol| symbol.children.as_ref())
        .map(|children| children.values().collect())
        .unwrap_or_default()
}
