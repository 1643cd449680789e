//! Aggregate-scoped view of the root variable table.

use super::symbol::{Symbol, SymbolTable};

/// Root branch whose children are datasets of aggregable fields.
pub const DATASETS_BRANCH: &str = "datasets";

/// Variables that may appear inside an aggregate function argument.
///
/// The result is an owned deep copy: the `datasets` branch keeps only its
/// aggregable fields (datasets left without any are dropped) and any other
/// top-level symbol is kept only when it is flagged aggregable itself.
pub fn aggregate_scope(variables: &SymbolTable) -> SymbolTable {
    let mut scoped = SymbolTable::new();

    for (key, symbol) in variables {
        if key == DATASETS_BRANCH {
            if let Some(branch) = scoped_datasets(symbol) {
                scoped.insert(key.clone(), branch);
            }
        } else if symbol.is_aggregable {
            scoped.insert(key.clone(), symbol.clone());
        }
    }

    scoped
}

fn scoped_datasets(branch: &Symbol) -> Option<Symbol> {
    let datasets: SymbolTable = branch
        .children
        .iter()
        .flatten()
        .filter_map(|(key, dataset)| aggregable_dataset(dataset).map(|d| (key.clone(), d)))
        .collect();

    if datasets.is_empty() {
        return None;
    }

    Some(Symbol {
        name: branch.name.clone(),
        friendly_name: branch.friendly_name.clone(),
        type_name: branch.type_name.clone(),
        description: branch.description.clone(),
        is_aggregable: branch.is_aggregable,
        children: Some(datasets),
    })
}

fn aggregable_dataset(dataset: &Symbol) -> Option<Symbol> {
    let fields: SymbolTable = dataset
        .children
        .as_ref()?
        .iter()
        .filter(|(_, field)| field.is_aggregable)
        .map(|(key, field)| (key.clone(), field.clone()))
        .collect();

    if fields.is_empty() {
        return None;
    }

    Some(Symbol {
        name: dataset.name.clone(),
        friendly_name: dataset.friendly_name.clone(),
        type_name: dataset.type_name.clone(),
        description: dataset.description.clone(),
        is_aggregable: dataset.is_aggregable,
        children: Some(fields),
    })
}
