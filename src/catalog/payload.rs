//! Wire format of a context catalog.
//!
//! The metadata service delivers one JSON document per context. Every field is
//! optional; missing documentation simply stays absent.

use serde::{Deserialize, Deserializer, Serialize};

use super::error::CatalogResult;
use crate::lsp::analysis::language::LanguageProfile;
use crate::registry::{
    calculation_table, dataset_table, function_table, keyword_table, symbol_table, type_table,
    CalculationSymbol, DatasetSymbol, DefaultType, Keyword, LocalFunction, Parameter, Registry,
    Symbol, CUSTOM_RESULT_MARKER,
};

/// Everything the engine knows about one context.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogPayload {
    #[serde(deserialize_with = "deserialize_flag")]
    pub aggregations_enabled: bool,
    pub variables: Vec<SymbolPayload>,
    pub functions: Vec<FunctionPayload>,
    pub default_types: Vec<DefaultTypePayload>,
    /// `None` means "use the language's built-in keywords".
    pub keywords: Option<Vec<KeywordPayload>>,
    pub datasets: Vec<DatasetPayload>,
    pub calculations: Vec<CalculationPayload>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SymbolPayload {
    pub name: String,
    pub friendly_name: Option<String>,
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    pub description: Option<String>,
    #[serde(deserialize_with = "deserialize_flag")]
    pub is_aggregable: bool,
    pub children: Vec<SymbolPayload>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParameterPayload {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub type_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FunctionPayload {
    pub label: String,
    pub friendly_name: Option<String>,
    pub description: Option<String>,
    pub parameters: Vec<ParameterPayload>,
    pub return_type: Option<String>,
    #[serde(deserialize_with = "deserialize_flag")]
    pub is_custom: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DefaultTypePayload {
    pub label: String,
    pub description: Option<String>,
    pub members: Vec<SymbolPayload>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeywordPayload {
    pub label: String,
    pub template: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatasetPayload {
    pub name: String,
    pub description: Option<String>,
    pub fields: Vec<SymbolPayload>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CalculationPayload {
    pub name: String,
    pub description: Option<String>,
}

/// Booleans arrive either as JSON booleans or as `"true"` / `"false"`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Text(String),
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(value)) => value,
        Some(Flag::Text(text)) => text.trim().eq_ignore_ascii_case("true"),
        None => false,
    })
}

impl CatalogPayload {
    pub fn from_json(json: &str) -> CatalogResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build the registry for this catalog.
    ///
    /// Custom functions become variables holding their result, a root
    /// `aggregations` entry is dropped, and the profile's keywords fill in when
    /// the catalog carries none.
    pub fn into_registry(self, profile: &LanguageProfile) -> Registry {
        let mut variables: Vec<Symbol> = self
            .variables
            .into_iter()
            .map(SymbolPayload::into_symbol)
            .collect();
        let mut functions: Vec<LocalFunction> = Vec::new();

        for function in self.functions.into_iter().map(FunctionPayload::into_function) {
            if function.is_custom {
                variables.push(custom_result_symbol(function));
            } else {
                functions.push(function);
            }
        }

        let keywords: Vec<Keyword> = match self.keywords {
            Some(keywords) => keywords
                .into_iter()
                .map(|k| Keyword {
                    label: k.label,
                    template: k.template,
                })
                .collect(),
            None => profile.keywords.clone(),
        };

        Registry::builder()
            .set_variables(symbol_table(variables))
            .set_local_functions(function_table(functions))
            .set_default_types(type_table(
                self.default_types.into_iter().map(DefaultTypePayload::into_type),
            ))
            .set_keywords(keyword_table(keywords))
            .set_datasets(dataset_table(
                self.datasets.into_iter().map(DatasetPayload::into_dataset),
            ))
            .set_calculations(calculation_table(self.calculations.into_iter().map(|c| {
                CalculationSymbol {
                    name: c.name,
                    description: c.description,
                }
            })))
            .set_aggregates_enabled(self.aggregations_enabled)
            .build()
    }
}

impl SymbolPayload {
    fn into_symbol(self) -> Symbol {
        let children = self.children.into_iter().map(SymbolPayload::into_symbol);
        Symbol {
            name: self.name,
            friendly_name: self.friendly_name,
            type_name: self.type_name,
            description: self.description,
            is_aggregable: self.is_aggregable,
            children: None,
        }
        .with_children(children)
    }
}

impl FunctionPayload {
    fn into_function(self) -> LocalFunction {
        LocalFunction {
            label: self.label,
            friendly_name: self.friendly_name,
            description: self.description,
            parameters: self
                .parameters
                .into_iter()
                .map(|p| Parameter {
                    name: p.name,
                    description: p.description,
                    type_name: p.type_name,
                })
                .collect(),
            return_type: self.return_type,
            is_custom: self.is_custom,
        }
    }
}

impl DefaultTypePayload {
    fn into_type(self) -> DefaultType {
        DefaultType {
            label: self.label,
            description: self.description,
            members: symbol_table(self.members.into_iter().map(SymbolPayload::into_symbol)),
        }
    }
}

impl DatasetPayload {
    fn into_dataset(self) -> DatasetSymbol {
        DatasetSymbol {
            name: self.name,
            description: self.description,
            fields: symbol_table(self.fields.into_iter().map(SymbolPayload::into_symbol)),
        }
    }
}

fn custom_result_symbol(function: LocalFunction) -> Symbol {
    let description = match function.description {
        Some(description) => format!("{CUSTOM_RESULT_MARKER} {description}"),
        None => CUSTOM_RESULT_MARKER.to_string(),
    };

    Symbol {
        name: function.label,
        friendly_name: function.friendly_name,
        type_name: function.return_type,
        description: Some(description),
        is_aggregable: false,
        children: None,
    }
}
