//! Catalog loading from disk and conversion into a registry.

use std::fs;

use calcsense::catalog::{CatalogError, CatalogPayload, CatalogSource, FileCatalogSource};
use calcsense::lsp::{LanguageKind, LanguageProfile};
use calcsense::registry::CUSTOM_RESULT_MARKER;
use indoc::indoc;
use tempfile::TempDir;

const PAYROLL: &str = indoc! {r#"
    {
        "aggregationsEnabled": true,
        "variables": [
            { "name": "Employee", "children": [{ "name": "Salary", "type": "Decimal" }] },
            { "name": "aggregations", "children": [{ "name": "Sum" }] }
        ],
        "functions": [
            {
                "label": "Round",
                "returnType": "Decimal",
                "parameters": [{ "name": "value", "type": "Decimal" }]
            },
            { "label": "Bonus", "isCustom": "TRUE", "description": "Yearly bonus" }
        ],
        "keywords": [{ "label": "Return" }]
    }
"#};

fn expression() -> &'static LanguageProfile {
    LanguageProfile::default_for(LanguageKind::Expression)
}

fn catalog_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, contents) in files {
        fs::write(dir.path().join(name), contents).unwrap();
    }
    dir
}

#[tokio::test]
async fn test_file_source_reads_context_catalog() {
    let dir = catalog_dir(&[("payroll.json", PAYROLL)]);
    let source = FileCatalogSource::new(dir.path());

    let payload = source.fetch("payroll").await.unwrap();
    assert!(payload.aggregations_enabled);
    assert_eq!(payload.variables.len(), 2);
    assert_eq!(payload.functions.len(), 2);
}

#[tokio::test]
async fn test_file_source_missing_context() {
    let dir = catalog_dir(&[]);
    let source = FileCatalogSource::new(dir.path());

    let err = source.fetch("payroll").await.unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(path) if path.ends_with("payroll.json")));
}

#[tokio::test]
async fn test_file_source_invalid_json() {
    let dir = catalog_dir(&[("broken.json", "{ \"variables\": [")]);
    let source = FileCatalogSource::new(dir.path());

    let err = source.fetch("broken").await.unwrap_err();
    assert!(matches!(err, CatalogError::Parse(_)));
}

#[tokio::test]
async fn test_file_source_rejects_path_traversal() {
    let dir = catalog_dir(&[]);
    let source = FileCatalogSource::new(dir.path());

    let err = source.fetch("../secrets").await.unwrap_err();
    assert!(matches!(err, CatalogError::InvalidContext(_)));
}

#[test]
fn test_registry_from_payload() {
    let registry = CatalogPayload::from_json(PAYROLL)
        .unwrap()
        .into_registry(expression());

    assert!(registry.aggregates_enabled());
    assert!(registry.resolve_path("employee.salary").is_some());
    assert!(registry.resolve_path("aggregations").is_none());

    // custom functions become values
    assert!(registry.function("Bonus").is_none());
    let bonus = registry.resolve_path("Bonus").unwrap();
    assert_eq!(
        bonus.description.as_deref(),
        Some(format!("{CUSTOM_RESULT_MARKER} Yearly bonus").as_str())
    );

    let round = registry.function("round").unwrap();
    assert_eq!(round.signature(), "Round(value As Decimal) As Decimal");

    // catalog keywords replace the built-in ones
    assert_eq!(registry.keywords().len(), 1);
}

#[test]
fn test_missing_keywords_use_profile_defaults() {
    let registry = CatalogPayload::from_json(r#"{ "variables": [{ "name": "x" }] }"#)
        .unwrap()
        .into_registry(expression());

    assert_eq!(registry.keywords().len(), expression().keywords.len());
    assert!(!registry.aggregates_enabled());
}

#[test]
fn test_string_flags() {
    let payload = CatalogPayload::from_json(indoc! {r#"
        {
            "aggregationsEnabled": "false",
            "variables": [{ "name": "Rate", "isAggregable": "True" }]
        }
    "#})
    .unwrap();

    assert!(!payload.aggregations_enabled);
    assert!(payload.variables[0].is_aggregable);
}

#[test]
fn test_empty_catalog_builds_empty_registry() {
    let registry = CatalogPayload::from_json(r#"{ "keywords": [] }"#)
        .unwrap()
        .into_registry(expression());
    assert!(registry.is_empty());
}
