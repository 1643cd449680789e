//! End-to-end completion tests through the engine.

use std::sync::Arc;

use calcsense::catalog::CatalogPayload;
use calcsense::lsp::{Engine, LanguageKind, LanguageProfile};
use calcsense::registry::Registry;
use indoc::indoc;
use tower_lsp::lsp_types::{CompletionItem, CompletionItemKind, Position};

const CATALOG: &str = r#"{
    "aggregationsEnabled": "true",
    "variables": [
        {
            "name": "Provider",
            "type": "Provider",
            "children": [
                { "name": "name", "type": "String", "description": "Legal name" },
                { "name": "Address", "children": [{ "name": "City", "type": "String" }] }
            ]
        },
        { "name": "Rate", "type": "Decimal", "isAggregable": true },
        { "name": "Total", "type": "Decimal" },
        {
            "name": "Datasets",
            "children": [
                {
                    "name": "Sales",
                    "children": [
                        { "name": "Amount", "type": "Decimal", "isAggregable": true },
                        { "name": "Region", "type": "String" }
                    ]
                },
                {
                    "name": "Staff",
                    "children": [{ "name": "Name", "type": "String" }]
                }
            ]
        }
    ],
    "functions": [
        { "label": "Round", "returnType": "Decimal", "description": "Rounds a value" },
        { "label": "Total", "returnType": "Decimal", "description": "Sums the lines" },
        { "label": "NetPay", "isCustom": true, "description": "Net pay" }
    ],
    "defaultTypes": [
        { "label": "Decimal", "description": "Fixed point number" },
        { "label": "String" }
    ],
    "datasets": [
        {
            "name": "Sales",
            "fields": [{ "name": "Amount", "type": "Decimal" }, { "name": "Region" }]
        }
    ],
    "calculations": [{ "name": "Net Income" }, { "name": "Gross Income" }]
}"#;

fn engine(kind: LanguageKind) -> Engine {
    let profile = LanguageProfile::default_for(kind).clone();
    let registry = CatalogPayload::from_json(CATALOG)
        .unwrap()
        .into_registry(&profile);
    Engine::new(Arc::new(profile), Arc::new(registry))
}

/// Completions with the cursor at the end of the buffer.
fn complete_at_end(engine: &Engine, buffer: &str) -> Vec<CompletionItem> {
    let lines: Vec<&str> = buffer.split('\n').collect();
    let last = lines.last().copied().unwrap_or("");
    let position = Position {
        line: (lines.len() - 1) as u32,
        character: last.encode_utf16().count() as u32,
    };
    engine.provide_completions(buffer, position, None)
}

fn labels(items: &[CompletionItem]) -> Vec<&str> {
    items.iter().map(|item| item.label.as_str()).collect()
}

fn find<'a>(items: &'a [CompletionItem], label: &str) -> &'a CompletionItem {
    items
        .iter()
        .find(|item| item.label == label)
        .unwrap_or_else(|| panic!("no completion labelled {label}: {:?}", labels(items)))
}

#[test]
fn test_member_access_offers_children() {
    let engine = engine(LanguageKind::Expression);
    let items = complete_at_end(&engine, "Return provider.");

    assert_eq!(labels(&items), vec!["Address", "name"]);
    let name = find(&items, "name");
    assert_eq!(name.kind, Some(CompletionItemKind::FIELD));
    assert_eq!(name.insert_text.as_deref(), Some("name"));
    assert_eq!(name.detail.as_deref(), Some("String"));
}

#[test]
fn test_member_access_nested_path() {
    let engine = engine(LanguageKind::Expression);
    let items = complete_at_end(&engine, "x = (Provider.Address.");
    assert_eq!(labels(&items), vec!["City"]);
}

#[test]
fn test_member_access_unknown_path_is_empty() {
    let engine = engine(LanguageKind::Expression);
    assert!(complete_at_end(&engine, "Return Nope.").is_empty());
    assert!(complete_at_end(&engine, "Return Rate.").is_empty());
}

#[test]
fn test_member_access_on_later_line() {
    let engine = engine(LanguageKind::Expression);
    let buffer = indoc! {"
        Dim x As Decimal
        x = 1
        Return Provider."};
    assert_eq!(labels(&complete_at_end(&engine, buffer)), vec!["Address", "name"]);
}

#[test]
fn test_aggregate_argument_scopes_variables() {
    let engine = engine(LanguageKind::Expression);
    let items = complete_at_end(&engine, "Return Sum(");

    let names = labels(&items);
    assert!(names.contains(&"Rate"));
    assert!(names.contains(&"Datasets"));
    assert!(!names.contains(&"Total"));
    assert!(!names.contains(&"Provider"));
    // default types follow the variables
    assert!(names.contains(&"Decimal"));
}

#[test]
fn test_member_access_inside_aggregate() {
    let engine = engine(LanguageKind::Expression);

    let datasets = complete_at_end(&engine, "Return Sum(Datasets.");
    assert_eq!(labels(&datasets), vec!["Sales"]);

    let fields = complete_at_end(&engine, "Return Sum(Datasets.Sales.");
    assert_eq!(labels(&fields), vec!["Amount"]);

    // outside an aggregate every field is offered
    let all = complete_at_end(&engine, "Return Datasets.Sales.");
    assert_eq!(labels(&all), vec!["Amount", "Region"]);
}

#[test]
fn test_aggregates_disabled_falls_back_to_general() {
    let profile = LanguageProfile::default_for(LanguageKind::Expression).clone();
    let json = CATALOG.replace(r#""aggregationsEnabled": "true""#, r#""aggregationsEnabled": false"#);
    let registry = CatalogPayload::from_json(&json).unwrap().into_registry(&profile);
    let engine = Engine::new(Arc::new(profile), Arc::new(registry));

    let items = complete_at_end(&engine, "Return Sum(");
    assert!(labels(&items).contains(&"Provider"));
}

#[test]
fn test_type_annotation_offers_types_only() {
    let engine = engine(LanguageKind::Expression);
    let items = complete_at_end(&engine, "Dim x As ");

    assert_eq!(labels(&items), vec!["Decimal", "String"]);
    assert!(items.iter().all(|item| item.kind == Some(CompletionItemKind::CLASS)));
}

#[test]
fn test_general_offers_variables_and_functions() {
    let engine = engine(LanguageKind::Expression);
    let items = complete_at_end(&engine, "Return ");

    let names = labels(&items);
    assert!(names.contains(&"Provider"));
    assert!(names.contains(&"Rate"));
    assert!(names.contains(&"Round"));
    assert!(names.contains(&"NetPay"));
    assert!(!names.contains(&"If"));
}

#[test]
fn test_function_replaces_colliding_variable() {
    let engine = engine(LanguageKind::Expression);
    let items = complete_at_end(&engine, "Return ");

    let totals: Vec<_> = items.iter().filter(|item| item.label == "Total").collect();
    assert_eq!(totals.len(), 1);
    assert_eq!(totals[0].kind, Some(CompletionItemKind::FUNCTION));
}

#[test]
fn test_custom_function_completes_as_value() {
    let engine = engine(LanguageKind::Expression);
    let items = complete_at_end(&engine, "Return ");

    let net = find(&items, "NetPay");
    assert_eq!(net.kind, Some(CompletionItemKind::FIELD));

    let resolved = Engine::resolve_completion(net.clone());
    assert_eq!(resolved.insert_text.as_deref(), Some("NetPay"));
}

#[test]
fn test_resolve_appends_paren_to_functions() {
    let engine = engine(LanguageKind::Expression);
    let items = complete_at_end(&engine, "Return ");

    let round = Engine::resolve_completion(find(&items, "Round").clone());
    assert_eq!(round.insert_text.as_deref(), Some("Round("));

    let again = Engine::resolve_completion(round);
    assert_eq!(again.insert_text.as_deref(), Some("Round("));

    let rate = Engine::resolve_completion(find(&items, "Rate").clone());
    assert_eq!(rate.insert_text.as_deref(), Some("Rate"));
}

#[test]
fn test_keywords_on_empty_line() {
    let engine = engine(LanguageKind::Expression);
    let items = complete_at_end(&engine, "x = 1\n");

    let names = labels(&items);
    assert!(names.contains(&"If"));
    assert!(names.contains(&"Return"));

    let if_item = find(&items, "If");
    assert_eq!(if_item.kind, Some(CompletionItemKind::KEYWORD));
    assert!(if_item.insert_text.as_deref().unwrap().starts_with("If condition Then"));
}

#[test]
fn test_keywords_after_single_letter() {
    let engine = engine(LanguageKind::Expression);

    let items = complete_at_end(&engine, "R");
    assert!(labels(&items).contains(&"Return"));

    // no keyword starts with Q
    let items = complete_at_end(&engine, "Q");
    assert!(items.iter().all(|item| item.kind != Some(CompletionItemKind::KEYWORD)));
}

#[test]
fn test_declared_locals_are_offered() {
    let engine = engine(LanguageKind::Expression);
    let buffer = indoc! {"
        Dim gross, tax As Decimal
        ' Dim ignored As Decimal
        Dim rate As Decimal
        Return "};
    let items = complete_at_end(&engine, buffer);

    let names = labels(&items);
    assert!(names.contains(&"gross"));
    assert!(names.contains(&"tax"));
    assert!(!names.contains(&"ignored"));
    // already a root variable
    assert_eq!(names.iter().filter(|n| n.eq_ignore_ascii_case("rate")).count(), 1);
}

#[test]
fn test_no_completions_after_plain_identifier() {
    let engine = engine(LanguageKind::Expression);
    assert!(complete_at_end(&engine, "Return total ").is_empty());
}

#[test]
fn test_empty_registry_yields_nothing() {
    let profile = LanguageProfile::default_for(LanguageKind::Expression).clone();
    let engine = Engine::new(Arc::new(profile), Arc::new(Registry::empty()));

    assert!(complete_at_end(&engine, "Return ").is_empty());
    assert!(complete_at_end(&engine, "Return provider.").is_empty());
}

#[test]
fn test_sentence_dataset_names_close_quote() {
    let engine = engine(LanguageKind::Sentence);
    let items = complete_at_end(&engine, "Given the dataset '");

    assert_eq!(labels(&items), vec!["Sales"]);
    assert_eq!(items[0].insert_text.as_deref(), Some("Sales'"));
}

#[test]
fn test_sentence_quote_not_doubled() {
    let engine = engine(LanguageKind::Sentence);
    let buffer = "Given the dataset '' has rows";
    let position = Position {
        line: 0,
        character: "Given the dataset '".len() as u32,
    };
    let items = engine.provide_completions(buffer, position, Some('\''));

    assert_eq!(labels(&items), vec!["Sales"]);
    assert_eq!(items[0].insert_text.as_deref(), Some("Sales"));
}

#[test]
fn test_sentence_quote_closed_after_apostrophe() {
    let engine = engine(LanguageKind::Sentence);
    let items = complete_at_end(&engine, "And Bob's manager uses the dataset '");

    assert_eq!(labels(&items), vec!["Sales"]);
    assert_eq!(items[0].insert_text.as_deref(), Some("Sales'"));
}

#[test]
fn test_sentence_dataset_fields() {
    let engine = engine(LanguageKind::Sentence);
    let items = complete_at_end(&engine, "Then the dataset 'Sales' field '");

    assert_eq!(labels(&items), vec!["Amount", "Region"]);
    assert_eq!(find(&items, "Amount").insert_text.as_deref(), Some("Amount'"));

    let unknown = complete_at_end(&engine, "Then the dataset 'Nope' field '");
    assert!(unknown.is_empty());
}

#[test]
fn test_sentence_calculation_names() {
    let engine = engine(LanguageKind::Sentence);
    let items = complete_at_end(&engine, "Then the result for 'Ne");

    assert_eq!(labels(&items), vec!["Gross Income", "Net Income"]);
    assert_eq!(
        find(&items, "Net Income").insert_text.as_deref(),
        Some("Net Income'")
    );
}

#[test]
fn test_sentence_keywords_on_empty_line() {
    let engine = engine(LanguageKind::Sentence);
    let items = complete_at_end(&engine, "Feature: payroll\n");

    let names = labels(&items);
    assert!(names.contains(&"Scenario"));
    assert!(names.contains(&"Given"));
    assert!(!names.contains(&"If"));
}
