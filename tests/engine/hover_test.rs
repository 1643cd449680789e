//! End-to-end hover tests through the engine.

use std::sync::Arc;

use calcsense::lsp::{Engine, LanguageKind, LanguageProfile};
use calcsense::registry::{
    calculation_table, dataset_table, function_table, symbol_table, type_table,
    CalculationSymbol, DatasetSymbol, DefaultType, LocalFunction, Parameter, Registry, Symbol,
};
use tower_lsp::lsp_types::{Hover, HoverContents, Position, Range};

fn registry() -> Registry {
    Registry::builder()
        .set_variables(symbol_table([
            Symbol::new("myVariable")
                .with_type("Decimal")
                .with_description("Running total"),
            Symbol::new("Provider").with_type("Provider").with_children([
                Symbol::new("name")
                    .with_type("String")
                    .with_description("Legal name"),
            ]),
            Symbol::new("Untyped"),
        ]))
        .set_local_functions(function_table([
            LocalFunction::new("Round")
                .with_return_type("Decimal")
                .with_description("Rounds a value"),
            LocalFunction::new("Log").with_parameter(Parameter {
                name: "message".to_string(),
                description: None,
                type_name: Some("String".to_string()),
            }),
        ]))
        .set_default_types(type_table([
            DefaultType::new("Decimal").with_description("Fixed point number")
        ]))
        .set_datasets(dataset_table([
            DatasetSymbol::new("Sales").with_description("Monthly sales lines")
        ]))
        .set_calculations(calculation_table([
            CalculationSymbol::new("Net Income").with_description("Income after tax")
        ]))
        .build()
}

fn engine(kind: LanguageKind) -> Engine {
    let profile = LanguageProfile::default_for(kind).clone();
    Engine::new(Arc::new(profile), Arc::new(registry()))
}

/// Hover with the cursor between `before` and `after` on a single line.
fn hover(engine: &Engine, before: &str, after: &str) -> Option<Hover> {
    let line = format!("{before}{after}");
    let position = Position {
        line: 0,
        character: before.encode_utf16().count() as u32,
    };
    engine.provide_hover(&line, position)
}

fn text(hover: Option<Hover>) -> String {
    match hover.expect("expected a hover").contents {
        HoverContents::Markup(markup) => markup.value,
        other => panic!("unexpected hover contents: {other:?}"),
    }
}

#[test]
fn test_variable_hover_from_either_side() {
    let engine = engine(LanguageKind::Expression);

    let early = hover(&engine, "x = myV", "ariable + 1");
    let late = hover(&engine, "x = myVariab", "le + 1");

    insta::assert_snapshot!(text(early.clone()), @r"
    Type: Decimal

    Running total
    ");
    assert_eq!(text(early), text(late));
}

#[test]
fn test_variable_hover_range() {
    let engine = engine(LanguageKind::Expression);
    let hover = hover(&engine, "x = myV", "ariable + 1").unwrap();

    assert_eq!(
        hover.range,
        Some(Range {
            start: Position {
                line: 0,
                character: 4
            },
            end: Position {
                line: 0,
                character: 14
            },
        })
    );
}

#[test]
fn test_member_path_hover() {
    let engine = engine(LanguageKind::Expression);

    let member = text(hover(&engine, "Return provider.na", "me"));
    assert_eq!(member, "Type: String\n\nLegal name");

    let parent = text(hover(&engine, "Return prov", "ider.name"));
    assert_eq!(parent, "Type: Provider");
}

#[test]
fn test_member_hover_with_cursor_after_dot() {
    let engine = engine(LanguageKind::Expression);

    let member = text(hover(&engine, "Return provider.", "name"));
    assert_eq!(member, "Type: String\n\nLegal name");

    let range = hover(&engine, "Return provider.", "name").unwrap().range.unwrap();
    assert_eq!(range.start.character, 7);
    assert_eq!(range.end.character, 20);

    assert!(hover(&engine, "Return provider.", " + 1").is_none());
}

#[test]
fn test_untyped_variable_falls_back_to_name() {
    let engine = engine(LanguageKind::Expression);
    insta::assert_snapshot!(text(hover(&engine, "Return Unty", "ped")), @"`Untyped`");
}

#[test]
fn test_function_hover() {
    let engine = engine(LanguageKind::Expression);

    let round = text(hover(&engine, "x = Rou", "nd(myVariable)"));
    assert_eq!(round, "Return type: Decimal\n\nRounds a value");

    let log = text(hover(&engine, "Lo", "g(\"done\")"));
    assert_eq!(log, "`Log(message As String)`");
}

#[test]
fn test_type_hover() {
    let engine = engine(LanguageKind::Expression);
    let value = text(hover(&engine, "Dim x As Deci", "mal"));
    assert_eq!(value, "Type: Decimal\n\nFixed point number");
}

#[test]
fn test_unknown_token_has_no_hover() {
    let engine = engine(LanguageKind::Expression);
    assert!(hover(&engine, "x = some", "thing").is_none());
    assert!(hover(&engine, "x = ", " + 1").is_none());
}

#[test]
fn test_expression_ignores_datasets_and_calculations() {
    let engine = engine(LanguageKind::Expression);
    assert!(hover(&engine, "x = Sal", "es").is_none());
}

#[test]
fn test_sentence_dataset_hover() {
    let engine = engine(LanguageKind::Sentence);
    let value = text(hover(&engine, "Given the dataset 'Sa", "les' has rows"));
    insta::assert_snapshot!(value, @r"
    Dataset: Sales

    Monthly sales lines
    ");
}

#[test]
fn test_sentence_calculation_hover_spans_spaces() {
    let engine = engine(LanguageKind::Sentence);
    let value = text(hover(&engine, "Then the result for 'Net In", "come' is 10"));
    assert_eq!(value, "Calculation: Net Income\n\nIncome after tax");
}

#[test]
fn test_sentence_still_resolves_variables() {
    let engine = engine(LanguageKind::Sentence);
    let value = text(hover(&engine, "Then myVar", "iable is 10"));
    assert_eq!(value, "Type: Decimal\n\nRunning total");
}

#[test]
fn test_empty_registry_has_no_hover() {
    let profile = LanguageProfile::default_for(LanguageKind::Expression).clone();
    let engine = Engine::new(Arc::new(profile), Arc::new(Registry::empty()));
    assert!(hover(&engine, "x = myV", "ariable").is_none());
}
