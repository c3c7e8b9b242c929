//! Integration tests for native template substitution.

use std::time::Duration;

use chrono::{NaiveDate, TimeZone, Utc};
use mbql_pql::compile::CompileOptions;
use mbql_pql::metadata::StaticMetadata;
use mbql_pql::native::{parse_template, substitute, SubstitutionError, TemplateEngine};
use mbql_pql::params::{FormatError, ParamMap, ParamValue};
use mbql_pql::sql::Literal;
use serde_json::json;
use uuid::Uuid;

fn metadata() -> StaticMetadata {
    StaticMetadata::new()
        .with_field(3, "category")
        .with_field(4, "title")
}

fn params(value: serde_json::Value) -> ParamMap {
    ParamMap::from_json(&value).unwrap()
}

fn run(template: &str, params: &ParamMap) -> Result<String, SubstitutionError> {
    substitute(template, params, &metadata()).map(|q| q.query)
}

// ============================================================================
// Optional clauses
// ============================================================================

#[test]
fn test_optional_clause_removed_when_param_absent() {
    assert_eq!(
        run("SELECT * FROM t [[WHERE age > {{minAge}}]]", &ParamMap::new()).unwrap(),
        "SELECT * FROM t"
    );
}

#[test]
fn test_groups_are_all_or_nothing() {
    let template = "SELECT * FROM t WHERE 1 = 1 \
                    [[AND a = {{a}} AND b = {{b}}]] \
                    [[AND c = {{c}}]]";

    let sql = run(template, &params(json!({"a": 1, "c": "x"}))).unwrap();
    assert_eq!(sql, "SELECT * FROM t WHERE 1 = 1  AND c = 'x'");

    let sql = run(template, &params(json!({"a": 1, "b": 2}))).unwrap();
    assert_eq!(sql, "SELECT * FROM t WHERE 1 = 1 AND a = 1 AND b = 2");
}

#[test]
fn test_null_param_prunes_group_but_fails_outside() {
    let p = params(json!({"x": null}));
    assert_eq!(run("SELECT 1 [[WHERE x = {{x}}]]", &p).unwrap(), "SELECT 1");
    assert_eq!(
        run("SELECT {{x}}", &p).unwrap_err(),
        SubstitutionError::Format(FormatError::MissingParameterValue("x".into()))
    );
}

#[test]
fn test_missing_required_parameter() {
    assert_eq!(
        run("SELECT * FROM t WHERE id = {{id}}", &ParamMap::new()).unwrap_err(),
        SubstitutionError::MissingRequiredParameter("id".into())
    );
}

// ============================================================================
// Values
// ============================================================================

#[test]
fn test_array_and_scalar_values() {
    let p = params(json!({"one": [7], "many": ["a", "b", "c"], "flag": true, "ratio": 0.25}));
    let sql = run(
        "WHERE x IN {{many}} AND y = {{one}} AND z = {{flag}} AND r > {{ratio}}",
        &p,
    )
    .unwrap();
    assert_eq!(
        sql,
        "WHERE x IN ('a', 'b', 'c') AND y = 7 AND z = TRUE AND r > 0.25"
    );
}

#[test]
fn test_typed_literals() {
    let id = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
    let p = ParamMap::new()
        .with("id", Literal::from(id))
        .with(
            "day",
            Literal::from(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()),
        )
        .with(
            "at",
            Literal::from(Utc.with_ymd_and_hms(2024, 3, 9, 13, 5, 0).unwrap()),
        );
    let sql = run("{{id}} {{day}} {{at}}", &p).unwrap();
    assert_eq!(
        sql,
        "'67e55044-10b1-426f-9247-bb680e5fe0c8' '2024-03-09' '2024-03-09T13:05:00.000Z'"
    );
}

#[test]
fn test_injection_is_inlined_as_literal() {
    let p = params(json!({"name": "'; DROP TABLE users; --"}));
    assert_eq!(
        run("SELECT * FROM users WHERE name = {{name}}", &p).unwrap(),
        "SELECT * FROM users WHERE name = '''; DROP TABLE users; --'"
    );
}

// ============================================================================
// Field filters
// ============================================================================

#[test]
fn test_field_filter_operators() {
    let cases = [
        (json!({"field": 3, "value": "Gizmo"}), r#""category" = 'Gizmo'"#),
        (
            json!({"field": 3, "operator": "!=", "value": ["a", "b"]}),
            r#""category" NOT IN ('a', 'b')"#,
        ),
        (
            json!({"field": 4, "operator": "string/contains", "value": ["x", "y"]}),
            r#"("title" LIKE '%x%' OR "title" LIKE '%y%')"#,
        ),
        (
            json!({"field": 4, "operator": "ends-with", "value": "Z", "case-sensitive": false}),
            r#"LOWER("title") LIKE '%z'"#,
        ),
        (
            json!({"field": "sku", "operator": "starts-with", "value": "AB"}),
            r#""sku" LIKE 'AB%'"#,
        ),
    ];

    for (filter, expected) in cases {
        let p = params(json!({ "f": filter }));
        assert_eq!(run("WHERE {{f}}", &p).unwrap(), format!("WHERE {expected}"));
    }
}

#[test]
fn test_field_filter_without_value() {
    let p = params(json!({"f": {"field": 3, "value": null}}));
    assert_eq!(
        run("SELECT 1 WHERE {{f}}", &p).unwrap_err(),
        SubstitutionError::Format(FormatError::MissingFieldFilterValue {
            field: "category".into()
        })
    );
}

// ============================================================================
// Output value
// ============================================================================

#[test]
fn test_output_has_no_residual_params() {
    let query = TemplateEngine::new(metadata())
        .with_options(CompileOptions::default().with_timeout(Duration::from_secs(60)))
        .substitute_str("SELECT {{x}}", &ParamMap::new().with("x", ParamValue::Array(vec![1.into()])))
        .unwrap();

    assert_eq!(
        serde_json::to_value(&query).unwrap(),
        json!({"query": "SELECT 1", "params": [], "options": {"timeout": 60000}})
    );
}

#[test]
fn test_parsed_tokens_can_be_reused() {
    let tokens = parse_template("SELECT * FROM t [[WHERE id = {{id}}]]").unwrap();
    let engine = TemplateEngine::new(metadata());

    let with = engine
        .substitute(&tokens, &params(json!({"id": 5})))
        .unwrap();
    let without = engine.substitute(&tokens, &ParamMap::new()).unwrap();

    assert_eq!(with.query, "SELECT * FROM t WHERE id = 5");
    assert_eq!(without.query, "SELECT * FROM t");
}

#[test]
fn test_syntax_error_surfaces() {
    let err = run("SELECT [[ {{x}}", &ParamMap::new()).unwrap_err();
    assert!(matches!(err, SubstitutionError::TemplateSyntax(_)));
}
