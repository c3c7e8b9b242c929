//! JSON query map to [`MbqlQuery`].
//!
//! MBQL clauses are JSON arrays headed by a keyword, e.g.
//! `["=", ["field", 12, null], 10]`. Each clause shape is decoded exactly once
//! here; downstream code only sees typed values.

use serde_json::{Map, Value};

use crate::compile::{CompileError, CompileResult};
use crate::sql::{Literal, SortDir};

use super::aggregation::dedupe_aliases;
use super::{
    AggregationKind, AggregationSpec, CompareOp, FieldRef, FilterExpr, MatchOp, MbqlQuery,
    Operand, OrderSpec, OrderTarget,
};

/// Parse a full query map: `{"database": 1, "type": "query", "query": {...}}`.
pub fn parse_query(value: &Value) -> CompileResult<MbqlQuery> {
    let outer = as_object(value, "query map")?;

    if let Some(kind) = outer.get("type").and_then(Value::as_str) {
        if kind != "query" {
            return Err(invalid(format!(
                "expected an MBQL query, got type '{kind}'"
            )));
        }
    }

    let body = outer
        .get("query")
        .ok_or_else(|| invalid("missing 'query' body"))
        .and_then(|q| as_object(q, "query body"))?;

    let source_table = body
        .get("source-table")
        .and_then(Value::as_i64)
        .ok_or_else(|| invalid("'source-table' must be a table id"))?;

    let mut query = MbqlQuery::new(source_table);
    query.database = outer.get("database").and_then(Value::as_i64);

    if let Some(fields) = body.get("fields") {
        query.fields = parse_field_list(fields, "fields")?;
    }
    if let Some(breakout) = body.get("breakout") {
        query.breakout = parse_field_list(breakout, "breakout")?;
    }
    if let Some(aggregation) = body.get("aggregation") {
        query.aggregations = parse_aggregations(aggregation)?;
    }
    if let Some(filter) = body.get("filter").filter(|f| !f.is_null()) {
        query.filter = Some(parse_filter(filter)?);
    }
    if let Some(order_by) = body.get("order-by") {
        query.order_by = parse_order_by(order_by, query.aggregations.len())?;
    }

    query.limit = optional_u64(body.get("limit"), "limit")?;
    match body.get("page") {
        None | Some(Value::Null) => {}
        Some(Value::Object(page)) => {
            query.page = Some(page_number(page.get("page"))?);
            if let Some(items) = optional_u64(page.get("items"), "items")? {
                query.limit = Some(items);
            }
        }
        Some(page) => query.page = Some(page_number(Some(page))?),
    }

    Ok(query)
}

/// Parse a field reference.
///
/// ```text
/// 12
/// ["field-id", 12]
/// ["field", 12, {...}]          ["field", "name", {...}]
/// ["field-literal", "name", "type/Text"]
/// ["datetime-field", <field>, "day"]
/// ```
pub fn parse_field_ref(value: &Value) -> CompileResult<FieldRef> {
    if let Some(id) = value.as_i64() {
        return Ok(FieldRef::Id(id));
    }

    let (head, args) = clause(value, "field reference")?;
    match (head, args) {
        ("field-id", [id]) => id
            .as_i64()
            .map(FieldRef::Id)
            .ok_or_else(|| invalid("'field-id' expects an integer id")),
        ("field", [target, ..]) => match target {
            Value::Number(n) => n
                .as_i64()
                .map(FieldRef::Id)
                .ok_or_else(|| invalid("'field' id must be an integer")),
            Value::String(name) => Ok(FieldRef::Name(name.clone())),
            _ => Err(invalid("'field' expects an id or a column name")),
        },
        ("field-literal", [Value::String(name), ..]) => Ok(FieldRef::Name(name.clone())),
        ("datetime-field", [inner, ..]) => parse_field_ref(inner),
        ("fk->", _) | ("joined-field", _) => Err(invalid("joins are not supported")),
        (other, _) => Err(invalid(format!("unsupported field reference '{other}'"))),
    }
}

fn parse_field_list(value: &Value, clause_name: &str) -> CompileResult<Vec<FieldRef>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items.iter().map(parse_field_ref).collect(),
        _ => Err(invalid(format!("'{clause_name}' must be a list"))),
    }
}

/// Parse a filter clause.
pub fn parse_filter(value: &Value) -> CompileResult<FilterExpr> {
    let (head, args) = match value {
        Value::Array(items) => match items.split_first() {
            Some((Value::String(head), args)) => (head.as_str(), args),
            _ => return Err(malformed("filter clauses start with an operator")),
        },
        _ => return Err(malformed("filter clauses must be lists")),
    };

    match head {
        "and" | "or" => {
            if args.is_empty() {
                return Err(malformed(format!("'{head}' requires at least one clause")));
            }
            let children = args
                .iter()
                .map(parse_filter)
                .collect::<CompileResult<Vec<_>>>()?;
            Ok(if head == "and" {
                FilterExpr::And(children)
            } else {
                FilterExpr::Or(children)
            })
        }
        "not" => match args {
            [child] => Ok(FilterExpr::not(parse_filter(child)?)),
            _ => Err(malformed("'not' takes exactly one clause")),
        },
        "between" => match args {
            [field, low, high] => Ok(FilterExpr::Between {
                field: parse_field_ref(field)?,
                low: parse_value(low)?,
                high: parse_value(high)?,
            }),
            _ => Err(malformed("'between' takes a field and two bounds")),
        },
        "=" | "!=" => {
            let Some((field, values)) = args.split_first() else {
                return Err(malformed(format!("'{head}' requires a field")));
            };
            let field = parse_field_ref(field)?;
            let mut values = values
                .iter()
                .map(parse_value)
                .collect::<CompileResult<Vec<_>>>()?;
            match values.len() {
                0 => Err(malformed(format!("'{head}' requires a value"))),
                1 => Ok(FilterExpr::Compare {
                    op: if head == "=" { CompareOp::Eq } else { CompareOp::Ne },
                    field,
                    value: values.remove(0),
                }),
                _ => Ok(FilterExpr::In {
                    field,
                    values,
                    negated: head == "!=",
                }),
            }
        }
        _ => {
            if let Some(op) = CompareOp::from_keyword(head) {
                return match args {
                    [field, value] => Ok(FilterExpr::Compare {
                        op,
                        field: parse_field_ref(field)?,
                        value: parse_value(value)?,
                    }),
                    _ => Err(malformed(format!("'{head}' takes a field and a value"))),
                };
            }
            if let Some(op) = MatchOp::from_keyword(head) {
                return match args {
                    [field, value, rest @ ..] if rest.len() <= 1 => Ok(FilterExpr::Match {
                        op,
                        field: parse_field_ref(field)?,
                        value: parse_value(value)?,
                        case_sensitive: case_sensitive(rest.first())?,
                    }),
                    _ => Err(malformed(format!("'{head}' takes a field and a value"))),
                };
            }
            Err(CompileError::UnsupportedOperator(head.to_string()))
        }
    }
}

fn case_sensitive(options: Option<&Value>) -> CompileResult<bool> {
    match options {
        None | Some(Value::Null) => Ok(true),
        Some(Value::Object(opts)) => match opts.get("case-sensitive") {
            None => Ok(true),
            Some(Value::Bool(b)) => Ok(*b),
            Some(_) => Err(invalid("'case-sensitive' must be a boolean")),
        },
        Some(_) => Err(invalid("filter options must be an object")),
    }
}

/// A filter value: a JSON scalar or `["value", v, {...}]`.
fn parse_value(value: &Value) -> CompileResult<Literal> {
    if let Some(literal) = Literal::from_json(value) {
        return Ok(literal);
    }
    match clause(value, "value") {
        Ok(("value", [inner, ..])) => parse_value(inner),
        _ => Err(invalid(format!("unsupported filter value: {value}"))),
    }
}

/// `aggregation` is a list of clauses; a single bare clause is also accepted.
fn parse_aggregations(value: &Value) -> CompileResult<Vec<AggregationSpec>> {
    let clauses: Vec<&Value> = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) if matches!(items.first(), Some(Value::String(_))) => vec![value],
        Value::Array(items) => items.iter().collect(),
        _ => return Err(invalid("'aggregation' must be a list")),
    };

    let mut specs = clauses
        .into_iter()
        .map(parse_aggregation)
        .collect::<CompileResult<Vec<_>>>()?;
    dedupe_aliases(&mut specs);
    Ok(specs)
}

fn parse_aggregation(value: &Value) -> CompileResult<AggregationSpec> {
    let (head, args) = clause(value, "aggregation")?;
    match (head, args) {
        ("aggregation-options", [inner, options, ..]) => {
            let spec = parse_aggregation(inner)?;
            let name = options
                .get("name")
                .or_else(|| options.get("display-name"))
                .and_then(Value::as_str);
            Ok(match name {
                Some(name) => spec.with_alias(name),
                None => spec,
            })
        }
        ("named", [inner, Value::String(name), ..]) => Ok(parse_aggregation(inner)?.with_alias(name)),
        _ => {
            let kind = AggregationKind::from_keyword(head)?;
            match (kind, args) {
                (AggregationKind::Count, []) => Ok(AggregationSpec::count()),
                (AggregationKind::Count, [field]) => {
                    Ok(AggregationSpec::new(kind, Some(parse_field_ref(field)?)))
                }
                (AggregationKind::Percentile, [field, p]) => {
                    let operand = match p {
                        Value::Number(_) => Operand::Value(parse_value(p)?),
                        _ => Operand::Field(parse_field_ref(p)?),
                    };
                    Ok(AggregationSpec::percentile(parse_field_ref(field)?, operand))
                }
                (AggregationKind::Percentile, _) => Err(invalid(
                    "'percentile' takes a field and a percentile",
                )),
                (_, [field]) => Ok(AggregationSpec::of(kind, parse_field_ref(field)?)),
                _ => Err(invalid(format!("'{head}' takes exactly one field"))),
            }
        }
    }
}

fn parse_order_by(value: &Value, aggregation_count: usize) -> CompileResult<Vec<OrderSpec>> {
    let Value::Array(items) = value else {
        return Err(invalid("'order-by' must be a list"));
    };

    items
        .iter()
        .map(|item| {
            let (head, args) = clause(item, "order-by item")?;
            let dir = match head {
                "asc" => SortDir::Asc,
                "desc" => SortDir::Desc,
                other => return Err(invalid(format!("unknown sort direction '{other}'"))),
            };
            let [target] = args else {
                return Err(invalid("order-by items take exactly one target"));
            };
            let target = match clause(target, "order-by target") {
                Ok(("aggregation", [index])) => {
                    let index = index
                        .as_u64()
                        .and_then(|i| usize::try_from(i).ok())
                        .filter(|i| *i < aggregation_count)
                        .ok_or_else(|| invalid("order-by references a missing aggregation"))?;
                    OrderTarget::Aggregation(index)
                }
                _ => OrderTarget::Field(parse_field_ref(target)?),
            };
            Ok(OrderSpec { target, dir })
        })
        .collect()
}

fn optional_u64(value: Option<&Value>, name: &str) -> CompileResult<Option<u64>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .map(Some)
            .ok_or_else(|| invalid(format!("'{name}' must be a non-negative integer"))),
    }
}

fn page_number(value: Option<&Value>) -> CompileResult<u64> {
    value
        .and_then(Value::as_u64)
        .filter(|page| *page >= 1)
        .ok_or_else(|| invalid("'page' must be a positive integer"))
}

fn clause<'a>(value: &'a Value, what: &str) -> CompileResult<(&'a str, &'a [Value])> {
    match value {
        Value::Array(items) => match items.split_first() {
            Some((Value::String(head), args)) => Ok((head.as_str(), args)),
            _ => Err(invalid(format!("malformed {what}: {value}"))),
        },
        _ => Err(invalid(format!("malformed {what}: {value}"))),
    }
}

fn as_object<'a>(value: &'a Value, what: &str) -> CompileResult<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| invalid(format!("{what} must be an object")))
}

fn invalid(message: impl Into<String>) -> CompileError {
    CompileError::InvalidQuery(message.into())
}

fn malformed(message: impl Into<String>) -> CompileError {
    CompileError::MalformedFilterTree(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(query: Value) -> Value {
        json!({"database": 1, "type": "query", "query": query})
    }

    #[test]
    fn test_parse_full_query() {
        let query = parse_query(&body(json!({
            "source-table": 5,
            "fields": [["field", 10, null], 11],
            "breakout": [["field-id", 12]],
            "aggregation": [["count"], ["sum", ["field", 11, null]]],
            "filter": ["and", ["=", ["field", 10, null], 3], [">", 11, 0]],
            "order-by": [["desc", ["aggregation", 1]], ["asc", 12]],
            "limit": 10,
            "page": 2
        })))
        .unwrap();

        assert_eq!(query.database, Some(1));
        assert_eq!(query.source_table, 5);
        assert_eq!(query.fields, vec![FieldRef::Id(10), FieldRef::Id(11)]);
        assert_eq!(query.breakout, vec![FieldRef::Id(12)]);
        assert_eq!(query.aggregations.len(), 2);
        assert_eq!(query.aggregations[1].alias, "sum");
        assert_eq!(
            query.order_by[0],
            OrderSpec {
                target: OrderTarget::Aggregation(1),
                dir: SortDir::Desc
            }
        );
        assert_eq!(query.order_by[1], OrderSpec::asc(FieldRef::Id(12)));
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.page, Some(2));
        assert!(matches!(query.filter, Some(FilterExpr::And(ref c)) if c.len() == 2));
    }

    #[test]
    fn test_field_forms() {
        assert_eq!(parse_field_ref(&json!(3)).unwrap(), FieldRef::Id(3));
        assert_eq!(parse_field_ref(&json!(["field-id", 3])).unwrap(), FieldRef::Id(3));
        assert_eq!(
            parse_field_ref(&json!(["field", "total", {"base-type": "type/Float"}])).unwrap(),
            FieldRef::Name("total".into())
        );
        assert_eq!(
            parse_field_ref(&json!(["field-literal", "total", "type/Float"])).unwrap(),
            FieldRef::Name("total".into())
        );
        assert_eq!(
            parse_field_ref(&json!(["datetime-field", ["field-id", 4], "day"])).unwrap(),
            FieldRef::Id(4)
        );
        assert!(parse_field_ref(&json!(["fk->", 1, 2])).is_err());
    }

    #[test]
    fn test_multi_value_equality() {
        let filter = parse_filter(&json!(["!=", 4, "a", "b"])).unwrap();
        assert_eq!(
            filter,
            FilterExpr::In {
                field: FieldRef::Id(4),
                values: vec!["a".into(), "b".into()],
                negated: true
            }
        );
    }

    #[test]
    fn test_match_filter_options() {
        let filter =
            parse_filter(&json!(["starts-with", 4, "ab", {"case-sensitive": false}])).unwrap();
        assert_eq!(
            filter,
            FilterExpr::Match {
                op: MatchOp::StartsWith,
                field: FieldRef::Id(4),
                value: "ab".into(),
                case_sensitive: false
            }
        );
    }

    #[test]
    fn test_value_wrapper() {
        let filter = parse_filter(&json!(["<", 4, ["value", 7, {"base_type": "type/Integer"}]]))
            .unwrap();
        assert_eq!(filter, FilterExpr::compare(CompareOp::Lt, FieldRef::Id(4), 7i64));
    }

    #[test]
    fn test_malformed_filters() {
        for bad in [
            json!(["and"]),
            json!(["or"]),
            json!(["not"]),
            json!(["not", ["=", 1, 1], ["=", 1, 2]]),
            json!(["="]),
            json!(["=", 1]),
            json!([]),
            json!("x"),
        ] {
            let err = parse_filter(&bad).unwrap_err();
            assert!(matches!(err, CompileError::MalformedFilterTree(_)), "{bad}");
        }
    }

    #[test]
    fn test_unsupported_operator() {
        assert_eq!(
            parse_filter(&json!(["time-interval", 4, -1, "day"])),
            Err(CompileError::UnsupportedOperator("time-interval".into()))
        );
    }

    #[test]
    fn test_named_aggregations() {
        let query = parse_query(&body(json!({
            "source-table": 1,
            "aggregation": [
                ["aggregation-options", ["sum", 2], {"display-name": "Total Sales"}],
                ["named", ["avg", 2], "mean"],
                ["sum", 3],
                ["sum", 4]
            ]
        })))
        .unwrap();
        let aliases: Vec<_> = query.aggregations.iter().map(|a| a.alias.as_str()).collect();
        assert_eq!(aliases, vec!["Total_Sales", "mean", "sum", "sum_2"]);
    }

    #[test]
    fn test_single_aggregation_clause() {
        let query = parse_query(&body(json!({"source-table": 1, "aggregation": ["count"]})))
            .unwrap();
        assert_eq!(query.aggregations, vec![AggregationSpec::count()]);
    }

    #[test]
    fn test_percentile_operands() {
        let query = parse_query(&body(json!({
            "source-table": 1,
            "aggregation": [["percentile", 2, 0.95], ["percentile", 2, 3]]
        })))
        .unwrap();
        assert_eq!(
            query.aggregations[0].percentile,
            Some(Operand::Value(Literal::Float(0.95)))
        );
        assert_eq!(
            query.aggregations[1].percentile,
            Some(Operand::Value(Literal::Int(3)))
        );
    }

    #[test]
    fn test_unknown_aggregation() {
        let err = parse_query(&body(json!({"source-table": 1, "aggregation": [["stddev", 2]]})))
            .unwrap_err();
        assert_eq!(err, CompileError::UnsupportedAggregation("stddev".into()));
    }

    #[test]
    fn test_page_object() {
        let query = parse_query(&body(json!({
            "source-table": 1,
            "page": {"page": 3, "items": 25}
        })))
        .unwrap();
        assert_eq!(query.limit, Some(25));
        assert_eq!(query.page, Some(3));
    }

    #[test]
    fn test_invalid_queries() {
        for bad in [
            json!({"type": "native", "native": {"query": "SELECT 1"}}),
            json!({"type": "query"}),
            body(json!({})),
            body(json!({"source-table": 1, "page": 0})),
            body(json!({"source-table": 1, "limit": -1})),
            body(json!({"source-table": 1, "order-by": [["desc", ["aggregation", 0]]]})),
        ] {
            let err = parse_query(&bad).unwrap_err();
            assert!(matches!(err, CompileError::InvalidQuery(_)), "{bad}");
        }
    }
}
