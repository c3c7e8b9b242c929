//! Aggregations and their SELECT expressions.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::compile::{CompileError, CompileResult};
use crate::sql::{Literal, SelectExpr, Token, TokenStream};

use super::{FieldNames, FieldRef};

/// The closed set of supported aggregation functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregationKind {
    Count,
    CountDistinctExact,
    Distinct,
    Sum,
    Avg,
    Min,
    Max,
    Percentile,
    ApproxMedian,
}

impl AggregationKind {
    pub const ALL: [AggregationKind; 9] = [
        AggregationKind::Count,
        AggregationKind::CountDistinctExact,
        AggregationKind::Distinct,
        AggregationKind::Sum,
        AggregationKind::Avg,
        AggregationKind::Min,
        AggregationKind::Max,
        AggregationKind::Percentile,
        AggregationKind::ApproxMedian,
    ];

    /// Look up an MBQL aggregation keyword.
    pub fn from_keyword(keyword: &str) -> CompileResult<Self> {
        match keyword {
            "count" => Ok(AggregationKind::Count),
            "count-distinct-exact" => Ok(AggregationKind::CountDistinctExact),
            "distinct" => Ok(AggregationKind::Distinct),
            "sum" => Ok(AggregationKind::Sum),
            "avg" => Ok(AggregationKind::Avg),
            "min" => Ok(AggregationKind::Min),
            "max" => Ok(AggregationKind::Max),
            "percentile" => Ok(AggregationKind::Percentile),
            "approx-median" | "median" => Ok(AggregationKind::ApproxMedian),
            other => Err(CompileError::UnsupportedAggregation(other.to_string())),
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            AggregationKind::Count => "count",
            AggregationKind::CountDistinctExact => "count-distinct-exact",
            AggregationKind::Distinct => "distinct",
            AggregationKind::Sum => "sum",
            AggregationKind::Avg => "avg",
            AggregationKind::Min => "min",
            AggregationKind::Max => "max",
            AggregationKind::Percentile => "percentile",
            AggregationKind::ApproxMedian => "approx-median",
        }
    }

    /// SQL function name emitted for this kind.
    pub fn function_name(&self) -> &'static str {
        match self {
            AggregationKind::Count => "COUNT",
            AggregationKind::CountDistinctExact => "DISTINCTCOUNT",
            AggregationKind::Distinct => "DISTINCT",
            AggregationKind::Sum => "SUM",
            AggregationKind::Avg => "AVG",
            AggregationKind::Min => "MIN",
            AggregationKind::Max => "MAX",
            AggregationKind::Percentile => "PERCENTILE",
            AggregationKind::ApproxMedian => "APPROXMEDIAN",
        }
    }
}

/// Second argument of a percentile aggregation.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Field(FieldRef),
    Value(Literal),
}

/// One aggregation in the SELECT list.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationSpec {
    pub kind: AggregationKind,
    /// Required for every kind except `count`.
    pub field: Option<FieldRef>,
    /// Required for `percentile`.
    pub percentile: Option<Operand>,
    pub alias: String,
}

impl AggregationSpec {
    /// Create an aggregation aliased by its keyword.
    pub fn new(kind: AggregationKind, field: Option<FieldRef>) -> Self {
        Self {
            kind,
            field,
            percentile: None,
            alias: sanitize_alias(kind.keyword(), kind),
        }
    }

    pub fn count() -> Self {
        Self::new(AggregationKind::Count, None)
    }

    pub fn of(kind: AggregationKind, field: FieldRef) -> Self {
        Self::new(kind, Some(field))
    }

    pub fn percentile(field: FieldRef, percentile: Operand) -> Self {
        Self {
            percentile: Some(percentile),
            ..Self::of(AggregationKind::Percentile, field)
        }
    }

    /// Use `name` as the alias, made identifier-safe.
    pub fn with_alias(mut self, name: &str) -> Self {
        self.alias = sanitize_alias(name, self.kind);
        self
    }

    /// Field references used by this aggregation.
    pub fn field_refs(&self) -> Vec<&FieldRef> {
        let mut refs: Vec<&FieldRef> = self.field.iter().collect();
        if let Some(Operand::Field(field)) = &self.percentile {
            refs.push(field);
        }
        refs
    }

    /// Translate to an aliased SELECT item.
    pub fn to_select_expr(&self, fields: &FieldNames) -> CompileResult<SelectExpr> {
        let mut args = TokenStream::new();
        match (self.kind, &self.field) {
            (AggregationKind::Count, _) => {
                args.push(Token::Star);
            }
            (_, None) => {
                return Err(CompileError::InvalidQuery(format!(
                    "'{}' aggregation requires a field",
                    self.kind.keyword()
                )))
            }
            (_, Some(field)) => {
                args.append(&fields.ident(field)?);
            }
        }

        if self.kind == AggregationKind::Percentile {
            let operand = self.percentile.as_ref().ok_or_else(|| {
                CompileError::InvalidQuery("'percentile' aggregation requires a percentile".into())
            })?;
            args.comma().space();
            match operand {
                Operand::Field(field) => args.append(&fields.ident(field)?),
                Operand::Value(value) => args.push(value.to_token()),
            };
        }

        let mut expr = TokenStream::new();
        expr.push(Token::FunctionName(self.kind.function_name().into()))
            .lparen()
            .append(&args)
            .rparen();
        Ok(SelectExpr::new(expr).with_alias(&self.alias))
    }
}

static NON_IDENT_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]+").expect("alias pattern is valid"));

/// Collapse anything outside `[A-Za-z0-9_]` to `_`; an empty result falls
/// back to the kind's keyword.
fn sanitize_alias(name: &str, kind: AggregationKind) -> String {
    let cleaned = NON_IDENT_CHARS.replace_all(name.trim(), "_");
    let cleaned = cleaned.trim_matches('_');
    if cleaned.is_empty() {
        NON_IDENT_CHARS
            .replace_all(kind.keyword(), "_")
            .into_owned()
    } else {
        cleaned.to_string()
    }
}

/// Make aliases unique in order: the second `sum` becomes `sum_2`.
pub fn dedupe_aliases(specs: &mut [AggregationSpec]) {
    let mut seen: HashMap<String, usize> = HashMap::new();
    for spec in specs.iter_mut() {
        let count = seen.entry(spec.alias.clone()).or_insert(0);
        *count += 1;
        if *count > 1 {
            let mut n = *count;
            let mut candidate = format!("{}_{}", spec.alias, n);
            while seen.contains_key(&candidate) {
                n += 1;
                candidate = format!("{}_{}", spec.alias, n);
            }
            seen.insert(candidate.clone(), 1);
            spec.alias = candidate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::Pql;

    fn render(spec: &AggregationSpec) -> String {
        spec.to_select_expr(&FieldNames::default())
            .unwrap()
            .to_tokens()
            .serialize(&Pql)
    }

    fn price() -> FieldRef {
        FieldRef::Name("price".into())
    }

    #[test]
    fn test_every_kind_renders_its_function() {
        for kind in AggregationKind::ALL {
            let spec = match kind {
                AggregationKind::Count => AggregationSpec::count(),
                AggregationKind::Percentile => {
                    AggregationSpec::percentile(price(), Operand::Value(0.9.into()))
                }
                _ => AggregationSpec::of(kind, price()),
            }
            .with_alias("total");

            let sql = render(&spec);
            assert!(
                sql.starts_with(&format!("{}(", kind.function_name())),
                "{sql}"
            );
            assert!(sql.ends_with(r#") AS "total""#), "{sql}");
        }
    }

    #[test]
    fn test_exact_renderings() {
        assert_eq!(render(&AggregationSpec::count()), r#"COUNT(*) AS "count""#);
        assert_eq!(
            render(&AggregationSpec::of(AggregationKind::CountDistinctExact, price())),
            r#"DISTINCTCOUNT("price") AS "count_distinct_exact""#
        );
        assert_eq!(
            render(&AggregationSpec::of(AggregationKind::ApproxMedian, price())),
            r#"APPROXMEDIAN("price") AS "approx_median""#
        );
        assert_eq!(
            render(&AggregationSpec::percentile(
                price(),
                Operand::Field(FieldRef::Name("p".into()))
            )),
            r#"PERCENTILE("price", "p") AS "percentile""#
        );
    }

    #[test]
    fn test_unknown_keyword() {
        assert_eq!(
            AggregationKind::from_keyword("stddev"),
            Err(CompileError::UnsupportedAggregation("stddev".into()))
        );
        assert_eq!(
            AggregationKind::from_keyword("median"),
            Ok(AggregationKind::ApproxMedian)
        );
    }

    #[test]
    fn test_missing_field() {
        let spec = AggregationSpec::new(AggregationKind::Sum, None);
        let err = spec.to_select_expr(&FieldNames::default()).unwrap_err();
        assert!(matches!(err, CompileError::InvalidQuery(_)));
    }

    #[test]
    fn test_alias_sanitized() {
        let spec = AggregationSpec::count().with_alias("Sum of \"Price\"");
        assert_eq!(spec.alias, "Sum_of_Price");

        let spec = AggregationSpec::count().with_alias("  !! ");
        assert_eq!(spec.alias, "count");
    }

    #[test]
    fn test_dedupe_aliases() {
        let mut specs = vec![
            AggregationSpec::of(AggregationKind::Sum, price()),
            AggregationSpec::of(AggregationKind::Sum, price()),
            AggregationSpec::count().with_alias("sum_2"),
            AggregationSpec::of(AggregationKind::Sum, price()),
        ];
        dedupe_aliases(&mut specs);
        let aliases: Vec<_> = specs.iter().map(|s| s.alias.as_str()).collect();
        assert_eq!(aliases, vec!["sum", "sum_2", "sum_2_2", "sum_3"]);
    }
}
