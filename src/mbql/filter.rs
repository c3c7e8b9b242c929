//! Filter expressions and their translation to WHERE conditions.

use crate::compile::{CompileError, CompileResult};
use crate::params::{format_field_filter, FilterOperator};
use crate::sql::{Literal, Token, TokenStream};

use super::{FieldNames, FieldRef};

/// Binary comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
}

impl CompareOp {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "=" => Some(CompareOp::Eq),
            "!=" => Some(CompareOp::Ne),
            ">" => Some(CompareOp::Gt),
            "<" => Some(CompareOp::Lt),
            ">=" => Some(CompareOp::Gte),
            "<=" => Some(CompareOp::Lte),
            _ => None,
        }
    }

    pub fn to_token(self) -> Token {
        match self {
            CompareOp::Eq => Token::Eq,
            CompareOp::Ne => Token::Ne,
            CompareOp::Gt => Token::Gt,
            CompareOp::Lt => Token::Lt,
            CompareOp::Gte => Token::Gte,
            CompareOp::Lte => Token::Lte,
        }
    }
}

/// String matching operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOp {
    Contains,
    DoesNotContain,
    StartsWith,
    EndsWith,
}

impl MatchOp {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "contains" => Some(MatchOp::Contains),
            "does-not-contain" => Some(MatchOp::DoesNotContain),
            "starts-with" => Some(MatchOp::StartsWith),
            "ends-with" => Some(MatchOp::EndsWith),
            _ => None,
        }
    }

    fn operator(self) -> FilterOperator {
        match self {
            MatchOp::Contains => FilterOperator::Contains,
            MatchOp::DoesNotContain => FilterOperator::DoesNotContain,
            MatchOp::StartsWith => FilterOperator::StartsWith,
            MatchOp::EndsWith => FilterOperator::EndsWith,
        }
    }
}

/// A boolean filter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    Compare {
        op: CompareOp,
        field: FieldRef,
        value: Literal,
    },
    Between {
        field: FieldRef,
        low: Literal,
        high: Literal,
    },
    /// Equality against several values.
    In {
        field: FieldRef,
        values: Vec<Literal>,
        negated: bool,
    },
    Match {
        op: MatchOp,
        field: FieldRef,
        value: Literal,
        case_sensitive: bool,
    },
    And(Vec<FilterExpr>),
    Or(Vec<FilterExpr>),
    Not(Box<FilterExpr>),
}

impl FilterExpr {
    pub fn compare(op: CompareOp, field: FieldRef, value: impl Into<Literal>) -> Self {
        FilterExpr::Compare {
            op,
            field,
            value: value.into(),
        }
    }

    pub fn between(field: FieldRef, low: impl Into<Literal>, high: impl Into<Literal>) -> Self {
        FilterExpr::Between {
            field,
            low: low.into(),
            high: high.into(),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(child: FilterExpr) -> Self {
        FilterExpr::Not(Box::new(child))
    }

    /// Every field referenced in the tree, depth-first.
    pub fn field_refs(&self) -> Vec<&FieldRef> {
        let mut refs = Vec::new();
        self.collect_field_refs(&mut refs);
        refs
    }

    fn collect_field_refs<'a>(&'a self, refs: &mut Vec<&'a FieldRef>) {
        match self {
            FilterExpr::Compare { field, .. }
            | FilterExpr::Between { field, .. }
            | FilterExpr::In { field, .. }
            | FilterExpr::Match { field, .. } => refs.push(field),
            FilterExpr::And(children) | FilterExpr::Or(children) => {
                for child in children {
                    child.collect_field_refs(refs);
                }
            }
            FilterExpr::Not(child) => child.collect_field_refs(refs),
        }
    }

    /// Translate to a WHERE condition, left to right, depth first.
    pub fn to_tokens(&self, fields: &FieldNames) -> CompileResult<TokenStream> {
        match self {
            FilterExpr::Compare { op, field, value } => {
                let mut ts = fields.ident(field)?;
                ts.space()
                    .push(op.to_token())
                    .space()
                    .push(value.to_token());
                Ok(ts)
            }
            FilterExpr::Between { field, low, high } => {
                let mut ts = fields.ident(field)?;
                ts.space()
                    .push(Token::Between)
                    .space()
                    .push(low.to_token())
                    .space()
                    .push(Token::And)
                    .space()
                    .push(high.to_token());
                Ok(ts)
            }
            FilterExpr::In {
                field,
                values,
                negated,
            } => {
                let operator = if *negated {
                    FilterOperator::Ne
                } else {
                    FilterOperator::Eq
                };
                Ok(format_field_filter(fields.name(field)?, operator, values, true)?)
            }
            FilterExpr::Match {
                op,
                field,
                value,
                case_sensitive,
            } => Ok(format_field_filter(
                fields.name(field)?,
                op.operator(),
                std::slice::from_ref(value),
                *case_sensitive,
            )?),
            FilterExpr::And(children) => Self::join(children, Token::And, "and", fields),
            FilterExpr::Or(children) => Self::join(children, Token::Or, "or", fields),
            FilterExpr::Not(child) => {
                let mut ts = TokenStream::new();
                ts.push(Token::Not).space().append(&child.to_tokens(fields)?);
                Ok(ts)
            }
        }
    }

    fn join(
        children: &[FilterExpr],
        joiner: Token,
        keyword: &str,
        fields: &FieldNames,
    ) -> CompileResult<TokenStream> {
        if children.is_empty() {
            return Err(CompileError::MalformedFilterTree(format!(
                "'{keyword}' requires at least one clause"
            )));
        }

        let compiled = children
            .iter()
            .map(|child| child.to_tokens(fields))
            .collect::<CompileResult<Vec<_>>>()?;

        let mut ts = TokenStream::new();
        ts.lparen().append_joined(&compiled, joiner).rparen();
        Ok(ts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MetadataError;
    use crate::sql::Pql;

    fn id() -> FieldRef {
        FieldRef::Name("id".into())
    }

    fn price() -> FieldRef {
        FieldRef::Name("price".into())
    }

    fn compile(expr: &FilterExpr) -> String {
        expr.to_tokens(&FieldNames::default())
            .unwrap()
            .serialize(&Pql)
    }

    #[test]
    fn test_and_of_compares() {
        let expr = FilterExpr::And(vec![
            FilterExpr::compare(CompareOp::Eq, id(), 10),
            FilterExpr::compare(CompareOp::Gt, price(), 0),
        ]);
        assert_eq!(compile(&expr), r#"("id" = 10 AND "price" > 0)"#);
    }

    #[test]
    fn test_not_between() {
        let expr = FilterExpr::not(FilterExpr::between(id(), 1, 10));
        assert_eq!(compile(&expr), r#"NOT "id" BETWEEN 1 AND 10"#);
    }

    #[test]
    fn test_nested_or_inside_and() {
        let expr = FilterExpr::And(vec![
            FilterExpr::Or(vec![
                FilterExpr::compare(CompareOp::Lt, price(), 5),
                FilterExpr::compare(CompareOp::Gte, price(), 100),
            ]),
            FilterExpr::not(FilterExpr::Or(vec![FilterExpr::compare(
                CompareOp::Ne,
                id(),
                "x",
            )])),
        ]);
        assert_eq!(
            compile(&expr),
            r#"(("price" < 5 OR "price" >= 100) AND NOT ("id" != 'x'))"#
        );
    }

    #[test]
    fn test_in_and_match() {
        let expr = FilterExpr::In {
            field: id(),
            values: vec![1.into(), 2.into()],
            negated: true,
        };
        assert_eq!(compile(&expr), r#""id" NOT IN (1, 2)"#);

        let expr = FilterExpr::Match {
            op: MatchOp::Contains,
            field: FieldRef::Name("title".into()),
            value: "Rust".into(),
            case_sensitive: false,
        };
        assert_eq!(compile(&expr), r#"LOWER("title") LIKE '%rust%'"#);
    }

    #[test]
    fn test_empty_and_is_malformed() {
        let err = FilterExpr::And(vec![])
            .to_tokens(&FieldNames::default())
            .unwrap_err();
        assert!(matches!(err, CompileError::MalformedFilterTree(_)));
    }

    #[test]
    fn test_unknown_field_fails() {
        let err = FilterExpr::compare(CompareOp::Eq, FieldRef::Id(99), 1)
            .to_tokens(&FieldNames::default())
            .unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnresolvedField(MetadataError::FieldNotFound(99))
        ));
    }

    #[test]
    fn test_field_refs_depth_first() {
        let expr = FilterExpr::And(vec![
            FilterExpr::compare(CompareOp::Eq, FieldRef::Id(1), 1),
            FilterExpr::not(FilterExpr::between(FieldRef::Id(2), 1, 2)),
        ]);
        assert_eq!(expr.field_refs(), vec![&FieldRef::Id(1), &FieldRef::Id(2)]);
    }
}
