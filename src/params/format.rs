//! Value formatter.
//!
//! Every value that reaches generated SQL, from MBQL filters and template
//! parameters alike, is rendered here into literal tokens. The target engine
//! has no bind parameters, so everything is inlined.
//!
//! ```text
//! [v]          -> v
//! [a, b, c]    -> (a, b, c)
//! field filter -> "f" = v | "f" IN (a, b) | "f" LIKE '%v%' OR ...
//! ```

use crate::mbql::FieldNames;
use crate::metadata::MetadataError;
use crate::sql::{Literal, Token, TokenStream};

use super::{FieldFilter, FilterOperator, ParamValue};

/// Errors rendering a parameter value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormatError {
    #[error("Missing value for required parameter '{0}'")]
    MissingParameterValue(String),

    #[error("Missing value for filter on field '{field}'")]
    MissingFieldFilterValue { field: String },

    #[error(transparent)]
    UnresolvedField(#[from] MetadataError),
}

/// Render a list of values: one value as a scalar, several as a
/// parenthesized list. Returns `None` for an empty list.
pub fn format_literals(values: &[Literal]) -> Option<TokenStream> {
    match values {
        [] => None,
        [single] => Some(single.to_token().into()),
        many => {
            let items: Vec<TokenStream> = many.iter().map(|v| v.to_token().into()).collect();
            let mut ts = TokenStream::new();
            ts.lparen().append_joined(&items, Token::Comma).rparen();
            Some(ts)
        }
    }
}

/// Render a predicate comparing the column `field` against `values`.
///
/// Fails with `MissingFieldFilterValue` when there is nothing to compare
/// against (no values, or only nulls).
pub fn format_field_filter(
    field: &str,
    operator: FilterOperator,
    values: &[Literal],
    case_sensitive: bool,
) -> Result<TokenStream, FormatError> {
    if values.iter().all(Literal::is_null) {
        return Err(FormatError::MissingFieldFilterValue {
            field: field.to_string(),
        });
    }

    if operator.is_pattern() {
        return Ok(format_patterns(field, operator, values, case_sensitive));
    }

    let column = Token::Ident(field.to_string());
    let mut ts = TokenStream::new();
    ts.push(column).space();
    match (operator.is_negated(), values.len()) {
        (false, 1) => ts.push(Token::Eq),
        (true, 1) => ts.push(Token::Ne),
        (false, _) => ts.push(Token::In),
        (true, _) => ts.push(Token::Not).space().push(Token::In),
    };
    ts.space();
    if let Some(rendered) = format_literals(values) {
        ts.append(&rendered);
    }
    Ok(ts)
}

fn format_patterns(
    field: &str,
    operator: FilterOperator,
    values: &[Literal],
    case_sensitive: bool,
) -> TokenStream {
    let (prefix, suffix) = match operator {
        FilterOperator::Contains | FilterOperator::DoesNotContain => ("%", "%"),
        FilterOperator::StartsWith => ("", "%"),
        FilterOperator::EndsWith => ("%", ""),
        FilterOperator::Eq | FilterOperator::Ne => ("", ""),
    };

    let mut column = TokenStream::new();
    if case_sensitive {
        column.push(Token::Ident(field.to_string()));
    } else {
        column
            .push(Token::FunctionName("lower".into()))
            .lparen()
            .push(Token::Ident(field.to_string()))
            .rparen();
    }

    let predicates: Vec<TokenStream> = values
        .iter()
        .filter(|v| !v.is_null())
        .map(|value| {
            let mut text = value.to_plain_text();
            if !case_sensitive {
                text = text.to_lowercase();
            }

            let mut ts = column.clone();
            ts.space();
            if operator.is_negated() {
                ts.push(Token::Not).space();
            }
            ts.push(Token::Like)
                .space()
                .push(Token::LitString(format!("{prefix}{text}{suffix}")));
            ts
        })
        .collect();

    if predicates.len() == 1 {
        return predicates.into_iter().next().unwrap_or_default();
    }

    let joiner = if operator.is_negated() {
        Token::And
    } else {
        Token::Or
    };
    let mut ts = TokenStream::new();
    ts.lparen().append_joined(&predicates, joiner).rparen();
    ts
}

/// Render a template parameter named `name`.
///
/// Field filters look their column up in `fields`, which must already hold
/// the filter's field id.
pub fn format_param(
    name: &str,
    value: &ParamValue,
    fields: &FieldNames,
) -> Result<TokenStream, FormatError> {
    match value {
        ParamValue::Scalar(literal) => Ok(literal.to_token().into()),
        ParamValue::Array(values) => format_literals(values)
            .ok_or_else(|| FormatError::MissingParameterValue(name.to_string())),
        ParamValue::NoValue => Err(FormatError::MissingParameterValue(name.to_string())),
        ParamValue::FieldFilter(FieldFilter {
            field,
            operator,
            values,
            case_sensitive,
        }) => {
            let column = fields.name(field)?;
            format_field_filter(column, *operator, values, *case_sensitive)
        }
    }
}
