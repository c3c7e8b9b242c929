//! User-supplied parameter values.
//!
//! Parameters arrive as JSON from the caller and are turned into closed
//! [`ParamValue`] variants up front, so the formatter and the template engine
//! match on types instead of sniffing value shapes.

pub mod format;

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::mbql::FieldRef;
use crate::sql::Literal;

pub use format::{format_field_filter, format_literals, format_param, FormatError};

/// Errors building a parameter map.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParamError {
    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),
}

/// Operator of a field filter parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    #[default]
    Eq,
    Ne,
    Contains,
    DoesNotContain,
    StartsWith,
    EndsWith,
}

impl FilterOperator {
    /// Parse an operator name. A `string/` or `number/` prefix is accepted.
    pub fn parse(name: &str) -> Result<Self, ParamError> {
        let bare = name
            .strip_prefix("string/")
            .or_else(|| name.strip_prefix("number/"))
            .unwrap_or(name);
        match bare {
            "=" | "category" | "id" => Ok(FilterOperator::Eq),
            "!=" => Ok(FilterOperator::Ne),
            "contains" => Ok(FilterOperator::Contains),
            "does-not-contain" => Ok(FilterOperator::DoesNotContain),
            "starts-with" => Ok(FilterOperator::StartsWith),
            "ends-with" => Ok(FilterOperator::EndsWith),
            _ => Err(ParamError::UnsupportedOperator(name.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "=",
            FilterOperator::Ne => "!=",
            FilterOperator::Contains => "contains",
            FilterOperator::DoesNotContain => "does-not-contain",
            FilterOperator::StartsWith => "starts-with",
            FilterOperator::EndsWith => "ends-with",
        }
    }

    /// True for the string-matching operators rendered with LIKE.
    pub fn is_pattern(&self) -> bool {
        !matches!(self, FilterOperator::Eq | FilterOperator::Ne)
    }

    /// True for operators whose predicates are negated.
    pub fn is_negated(&self) -> bool {
        matches!(self, FilterOperator::Ne | FilterOperator::DoesNotContain)
    }
}

impl std::fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parameter value bound to a column with an operator.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: FieldRef,
    pub operator: FilterOperator,
    /// A scalar is stored as a one-element list.
    pub values: Vec<Literal>,
    pub case_sensitive: bool,
}

impl FieldFilter {
    pub fn new(field: FieldRef, operator: FilterOperator, values: Vec<Literal>) -> Self {
        Self {
            field,
            operator,
            values,
            case_sensitive: true,
        }
    }

    pub fn case_insensitive(mut self) -> Self {
        self.case_sensitive = false;
        self
    }
}

/// Value supplied for one template parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Scalar(Literal),
    Array(Vec<Literal>),
    /// The parameter is known but the user left it empty.
    NoValue,
    FieldFilter(FieldFilter),
}

impl From<Literal> for ParamValue {
    fn from(value: Literal) -> Self {
        ParamValue::Scalar(value)
    }
}

impl From<FieldFilter> for ParamValue {
    fn from(filter: FieldFilter) -> Self {
        ParamValue::FieldFilter(filter)
    }
}

/// Parameter values keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamMap {
    values: HashMap<String, ParamValue>,
}

impl ParamMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Build a map from a JSON object.
    ///
    /// ```text
    /// null                         -> NoValue
    /// 42, "x", true                -> Scalar
    /// [1, 2]                       -> Array
    /// {"field": 12, "operator": "contains", "value": "a", "case-sensitive": false}
    ///                              -> FieldFilter
    /// ```
    pub fn from_json(value: &Value) -> Result<Self, ParamError> {
        let Value::Object(entries) = value else {
            return Err(ParamError::InvalidParameter {
                name: String::new(),
                reason: "parameters must be a JSON object".into(),
            });
        };

        let mut map = ParamMap::new();
        for (name, raw) in entries {
            map.values.insert(name.clone(), param_from_json(name, raw)?);
        }
        Ok(map)
    }
}

impl From<HashMap<String, ParamValue>> for ParamMap {
    fn from(values: HashMap<String, ParamValue>) -> Self {
        Self { values }
    }
}

fn param_from_json(name: &str, raw: &Value) -> Result<ParamValue, ParamError> {
    match raw {
        Value::Null => Ok(ParamValue::NoValue),
        Value::Array(items) => Ok(ParamValue::Array(literals_from_json(name, items)?)),
        Value::Object(obj) => field_filter_from_json(name, obj).map(ParamValue::FieldFilter),
        scalar => Literal::from_json(scalar)
            .map(ParamValue::Scalar)
            .ok_or_else(|| invalid(name, "unsupported value")),
    }
}

fn field_filter_from_json(name: &str, obj: &Map<String, Value>) -> Result<FieldFilter, ParamError> {
    let field = match obj.get("field") {
        Some(Value::Number(n)) => n
            .as_i64()
            .map(FieldRef::Id)
            .ok_or_else(|| invalid(name, "field id must be an integer"))?,
        Some(Value::String(s)) => FieldRef::Name(s.clone()),
        Some(_) => return Err(invalid(name, "field must be an id or a column name")),
        None => return Err(invalid(name, "objects must name a field")),
    };

    let operator = match obj.get("operator") {
        Some(Value::String(op)) => FilterOperator::parse(op)?,
        Some(_) => return Err(invalid(name, "operator must be a string")),
        None => FilterOperator::default(),
    };

    let values = match obj.get("value") {
        None => Vec::new(),
        Some(Value::Array(items)) => literals_from_json(name, items)?,
        Some(scalar) => vec![
            Literal::from_json(scalar).ok_or_else(|| invalid(name, "unsupported value"))?,
        ],
    };

    let case_sensitive = match obj.get("case-sensitive") {
        None => true,
        Some(Value::Bool(b)) => *b,
        Some(_) => return Err(invalid(name, "case-sensitive must be a boolean")),
    };

    Ok(FieldFilter {
        field,
        operator,
        values,
        case_sensitive,
    })
}

fn literals_from_json(name: &str, items: &[Value]) -> Result<Vec<Literal>, ParamError> {
    items
        .iter()
        .map(|item| Literal::from_json(item).ok_or_else(|| invalid(name, "nested values")))
        .collect()
}

fn invalid(name: &str, reason: &str) -> ParamError {
    ParamError::InvalidParameter {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}
