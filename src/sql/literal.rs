//! Typed literal values and their SQL encoding.
//!
//! A [`Literal`] is a pure value; [`Literal::encode`] renders it through a
//! dialect into an escaped, inlinable SQL fragment. Encoding never fails.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use super::dialect::SqlDialect;
use super::token::Token;

/// Date and time values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Temporal {
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    /// A point on the timeline, rendered in UTC.
    Instant(DateTime<Utc>),
}

/// Literal values.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Uuid(Uuid),
    Temporal(Temporal),
}

impl Literal {
    /// Convert to the literal token carrying this value.
    pub fn to_token(&self) -> Token {
        match self {
            Literal::Null => Token::LitNull,
            Literal::Str(s) => Token::LitString(s.clone()),
            Literal::Int(n) => Token::LitInt(*n),
            Literal::Float(f) => Token::LitFloat(*f),
            Literal::Bool(b) => Token::LitBool(*b),
            Literal::Uuid(u) => Token::LitUuid(*u),
            Literal::Temporal(t) => Token::LitTemporal(*t),
        }
    }

    /// Render as an SQL literal for `dialect`.
    pub fn encode<D: SqlDialect + ?Sized>(&self, dialect: &D) -> String {
        self.to_token().serialize(dialect)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Literal::Null)
    }

    /// Build a literal from a JSON scalar.
    ///
    /// Strings stay strings: no date or UUID sniffing. Returns `None` for
    /// arrays and objects.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Literal::Null),
            Value::Bool(b) => Some(Literal::Bool(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(Literal::Int)
                .or_else(|| n.as_f64().map(Literal::Float)),
            Value::String(s) => Some(Literal::Str(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Plain text of the value, used where a literal is embedded in a
    /// larger string (LIKE patterns).
    pub fn to_plain_text(&self) -> String {
        match self {
            Literal::Null => String::new(),
            Literal::Str(s) => s.clone(),
            Literal::Int(n) => n.to_string(),
            Literal::Float(f) => f.to_string(),
            Literal::Bool(b) => b.to_string(),
            Literal::Uuid(u) => u.hyphenated().to_string(),
            Literal::Temporal(t) => super::dialect::helpers::format_temporal_iso(t),
        }
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Literal::Str(s.to_string())
    }
}

impl From<String> for Literal {
    fn from(s: String) -> Self {
        Literal::Str(s)
    }
}

impl From<i64> for Literal {
    fn from(n: i64) -> Self {
        Literal::Int(n)
    }
}

impl From<i32> for Literal {
    fn from(n: i32) -> Self {
        Literal::Int(n.into())
    }
}

impl From<f64> for Literal {
    fn from(f: f64) -> Self {
        Literal::Float(f)
    }
}

impl From<bool> for Literal {
    fn from(b: bool) -> Self {
        Literal::Bool(b)
    }
}

impl From<Uuid> for Literal {
    fn from(u: Uuid) -> Self {
        Literal::Uuid(u)
    }
}

impl From<NaiveDate> for Literal {
    fn from(d: NaiveDate) -> Self {
        Literal::Temporal(Temporal::Date(d))
    }
}

impl From<NaiveTime> for Literal {
    fn from(t: NaiveTime) -> Self {
        Literal::Temporal(Temporal::Time(t))
    }
}

impl From<NaiveDateTime> for Literal {
    fn from(dt: NaiveDateTime) -> Self {
        Literal::Temporal(Temporal::DateTime(dt))
    }
}

impl<Tz: chrono::TimeZone> From<DateTime<Tz>> for Literal {
    fn from(dt: DateTime<Tz>) -> Self {
        Literal::Temporal(Temporal::Instant(dt.with_timezone(&Utc)))
    }
}
