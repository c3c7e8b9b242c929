//! Shared helper functions for SQL dialect implementations.
//!
//! Reusable building blocks a dialect composes to implement `SqlDialect`.

use super::super::literal::Temporal;
use super::super::token::{Token, TokenStream};

// =============================================================================
// Quoting
// =============================================================================

/// Quote identifier with double quotes (ANSI style).
pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote string with single quotes (standard SQL).
pub fn quote_string_single(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

// =============================================================================
// Literal Formatting
// =============================================================================

/// Format boolean as uppercase keyword.
pub fn format_bool_keyword(b: bool) -> &'static str {
    if b {
        "TRUE"
    } else {
        "FALSE"
    }
}

/// Shortest round-trip decimal text for a float, `None` for NaN/infinity.
pub fn format_float(f: f64) -> Option<String> {
    if !f.is_finite() {
        return None;
    }
    let mut buffer = ryu::Buffer::new();
    Some(buffer.format_finite(f).to_string())
}

/// Canonical ISO-8601 text for a temporal value, millisecond precision.
pub fn format_temporal_iso(value: &Temporal) -> String {
    match value {
        Temporal::Date(d) => d.format("%Y-%m-%d").to_string(),
        Temporal::Time(t) => t.format("%H:%M:%S%.3f").to_string(),
        Temporal::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
        Temporal::Instant(i) => i.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// Emit `LIMIT <offset>, <limit>`, or `LIMIT <limit>` when there is no
/// offset. An offset without a limit has no spelling and is dropped.
pub fn emit_limit_comma(limit: Option<u64>, offset: Option<u64>) -> TokenStream {
    let mut ts = TokenStream::new();

    let Some(lim) = limit else {
        return ts;
    };

    ts.push(Token::Limit).space();
    match offset {
        Some(off) if off > 0 => {
            ts.push(Token::LitInt(to_i64(off)))
                .comma()
                .space()
                .push(Token::LitInt(to_i64(lim)));
        }
        _ => {
            ts.push(Token::LitInt(to_i64(lim)));
        }
    }

    ts
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::dialect::Pql;
    use chrono::{NaiveDate, NaiveTime};

    #[test]
    fn test_emit_limit_comma() {
        assert_eq!(emit_limit_comma(Some(10), Some(10)).serialize(&Pql), "LIMIT 10, 10");
        assert_eq!(emit_limit_comma(Some(10), Some(0)).serialize(&Pql), "LIMIT 10");
        assert_eq!(emit_limit_comma(Some(5), None).serialize(&Pql), "LIMIT 5");
        assert!(emit_limit_comma(None, Some(20)).is_empty());
        assert!(emit_limit_comma(None, None).is_empty());
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(1.5).as_deref(), Some("1.5"));
        assert_eq!(format_float(f64::NEG_INFINITY), None);
    }

    #[test]
    fn test_format_temporal_iso() {
        let time = NaiveTime::from_hms_milli_opt(7, 30, 1, 250).unwrap();
        assert_eq!(format_temporal_iso(&Temporal::Time(time)), "07:30:01.250");

        let dt = NaiveDate::from_ymd_opt(2023, 12, 31)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap();
        assert_eq!(
            format_temporal_iso(&Temporal::DateTime(dt)),
            "2023-12-31 23:59:59.000"
        );
    }
}
