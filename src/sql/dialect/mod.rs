//! SQL dialect definitions and formatting rules.
//!
//! The compilers target a single wire dialect, but every rendering rule
//! lives behind the `SqlDialect` trait so token serialization never
//! hard-codes quoting or literal formats:
//!
//! - Identifier quoting: `"` with embedded quotes doubled
//! - String literals: `'` with embedded quotes doubled
//! - Boolean literals: `TRUE` / `FALSE`
//! - Temporal literals: quoted canonical text
//! - Pagination: `LIMIT <offset>, <limit>`
//!
//! # Usage
//!
//! ```ignore
//! use mbql_pql::sql::dialect::{Pql, SqlDialect};
//!
//! let quoted = Pql.quote_identifier("user");  // "user"
//! ```

pub mod helpers;
mod pql;

pub use pql::Pql;

use uuid::Uuid;

use super::literal::Temporal;
use super::token::TokenStream;

/// SQL dialect trait - defines how SQL constructs are rendered.
///
/// The default implementations follow ANSI SQL where possible.
pub trait SqlDialect: std::fmt::Debug + Send + Sync {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    // =========================================================================
    // Identifier and Literal Quoting
    // =========================================================================

    /// Quote an identifier (data source, column, alias).
    fn quote_identifier(&self, ident: &str) -> String;

    /// Quote a string literal with single quotes, doubling embedded quotes.
    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_single(s)
    }

    /// Format a boolean literal.
    fn format_bool(&self, b: bool) -> &'static str;

    /// Format a NULL literal.
    fn format_null(&self) -> &'static str {
        "NULL"
    }

    /// Format a float literal. Non-finite values have no SQL spelling and
    /// render as NULL.
    fn format_float(&self, f: f64) -> String {
        helpers::format_float(f).unwrap_or_else(|| self.format_null().into())
    }

    /// Format a UUID literal as its quoted canonical text.
    fn format_uuid(&self, uuid: &Uuid) -> String {
        self.quote_string(&uuid.hyphenated().to_string())
    }

    /// Format a date/time literal.
    fn format_temporal(&self, value: &Temporal) -> String {
        self.quote_string(&helpers::format_temporal_iso(value))
    }

    // =========================================================================
    // Pagination
    // =========================================================================

    /// Emit LIMIT/OFFSET or equivalent pagination clause.
    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream;
}
