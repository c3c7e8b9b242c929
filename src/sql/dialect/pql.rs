//! PQL dialect for column-store engines.
//!
//! - ANSI identifier quoting (`"`)
//! - Uppercase boolean keywords
//! - `LIMIT <offset>, <limit>` pagination
//! - No bind parameters: every value is an inlined literal

use super::helpers;
use super::SqlDialect;
use crate::sql::token::TokenStream;

/// PQL SQL dialect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pql;

impl SqlDialect for Pql {
    fn name(&self) -> &'static str {
        "pql"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_keyword(b)
    }

    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        helpers::emit_limit_comma(limit, offset)
    }
}

impl std::fmt::Display for Pql {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
