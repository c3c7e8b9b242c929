//! SQL generation module.
//!
//! - [`literal`] - typed literal values and their encoding
//! - [`token`] - token types for SQL generation
//! - [`dialect`] - rendering rules for the target dialect
//! - [`query`] - SELECT clause assembly

pub mod dialect;
pub mod literal;
pub mod query;
pub mod token;

#[cfg(test)]
pub mod test_utils;

pub use dialect::{Pql, SqlDialect};
pub use literal::{Literal, Temporal};
pub use query::{CompiledQuery, LimitOffset, OrderByExpr, Query, SelectExpr, SortDir};
pub use token::{Token, TokenStream};
