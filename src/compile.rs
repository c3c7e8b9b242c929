//! End-to-end compilation from an MBQL query map to PQL.
//!
//! ```text
//! JSON query map → parse → MbqlQuery → resolve names → translate → assemble
//! ```
//!
//! # Example
//!
//! ```ignore
//! use mbql_pql::compile::{compile, CompileOptions};
//! use mbql_pql::metadata::StaticMetadata;
//! use serde_json::json;
//!
//! let metadata = StaticMetadata::new()
//!     .with_table(1, "orders")
//!     .with_field(10, "id")
//!     .with_field(11, "price");
//!
//! let query = json!({
//!     "database": 1,
//!     "type": "query",
//!     "query": {
//!         "source-table": 1,
//!         "filter": ["and", ["=", 10, 10], [">", 11, 0]],
//!         "limit": 10,
//!         "page": 2
//!     }
//! });
//!
//! let native = compile(&query, &metadata, CompileOptions::default())?;
//! assert_eq!(
//!     native.query.sql,
//!     r#"SELECT * FROM "orders" WHERE ("id" = 10 AND "price" > 0) LIMIT 10, 10"#
//! );
//! ```

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::mbql::{self, FieldNames, FieldRef, MbqlQuery, OrderTarget};
use crate::metadata::{MetadataError, MetadataProvider};
use crate::options::{QueryOptions, WithOptions};
use crate::params::FormatError;
use crate::sql::{CompiledQuery, LimitOffset, OrderByExpr, Pql, Query, SortDir, Token, TokenStream};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during compilation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("Unresolved field: {0}")]
    UnresolvedField(#[from] MetadataError),

    #[error("Unsupported aggregation: {0}")]
    UnsupportedAggregation(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Malformed filter: {0}")]
    MalformedFilterTree(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error(transparent)]
    Format(FormatError),
}

impl From<FormatError> for CompileError {
    fn from(err: FormatError) -> Self {
        match err {
            FormatError::UnresolvedField(inner) => CompileError::UnresolvedField(inner),
            other => CompileError::Format(other),
        }
    }
}

pub type CompileResult<T> = Result<T, CompileError>;

// ============================================================================
// Options
// ============================================================================

/// Options for compilation.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Timeout attached to the produced query, if any.
    pub timeout: Option<Duration>,
}

impl CompileOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// A compiled MBQL query, ready for the execution layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NativeQuery {
    #[serde(rename = "mbql?")]
    pub mbql: bool,

    pub query: CompiledQuery,

    #[serde(skip_serializing_if = "QueryOptions::is_empty")]
    pub options: QueryOptions,
}

impl NativeQuery {
    pub fn new(query: CompiledQuery) -> Self {
        Self {
            mbql: true,
            query,
            options: QueryOptions::new(),
        }
    }
}

impl WithOptions for NativeQuery {
    fn options(&self) -> &QueryOptions {
        &self.options
    }

    fn options_mut(&mut self) -> &mut QueryOptions {
        &mut self.options
    }
}

// ============================================================================
// Compiler
// ============================================================================

/// MBQL compiler over a metadata provider.
///
/// Holds no per-query state, so one compiler can serve concurrent calls.
#[derive(Debug, Clone)]
pub struct MbqlCompiler<P> {
    provider: P,
    options: CompileOptions,
    dialect: Pql,
}

impl<P: MetadataProvider> MbqlCompiler<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            options: CompileOptions::default(),
            dialect: Pql,
        }
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    /// Compile a JSON query map.
    pub fn compile(&self, query: &Value) -> CompileResult<NativeQuery> {
        let parsed = mbql::parse_query(query)?;
        self.compile_query(&parsed)
    }

    /// Compile an already parsed query.
    ///
    /// Every table and field reference is resolved before any SQL is built,
    /// so an unknown id fails the whole compile.
    pub fn compile_query(&self, query: &MbqlQuery) -> CompileResult<NativeQuery> {
        let table = self.provider.resolve_table(query.source_table)?;
        let names = FieldNames::resolve(&self.provider, query.field_refs())?;

        let idents = |refs: &[FieldRef]| -> CompileResult<Vec<TokenStream>> {
            refs.iter()
                .map(|field| names.ident(field).map_err(CompileError::from))
                .collect()
        };

        let columns = if query.fields.is_empty() {
            idents(&query.breakout)?
        } else {
            idents(&query.fields)?
        };
        let group_by = idents(&query.breakout)?;

        let aggregations = query
            .aggregations
            .iter()
            .map(|aggregation| aggregation.to_select_expr(&names))
            .collect::<CompileResult<Vec<_>>>()?;

        let order_by = query
            .order_by
            .iter()
            .map(|order| -> CompileResult<OrderByExpr> {
                let expr: TokenStream = match &order.target {
                    OrderTarget::Field(field) => names.ident(field)?,
                    OrderTarget::Aggregation(index) => {
                        let aggregation = query.aggregations.get(*index).ok_or_else(|| {
                            CompileError::InvalidQuery(format!(
                                "order-by references missing aggregation {index}"
                            ))
                        })?;
                        Token::Ident(aggregation.alias.clone()).into()
                    }
                };
                Ok(match order.dir {
                    SortDir::Asc => OrderByExpr::asc(expr),
                    SortDir::Desc => OrderByExpr::desc(expr),
                })
            })
            .collect::<CompileResult<Vec<_>>>()?;

        let mut sql = Query::new(&table.name)
            .columns(columns)
            .aggregations(aggregations)
            .group_by(group_by)
            .order_by(order_by)
            .limit_offset(LimitOffset::from_page(query.limit, query.page));

        if let Some(filter) = &query.filter {
            sql = sql.filter(filter.to_tokens(&names)?);
        }

        let compiled = sql.render(&self.dialect);
        debug!(
            source_table = query.source_table,
            data_source = %compiled.data_source,
            fields_resolved = names.len(),
            sql_len = compiled.sql.len(),
            "compiled MBQL query"
        );

        let mut native = NativeQuery::new(compiled);
        if let Some(timeout) = self.options.timeout {
            native = native.with_timeout(timeout);
        }
        Ok(native)
    }
}

/// Compile a JSON query map against `provider`.
pub fn compile<P: MetadataProvider + ?Sized>(
    query: &Value,
    provider: &P,
    options: CompileOptions,
) -> CompileResult<NativeQuery> {
    MbqlCompiler::new(provider).with_options(options).compile(query)
}
