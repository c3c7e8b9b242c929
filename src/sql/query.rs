//! Query builder - assemble a PQL SELECT statement from compiled pieces.
//!
//! Clause order is fixed:
//!
//! ```text
//! SELECT <aggregations | columns | *> FROM <source>
//!   [WHERE ...] [GROUP BY ...] [ORDER BY ...] [LIMIT [<offset>,] <limit>]
//! ```
//!
//! Any clause whose source list is empty is omitted entirely. The rendered
//! statement is returned together with the serialized pieces that produced
//! it, so callers can introspect without re-parsing SQL.

use serde::Serialize;

use super::dialect::SqlDialect;
use super::token::{Token, TokenStream};

// =============================================================================
// Select Expression (expression with optional alias)
// =============================================================================

/// A SELECT list item: expression with optional alias.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct SelectExpr {
    pub expr: TokenStream,
    pub alias: Option<String>,
}

impl SelectExpr {
    pub fn new(expr: TokenStream) -> Self {
        Self { expr, alias: None }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = self.expr.clone();
        if let Some(alias) = &self.alias {
            ts.space()
                .push(Token::As)
                .space()
                .push(Token::Ident(alias.clone()));
        }
        ts
    }
}

// =============================================================================
// ORDER BY
// =============================================================================

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

/// An ORDER BY expression.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct OrderByExpr {
    pub expr: TokenStream,
    pub dir: SortDir,
}

impl OrderByExpr {
    pub fn asc(expr: TokenStream) -> Self {
        Self {
            expr,
            dir: SortDir::Asc,
        }
    }

    pub fn desc(expr: TokenStream) -> Self {
        Self {
            expr,
            dir: SortDir::Desc,
        }
    }

    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = self.expr.clone();
        ts.space().push(match self.dir {
            SortDir::Asc => Token::Asc,
            SortDir::Desc => Token::Desc,
        });
        ts
    }
}

// =============================================================================
// LIMIT / OFFSET
// =============================================================================

/// LIMIT and OFFSET clause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LimitOffset {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl LimitOffset {
    /// Derive pagination from a limit and a 1-based page number.
    ///
    /// `offset = limit * (page - 1)` when both are present. A page without a
    /// limit cannot be turned into an offset and is ignored.
    pub fn from_page(limit: Option<u64>, page: Option<u64>) -> Self {
        let offset = match (limit, page) {
            (Some(limit), Some(page)) => Some(limit.saturating_mul(page.saturating_sub(1))),
            _ => None,
        };
        Self { limit, offset }
    }

    /// Convert to token stream using dialect-specific pagination.
    pub fn to_tokens<D: SqlDialect + ?Sized>(&self, dialect: &D) -> TokenStream {
        dialect.emit_limit_offset(self.limit, self.offset)
    }
}

// =============================================================================
// Compiled output
// =============================================================================

/// A rendered statement plus the serialized pieces that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledQuery {
    pub sql: String,
    pub columns: Vec<String>,
    #[serde(rename = "group-by")]
    pub group_by: Vec<String>,
    pub aggregations: Vec<String>,
    #[serde(rename = "where")]
    pub where_clause: Option<String>,
    #[serde(rename = "order-by")]
    pub order_by: Vec<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    #[serde(rename = "dataSource")]
    pub data_source: String,
}

// =============================================================================
// Query Builder
// =============================================================================

/// A single-source SELECT query.
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use = "Query has no effect until converted to SQL with to_sql() or render()"]
pub struct Query {
    pub columns: Vec<TokenStream>,
    pub aggregations: Vec<SelectExpr>,
    pub from: String,
    pub where_clause: Option<TokenStream>,
    pub group_by: Vec<TokenStream>,
    pub order_by: Vec<OrderByExpr>,
    pub limit_offset: LimitOffset,
}

impl Query {
    /// Create a query reading from `data_source`.
    pub fn new(data_source: &str) -> Self {
        Self {
            from: data_source.into(),
            ..Default::default()
        }
    }

    /// Set the plain column list (ignored in the SELECT list when
    /// aggregations are present).
    pub fn columns(mut self, columns: Vec<TokenStream>) -> Self {
        self.columns = columns;
        self
    }

    /// Set the aggregation select items.
    pub fn aggregations(mut self, aggregations: Vec<SelectExpr>) -> Self {
        self.aggregations = aggregations;
        self
    }

    /// Set the WHERE condition.
    pub fn filter(mut self, condition: TokenStream) -> Self {
        self.where_clause = Some(condition);
        self
    }

    /// Set the GROUP BY clause.
    pub fn group_by(mut self, exprs: Vec<TokenStream>) -> Self {
        self.group_by = exprs;
        self
    }

    /// Set the ORDER BY clause.
    pub fn order_by(mut self, exprs: Vec<OrderByExpr>) -> Self {
        self.order_by = exprs;
        self
    }

    /// Set LIMIT and OFFSET.
    pub fn limit_offset(mut self, limit_offset: LimitOffset) -> Self {
        self.limit_offset = limit_offset;
        self
    }

    fn select_list(&self) -> Vec<TokenStream> {
        if !self.aggregations.is_empty() {
            self.aggregations.iter().map(SelectExpr::to_tokens).collect()
        } else if !self.columns.is_empty() {
            self.columns.clone()
        } else {
            vec![Token::Star.into()]
        }
    }

    /// Convert to token stream for a dialect.
    pub fn to_tokens<D: SqlDialect + ?Sized>(&self, dialect: &D) -> TokenStream {
        let mut ts = TokenStream::new();

        ts.push(Token::Select).space();
        ts.append_joined(&self.select_list(), Token::Comma);

        ts.space()
            .push(Token::From)
            .space()
            .push(Token::Ident(self.from.clone()));

        if let Some(condition) = self.where_clause.as_ref().filter(|c| !c.is_empty()) {
            ts.space().push(Token::Where).space().append(condition);
        }

        if !self.group_by.is_empty() {
            ts.space().push(Token::GroupBy).space();
            ts.append_joined(&self.group_by, Token::Comma);
        }

        if !self.order_by.is_empty() {
            let items: Vec<_> = self.order_by.iter().map(OrderByExpr::to_tokens).collect();
            ts.space().push(Token::OrderBy).space();
            ts.append_joined(&items, Token::Comma);
        }

        let limit = self.limit_offset.to_tokens(dialect);
        if !limit.is_empty() {
            ts.space().append(&limit);
        }

        ts
    }

    /// Generate SQL string for a dialect.
    pub fn to_sql<D: SqlDialect + ?Sized>(&self, dialect: &D) -> String {
        self.to_tokens(dialect).serialize(dialect)
    }

    /// Render the statement and its structured pieces.
    pub fn render<D: SqlDialect + ?Sized>(&self, dialect: &D) -> CompiledQuery {
        let serialize_all = |streams: &[TokenStream]| -> Vec<String> {
            streams.iter().map(|s| s.serialize(dialect)).collect()
        };

        CompiledQuery {
            sql: self.to_sql(dialect),
            columns: serialize_all(&self.columns),
            group_by: serialize_all(&self.group_by),
            aggregations: self
                .aggregations
                .iter()
                .map(|a| a.to_tokens().serialize(dialect))
                .collect(),
            where_clause: self
                .where_clause
                .as_ref()
                .filter(|c| !c.is_empty())
                .map(|c| c.serialize(dialect)),
            order_by: self
                .order_by
                .iter()
                .map(|o| o.to_tokens().serialize(dialect))
                .collect(),
            limit: self.limit_offset.limit,
            offset: self.limit_offset.offset,
            data_source: self.from.clone(),
        }
    }
}

impl std::fmt::Display for Query {
    /// Formats the query using the PQL dialect.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_sql(&super::dialect::Pql))
    }
}
