//! MBQL: the structured query representation compiled to PQL.
//!
//! ```text
//! JSON query map ──[parse]──▶ MbqlQuery ──[compile]──▶ CompiledQuery
//!                              │
//!                              ├─ FilterExpr       (WHERE)
//!                              ├─ AggregationSpec  (SELECT aggregates)
//!                              ├─ breakout         (GROUP BY)
//!                              └─ OrderSpec        (ORDER BY)
//! ```

pub mod aggregation;
mod field;
pub mod filter;
pub mod parse;

pub use aggregation::{AggregationKind, AggregationSpec, Operand};
pub use field::{FieldNames, FieldRef};
pub use filter::{CompareOp, FilterExpr, MatchOp};
pub use parse::parse_query;

use crate::metadata::TableId;
use crate::sql::SortDir;

/// What an ORDER BY item sorts on.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderTarget {
    Field(FieldRef),
    /// Index into the query's aggregations.
    Aggregation(usize),
}

/// One ORDER BY item.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSpec {
    pub target: OrderTarget,
    pub dir: SortDir,
}

impl OrderSpec {
    pub fn asc(field: FieldRef) -> Self {
        Self {
            target: OrderTarget::Field(field),
            dir: SortDir::Asc,
        }
    }

    pub fn desc(field: FieldRef) -> Self {
        Self {
            target: OrderTarget::Field(field),
            dir: SortDir::Desc,
        }
    }
}

/// A parsed MBQL query body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MbqlQuery {
    pub database: Option<i64>,
    pub source_table: TableId,
    pub fields: Vec<FieldRef>,
    pub breakout: Vec<FieldRef>,
    pub aggregations: Vec<AggregationSpec>,
    pub filter: Option<FilterExpr>,
    pub order_by: Vec<OrderSpec>,
    pub limit: Option<u64>,
    /// 1-based page number.
    pub page: Option<u64>,
}

impl MbqlQuery {
    pub fn new(source_table: TableId) -> Self {
        Self {
            source_table,
            ..Default::default()
        }
    }

    /// Every field reference in the query, in clause order. May repeat.
    pub fn field_refs(&self) -> Vec<&FieldRef> {
        let mut refs: Vec<&FieldRef> = self.fields.iter().chain(&self.breakout).collect();
        if let Some(filter) = &self.filter {
            refs.extend(filter.field_refs());
        }
        for aggregation in &self.aggregations {
            refs.extend(aggregation.field_refs());
        }
        for order in &self.order_by {
            if let OrderTarget::Field(field) = &order.target {
                refs.push(field);
            }
        }
        refs
    }
}
