//! MetadataProvider trait definition.
//!
//! The MetadataProvider trait abstracts over the host application's
//! table/field metadata store. The compilers only ever need names for
//! opaque identifiers, so the trait is deliberately narrow and synchronous:
//! any caching or I/O belongs to the implementation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Identifier of a table in the host metadata store.
pub type TableId = i64;

/// Identifier of a field in the host metadata store.
pub type FieldId = i64;

/// Result type for metadata operations.
pub type MetadataResult<T> = Result<T, MetadataError>;

/// Metadata lookup failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetadataError {
    #[error("Table {0} not found")]
    TableNotFound(TableId),

    #[error("Field {0} not found")]
    FieldNotFound(FieldId),

    /// The backing store could not answer. Host providers return this for
    /// I/O or cache failures; the compilers pass it through unchanged.
    #[error("Metadata lookup failed: {0}")]
    Lookup(String),
}

/// Resolved table metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    pub id: TableId,
    pub name: String,
}

/// Resolved field metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub id: FieldId,
    pub name: String,
}

/// Trait for resolving table and field identifiers to names.
///
/// # Example
///
/// ```ignore
/// use mbql_pql::metadata::MetadataProvider;
///
/// fn data_source(provider: &impl MetadataProvider) -> MetadataResult<String> {
///     Ok(provider.resolve_table(12)?.name)
/// }
/// ```
pub trait MetadataProvider: Send + Sync {
    /// Resolve a table id.
    fn resolve_table(&self, id: TableId) -> MetadataResult<TableInfo>;

    /// Resolve a field id.
    fn resolve_field(&self, id: FieldId) -> MetadataResult<FieldInfo>;
}

impl<P: MetadataProvider + ?Sized> MetadataProvider for &P {
    fn resolve_table(&self, id: TableId) -> MetadataResult<TableInfo> {
        (**self).resolve_table(id)
    }

    fn resolve_field(&self, id: FieldId) -> MetadataResult<FieldInfo> {
        (**self).resolve_field(id)
    }
}

impl<P: MetadataProvider + ?Sized> MetadataProvider for Arc<P> {
    fn resolve_table(&self, id: TableId) -> MetadataResult<TableInfo> {
        (**self).resolve_table(id)
    }

    fn resolve_field(&self, id: FieldId) -> MetadataResult<FieldInfo> {
        (**self).resolve_field(id)
    }
}
