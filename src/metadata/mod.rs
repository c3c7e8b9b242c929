//! Metadata provider module.
//!
//! Table and field metadata live in the host application. This module
//! defines the boundary the compilers consume:
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              MetadataProvider               │
//! │  - resolve_table(id) -> TableInfo { name }  │
//! │  - resolve_field(id) -> FieldInfo { name }  │
//! └─────────────────────────────────────────────┘
//!           ▲                        ▲
//!           │                        │
//!   host integration          StaticMetadata
//!   (out of crate)            (settings / tests)
//! ```

mod catalog;
mod provider;

pub use catalog::StaticMetadata;
pub use provider::{
    FieldId, FieldInfo, MetadataError, MetadataProvider, MetadataResult, TableId, TableInfo,
};
