//! # mbql-pql
//!
//! Compiles MBQL queries to PQL, the SQL dialect of a column-store query
//! engine, and inlines user parameters into hand-written PQL templates.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────┐     ┌──────────────────────────────┐
//! │    MBQL query map (JSON)     │     │  Native template + params    │
//! └──────────────────────────────┘     └──────────────────────────────┘
//!                │ [mbql::parse]                     │ [native::template]
//!                ▼                                   ▼
//! ┌──────────────────────────────┐     ┌──────────────────────────────┐
//! │ MbqlQuery                    │     │ TemplateToken tree           │
//! │  filter / aggregation / ...  │     │  Text / ParamRef / [[...]]   │
//! └──────────────────────────────┘     └──────────────────────────────┘
//!                │ [compile]                         │ [native::substitute]
//!                │      ┌───────────────────────┐    │
//!                └─────▶│ params::format        │◀───┘
//!                       │ sql::Literal / Token  │
//!                       └───────────────────────┘
//!                │                                   │
//!                ▼                                   ▼
//! ┌──────────────────────────────┐     ┌──────────────────────────────┐
//! │ NativeQuery {mbql?, query}   │     │ SubstitutedQuery {query, []} │
//! └──────────────────────────────┘     └──────────────────────────────┘
//! ```
//!
//! Table and field names come from a [`metadata::MetadataProvider`].

pub mod compile;
pub mod config;
pub mod mbql;
pub mod metadata;
pub mod native;
pub mod options;
pub mod params;
pub mod sql;
pub mod telemetry;

pub use compile::{compile, CompileError, CompileOptions, MbqlCompiler, NativeQuery};
pub use native::{substitute, SubstitutedQuery, SubstitutionError, TemplateEngine};
pub use options::WithOptions;
