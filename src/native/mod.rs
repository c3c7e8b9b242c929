//! Native (hand-written) queries with inlined template parameters.
//!
//! The target engine accepts no bind parameters, so every value is rendered
//! into the SQL text and the residual parameter list is always empty.

mod substitute;
pub mod template;

pub use substitute::{substitute, TemplateEngine};
pub use template::{parse_template, TemplateSyntaxError, TemplateToken};

use serde::Serialize;
use serde_json::Value;

use crate::metadata::MetadataError;
use crate::options::{QueryOptions, WithOptions};
use crate::params::FormatError;

/// Errors substituting parameters into a template.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SubstitutionError {
    #[error("Missing required parameter '{0}'")]
    MissingRequiredParameter(String),

    #[error("Unresolved field: {0}")]
    UnresolvedField(#[from] MetadataError),

    #[error("Template syntax error: {0}")]
    TemplateSyntax(#[from] TemplateSyntaxError),

    #[error(transparent)]
    Format(FormatError),
}

impl From<FormatError> for SubstitutionError {
    fn from(err: FormatError) -> Self {
        match err {
            FormatError::UnresolvedField(inner) => SubstitutionError::UnresolvedField(inner),
            other => SubstitutionError::Format(other),
        }
    }
}

/// A native query with every parameter inlined.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubstitutedQuery {
    pub query: String,

    /// Residual bind values; always empty.
    pub params: Vec<Value>,

    #[serde(skip_serializing_if = "QueryOptions::is_empty")]
    pub options: QueryOptions,
}

impl SubstitutedQuery {
    pub fn new(query: String) -> Self {
        Self {
            query,
            params: Vec::new(),
            options: QueryOptions::new(),
        }
    }
}

impl WithOptions for SubstitutedQuery {
    fn options(&self) -> &QueryOptions {
        &self.options
    }

    fn options_mut(&mut self) -> &mut QueryOptions {
        &mut self.options
    }
}
