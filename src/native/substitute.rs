//! Template substitution engine.

use tracing::{debug, trace};

use crate::compile::CompileOptions;
use crate::mbql::FieldNames;
use crate::metadata::MetadataProvider;
use crate::options::WithOptions;
use crate::params::{format_param, ParamMap, ParamValue};
use crate::sql::Pql;

use super::template::{parse_template, TemplateToken};
use super::{SubstitutedQuery, SubstitutionError};

/// Inlines parameter values into template tokens.
#[derive(Debug, Clone)]
pub struct TemplateEngine<P> {
    provider: P,
    options: CompileOptions,
    dialect: Pql,
}

impl<P: MetadataProvider> TemplateEngine<P> {
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

    /// Parse `template` and substitute `params` into it.
    pub fn substitute_str(
        &self,
        template: &str,
        params: &ParamMap,
    ) -> Result<SubstitutedQuery, SubstitutionError> {
        let tokens = parse_template(template)?;
        self.substitute(&tokens, params)
    }

    /// Substitute `params` into parsed template tokens.
    ///
    /// An optional group is dropped wholesale when a parameter directly inside
    /// it is absent or empty. Outside any group the same condition fails.
    /// Field filter columns are resolved as they are rendered, in template
    /// order, so refs inside a dropped group never reach the provider.
    pub fn substitute(
        &self,
        tokens: &[TemplateToken],
        params: &ParamMap,
    ) -> Result<SubstitutedQuery, SubstitutionError> {
        let mut names = FieldNames::default();
        let mut out = String::new();
        self.render(tokens, params, &mut names, &mut out)?;

        let sql = out.trim().to_string();
        debug!(
            sql_len = sql.len(),
            resolved_fields = names.len(),
            "substituted native query"
        );

        let mut query = SubstitutedQuery::new(sql);
        if let Some(timeout) = self.options.timeout {
            query = query.with_timeout(timeout);
        }
        Ok(query)
    }

    fn render(
        &self,
        tokens: &[TemplateToken],
        params: &ParamMap,
        names: &mut FieldNames,
        out: &mut String,
    ) -> Result<(), SubstitutionError> {
        for token in tokens {
            match token {
                TemplateToken::Text(text) => out.push_str(text),
                TemplateToken::ParamRef(name) => {
                    let value = params
                        .get(name)
                        .ok_or_else(|| SubstitutionError::MissingRequiredParameter(name.clone()))?;
                    if let ParamValue::FieldFilter(filter) = value {
                        names.ensure(&self.provider, &filter.field)?;
                    }
                    let fragment = format_param(name, value, names)?;
                    out.push_str(&fragment.serialize(&self.dialect));
                }
                TemplateToken::OptionalGroup(children) => match missing_param(children, params) {
                    Some(name) => trace!(param = %name, "dropped optional clause"),
                    None => self.render(children, params, names, out)?,
                },
            }
        }
        Ok(())
    }
}

/// First parameter directly inside a group that has nothing to inline.
fn missing_param<'a>(tokens: &'a [TemplateToken], params: &ParamMap) -> Option<&'a str> {
    tokens.iter().find_map(|token| match token {
        TemplateToken::ParamRef(name) if !has_value(params.get(name)) => Some(name.as_str()),
        _ => None,
    })
}

fn has_value(value: Option<&ParamValue>) -> bool {
    match value {
        None | Some(ParamValue::NoValue) => false,
        Some(ParamValue::Array(values)) => !values.is_empty(),
        Some(_) => true,
    }
}

/// Parse `template` and substitute `params`, resolving field filter
/// columns through `provider`.
pub fn substitute<P: MetadataProvider + ?Sized>(
    template: &str,
    params: &ParamMap,
    provider: &P,
) -> Result<SubstitutedQuery, SubstitutionError> {
    TemplateEngine::new(provider).substitute_str(template, params)
}
