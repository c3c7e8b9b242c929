//! In-memory MetadataProvider implementation.
//!
//! `StaticMetadata` holds fixed id → name maps. It backs the CLI (built
//! from the `[metadata]` settings section) and the test suites.

use std::collections::HashMap;

use super::provider::{
    FieldId, FieldInfo, MetadataError, MetadataProvider, MetadataResult, TableId, TableInfo,
};
use crate::config::{expand_env_vars, MetadataSettings, SettingsError};

/// MetadataProvider backed by fixed maps.
#[derive(Debug, Clone, Default)]
pub struct StaticMetadata {
    tables: HashMap<TableId, String>,
    fields: HashMap<FieldId, String>,
}

impl StaticMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, id: TableId, name: impl Into<String>) -> Self {
        self.tables.insert(id, name.into());
        self
    }

    pub fn with_field(mut self, id: FieldId, name: impl Into<String>) -> Self {
        self.fields.insert(id, name.into());
        self
    }

    /// Build from the `[metadata]` settings section.
    ///
    /// Keys must parse as integer ids; names support `${ENV_VAR}` expansion.
    pub fn from_settings(settings: &MetadataSettings) -> Result<Self, SettingsError> {
        let mut catalog = Self::new();
        for (key, name) in &settings.tables {
            catalog.tables.insert(parse_id(key)?, expand_env_vars(name)?);
        }
        for (key, name) in &settings.fields {
            catalog.fields.insert(parse_id(key)?, expand_env_vars(name)?);
        }
        Ok(catalog)
    }
}

fn parse_id(key: &str) -> Result<i64, SettingsError> {
    key.trim()
        .parse()
        .map_err(|_| SettingsError::InvalidConfig(format!("metadata id '{}' is not an integer", key)))
}

impl MetadataProvider for StaticMetadata {
    fn resolve_table(&self, id: TableId) -> MetadataResult<TableInfo> {
        self.tables
            .get(&id)
            .map(|name| TableInfo {
                id,
                name: name.clone(),
            })
            .ok_or(MetadataError::TableNotFound(id))
    }

    fn resolve_field(&self, id: FieldId) -> MetadataResult<FieldInfo> {
        self.fields
            .get(&id)
            .map(|name| FieldInfo {
                id,
                name: name.clone(),
            })
            .ok_or(MetadataError::FieldNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_ids() {
        let catalog = StaticMetadata::new()
            .with_table(1, "orders")
            .with_field(10, "price");

        assert_eq!(catalog.resolve_table(1).unwrap().name, "orders");
        assert_eq!(catalog.resolve_field(10).unwrap().name, "price");
    }

    #[test]
    fn test_resolve_unknown_ids() {
        let catalog = StaticMetadata::new();
        assert_eq!(catalog.resolve_table(7), Err(MetadataError::TableNotFound(7)));
        assert_eq!(catalog.resolve_field(8), Err(MetadataError::FieldNotFound(8)));
    }

    #[test]
    fn test_from_settings() {
        let mut settings = MetadataSettings::default();
        settings.tables.insert("3".into(), "events".into());
        settings.fields.insert(" 30 ".into(), "ts".into());

        let catalog = StaticMetadata::from_settings(&settings).unwrap();
        assert_eq!(catalog.resolve_table(3).unwrap().name, "events");
        assert_eq!(catalog.resolve_field(30).unwrap().name, "ts");
    }

    #[test]
    fn test_from_settings_rejects_non_integer_keys() {
        let mut settings = MetadataSettings::default();
        settings.fields.insert("price".into(), "price".into());

        assert!(matches!(
            StaticMetadata::from_settings(&settings),
            Err(SettingsError::InvalidConfig(_))
        ));
    }
}
