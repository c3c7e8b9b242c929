//! Configuration module.
//!
//! Handles the settings file, environment variable expansion and defaults.

mod settings;

pub use settings::{
    expand_env_vars, LoggingSettings, MetadataSettings, QuerySettings, Settings, SettingsError,
    CONFIG_ENV_VAR, LOCAL_CONFIG_FILE,
};
