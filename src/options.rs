//! Execution options carried alongside produced queries.
//!
//! The execution layer wraps every outgoing query with extra options (most
//! importantly a timeout). Attaching an option never drops the ones already
//! present; only the same key is overwritten.

use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};

/// Key under which the query timeout (milliseconds) is stored.
pub const TIMEOUT_KEY: &str = "timeout";

/// Option map attached to a produced query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct QueryOptions(Map<String, Value>);

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, keeping every other option.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The timeout option, if set.
    pub fn timeout(&self) -> Option<Duration> {
        self.get(TIMEOUT_KEY)
            .and_then(Value::as_u64)
            .map(Duration::from_millis)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Produced queries that accept execution options.
pub trait WithOptions: Sized {
    fn options(&self) -> &QueryOptions;

    fn options_mut(&mut self) -> &mut QueryOptions;

    /// Attach an option, keeping previously set ones.
    fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options_mut().insert(key, value);
        self
    }

    /// Attach the query timeout in milliseconds.
    fn with_timeout(self, timeout: Duration) -> Self {
        let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self.with_option(TIMEOUT_KEY, millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Default)]
    struct Dummy {
        options: QueryOptions,
    }

    impl WithOptions for Dummy {
        fn options(&self) -> &QueryOptions {
            &self.options
        }

        fn options_mut(&mut self) -> &mut QueryOptions {
            &mut self.options
        }
    }

    #[test]
    fn test_timeout_keeps_existing_options() {
        let query = Dummy::default()
            .with_option("priority", "low")
            .with_timeout(Duration::from_secs(2));

        assert_eq!(query.options().get("priority"), Some(&json!("low")));
        assert_eq!(query.options().timeout(), Some(Duration::from_millis(2000)));
        assert_eq!(query.options().len(), 2);
    }

    #[test]
    fn test_same_key_is_overwritten() {
        let query = Dummy::default()
            .with_timeout(Duration::from_secs(1))
            .with_timeout(Duration::from_secs(5));

        assert_eq!(query.options().timeout(), Some(Duration::from_secs(5)));
        assert_eq!(query.options().len(), 1);
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let mut options = QueryOptions::new();
        options.insert("timeout", 10);
        assert_eq!(serde_json::to_value(&options).unwrap(), json!({"timeout": 10}));
    }
}
