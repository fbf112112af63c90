//! Engine configuration.

use std::time::Duration;

/// Configuration for creating an engine.
#[derive(Debug, Clone)]
pub struct Config {
    /// Stores created when the engine is set up.
    pub stores: Vec<String>,

    /// Upper bound on waiting for the transaction lock (`None` = block).
    pub writer_wait: Option<Duration>,

    /// Deadline applied to transactions that don't set one themselves.
    pub default_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stores: Vec::new(),
            writer_wait: None,
            default_timeout: None,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a store to create at engine setup.
    #[must_use]
    pub fn with_store(mut self, name: impl Into<String>) -> Self {
        self.stores.push(name.into());
        self
    }

    /// Sets how long `begin` may wait for the transaction lock.
    #[must_use]
    pub const fn writer_wait(mut self, wait: Duration) -> Self {
        self.writer_wait = Some(wait);
        self
    }

    /// Sets the default per-transaction timeout.
    #[must_use]
    pub const fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.stores.is_empty());
        assert!(config.writer_wait.is_none());
        assert!(config.default_timeout.is_none());
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .with_store("a")
            .with_store("b")
            .writer_wait(Duration::from_millis(10))
            .default_timeout(Duration::from_secs(1));

        assert_eq!(config.stores, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(config.writer_wait, Some(Duration::from_millis(10)));
        assert_eq!(config.default_timeout, Some(Duration::from_secs(1)));
    }
}
