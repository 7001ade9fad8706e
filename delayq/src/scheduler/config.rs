//! Scheduler configuration
//!
//! Provides the settings used when wiring a scheduler into a process.

use crate::{Error, Result};
use serde::Deserialize;
use uuid::Uuid;

/// Scheduler configuration
///
/// Can be built fluently or deserialized; missing fields take their defaults.
///
/// # Example
///
/// ```rust
/// use delayq::scheduler::SchedulerConfig;
///
/// let config = SchedulerConfig::new()
///     .name("retry-backoff")
///     .arrival_capacity(256)
///     .dispatch_capacity(64);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Scheduler name, used in logs
    pub name: String,

    /// Buffer size of the arrival channel created by `spawn`
    pub arrival_capacity: usize,

    /// Buffer size of the dispatch channel created by `spawn`
    ///
    /// Dispatch is synchronous: once this buffer is full, the loop waits for
    /// the consumer and processes no other event meanwhile.
    pub dispatch_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            name: format!("delayq-scheduler-{}", Uuid::new_v4()),
            arrival_capacity: 1024,
            dispatch_capacity: 1024,
        }
    }
}

impl SchedulerConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scheduler name
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the arrival channel capacity
    #[must_use]
    pub fn arrival_capacity(mut self, capacity: usize) -> Self {
        self.arrival_capacity = capacity;
        self
    }

    /// Set the dispatch channel capacity
    #[must_use]
    pub fn dispatch_capacity(mut self, capacity: usize) -> Self {
        self.dispatch_capacity = capacity;
        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if a channel capacity is zero.
    pub fn validate(&self) -> Result<()> {
        if self.arrival_capacity == 0 {
            return Err(Error::Config("arrival_capacity must be non-zero".into()));
        }
        if self.dispatch_capacity == 0 {
            return Err(Error::Config("dispatch_capacity must be non-zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SchedulerConfig::default();
        assert!(config.name.starts_with("delayq-scheduler-"));
        assert_eq!(config.arrival_capacity, 1024);
        assert_eq!(config.dispatch_capacity, 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = SchedulerConfig::new()
            .name("timers")
            .arrival_capacity(8)
            .dispatch_capacity(2);

        assert_eq!(config.name, "timers");
        assert_eq!(config.arrival_capacity, 8);
        assert_eq!(config.dispatch_capacity, 2);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = SchedulerConfig::new().arrival_capacity(0).validate().unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = SchedulerConfig::new().dispatch_capacity(0).validate().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: SchedulerConfig =
            serde_json::from_str(r#"{"name": "jobs", "dispatch_capacity": 16}"#).unwrap();
        assert_eq!(config.name, "jobs");
        assert_eq!(config.arrival_capacity, 1024);
        assert_eq!(config.dispatch_capacity, 16);
    }
}
