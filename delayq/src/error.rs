//! Error type definitions
//!
//! Provides the error types surfaced by the scheduler and its wiring.
//! Conditions such as removing from an empty queue or resetting a fired timer
//! are not represented here; the scheduler makes them unreachable.

/// Result type alias for delayq
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for delayq
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The dispatch receiver was dropped, so due entries can no longer be delivered
    #[error("Dispatch channel closed")]
    DispatchClosed,

    /// The scheduler loop is no longer running and cannot accept entries
    #[error("Scheduler stopped")]
    Stopped,

    /// The arrival channel is full
    #[error("Arrival channel full")]
    Full,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metrics registration errors
    #[error("Metrics error: {0}")]
    Metrics(String),

    /// The scheduler task panicked or was cancelled
    #[error("Join error: {0}")]
    Join(String),
}

impl Error {
    /// Check if the error is fatal (the scheduler cannot continue)
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::DispatchClosed | Error::Join(_))
    }
}

impl From<prometheus::Error> for Error {
    fn from(e: prometheus::Error) -> Self {
        Error::Metrics(e.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Error::Join(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_errors() {
        assert!(Error::DispatchClosed.is_fatal());
        assert!(Error::Join("panicked".to_string()).is_fatal());
        assert!(!Error::Stopped.is_fatal());
        assert!(!Error::Config("test".to_string()).is_fatal());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(Error::DispatchClosed.to_string(), "Dispatch channel closed");
        assert_eq!(
            Error::Config("arrival_capacity must be non-zero".to_string()).to_string(),
            "Configuration error: arrival_capacity must be non-zero"
        );
    }
}
