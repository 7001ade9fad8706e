//! Observability module
//!
//! Provides Prometheus metrics for the scheduler loop.

pub mod metrics;

pub use metrics::{DispatchPath, SchedulerMetrics, TimerOp};
