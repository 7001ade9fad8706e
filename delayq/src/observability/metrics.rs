//! Prometheus metrics collector for delayq
//!
//! Tracks arrivals, dispatches, pending entries and timer activity.

use crate::clock::Distance;
use prometheus::{
    HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// How an entry reached the consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPath {
    /// Already due on arrival; never entered the queue
    Immediate,
    /// Released from the queue once its position was reached
    Queued,
}

impl DispatchPath {
    fn as_str(self) -> &'static str {
        match self {
            DispatchPath::Immediate => "immediate",
            DispatchPath::Queued => "queued",
        }
    }
}

/// Operation performed on the scheduler's timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOp {
    /// A new timer was created
    Arm,
    /// The live timer was re-targeted
    Reset,
    /// The timer handle was released after firing or because the queue drained
    Stop,
}

impl TimerOp {
    fn as_str(self) -> &'static str {
        match self {
            TimerOp::Arm => "arm",
            TimerOp::Reset => "reset",
            TimerOp::Stop => "stop",
        }
    }
}

/// Scheduler metrics collector
///
/// Every series carries a `scheduler` label so several schedulers can share
/// one collector.
#[derive(Clone)]
pub struct SchedulerMetrics {
    registry: Arc<Registry>,

    entries_received_total: IntCounterVec,
    entries_dispatched_total: IntCounterVec,
    pending_entries: IntGaugeVec,
    timer_operations_total: IntCounterVec,
    dispatch_lateness_seconds: HistogramVec,
}

impl SchedulerMetrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let entries_received_total = IntCounterVec::new(
            Opts::new("delayq_entries_received_total", "Total number of entries submitted"),
            &["scheduler"],
        )?;

        let entries_dispatched_total = IntCounterVec::new(
            Opts::new("delayq_entries_dispatched_total", "Total number of entries dispatched"),
            &["scheduler", "path"],
        )?;

        let pending_entries = IntGaugeVec::new(
            Opts::new("delayq_pending_entries", "Number of entries waiting in the queue"),
            &["scheduler"],
        )?;

        let timer_operations_total = IntCounterVec::new(
            Opts::new("delayq_timer_operations_total", "Timer arm, reset and stop operations"),
            &["scheduler", "op"],
        )?;

        let dispatch_lateness_seconds = HistogramVec::new(
            HistogramOpts::new(
                "delayq_dispatch_lateness_seconds",
                "Distance between an entry's position and its dispatch",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0]),
            &["scheduler"],
        )?;

        registry.register(Box::new(entries_received_total.clone()))?;
        registry.register(Box::new(entries_dispatched_total.clone()))?;
        registry.register(Box::new(pending_entries.clone()))?;
        registry.register(Box::new(timer_operations_total.clone()))?;
        registry.register(Box::new(dispatch_lateness_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            entries_received_total,
            entries_dispatched_total,
            pending_entries,
            timer_operations_total,
            dispatch_lateness_seconds,
        })
    }

    /// Record an entry arriving at the scheduler
    pub fn record_received(&self, scheduler: &str) {
        self.entries_received_total
            .with_label_values(&[scheduler])
            .inc();
    }

    /// Record an entry handed to the consumer `lateness` after its position
    pub fn record_dispatched(&self, scheduler: &str, path: DispatchPath, lateness: Distance) {
        self.entries_dispatched_total
            .with_label_values(&[scheduler, path.as_str()])
            .inc();
        self.dispatch_lateness_seconds
            .with_label_values(&[scheduler])
            .observe(lateness.as_duration().as_secs_f64());
    }

    /// Update the pending entry gauge
    pub fn set_pending(&self, scheduler: &str, pending: usize) {
        self.pending_entries
            .with_label_values(&[scheduler])
            .set(pending as i64);
    }

    /// Record a timer operation
    pub fn record_timer(&self, scheduler: &str, op: TimerOp) {
        self.timer_operations_total
            .with_label_values(&[scheduler, op.as_str()])
            .inc();
    }

    /// Get the registry for custom metrics
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Gather metrics in Prometheus text format
    pub fn gather(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder.encode_to_string(&metric_families).unwrap_or_default()
    }
}
