//! Common test utilities
//!
//! Shared harness for integration tests: a scheduler running on a
//! `ManualClock`, with its arrival, dispatch and shutdown ends exposed.

#![allow(dead_code)]

use delayq::clock::{ManualClock, Position};
use delayq::observability::SchedulerMetrics;
use delayq::queue::PriorityQueue;
use delayq::scheduler::{Scheduler, SchedulerConfig};
use delayq::Entry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Upper bound for any single wait in tests
pub const WAIT: Duration = Duration::from_secs(2);

/// Scheduler under test, driven by a hand-advanced clock
pub struct TestScheduler {
    pub clock: ManualClock,
    pub arrivals: Option<mpsc::Sender<Entry<&'static str>>>,
    pub dispatches: mpsc::Receiver<Entry<&'static str>>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<delayq::Result<()>>>,
}

impl TestScheduler {
    /// Start a scheduler whose clock reads `start`
    pub fn start(start: i64) -> Self {
        Self::start_with(start, None)
    }

    /// Start a scheduler that records into `metrics`
    pub fn start_with_metrics(start: i64, metrics: Arc<SchedulerMetrics>) -> Self {
        Self::start_with(start, Some(metrics))
    }

    fn start_with(start: i64, metrics: Option<Arc<SchedulerMetrics>>) -> Self {
        init_tracing();

        let clock = ManualClock::new(Position(start));
        let mut scheduler = Scheduler::new(clock.clone(), PriorityQueue::new())
            .with_config(SchedulerConfig::new().name("test"));
        if let Some(metrics) = metrics {
            scheduler = scheduler.with_metrics(metrics);
        }

        let (arrivals, arrival_rx) = mpsc::channel(16);
        let (dispatch_tx, dispatches) = mpsc::channel(16);
        let (shutdown, shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(scheduler.run(arrival_rx, dispatch_tx, async move {
            let _ = shutdown_rx.await;
        }));

        Self {
            clock,
            arrivals: Some(arrivals),
            dispatches,
            shutdown: Some(shutdown),
            task: Some(task),
        }
    }

    /// Submit an entry
    pub async fn submit(&self, position: i64, payload: &'static str) {
        self.arrivals
            .as_ref()
            .expect("Arrivals already closed")
            .send(Entry::new(Position(position), payload))
            .await
            .expect("Scheduler stopped unexpectedly");
    }

    /// Drop the producer side
    pub fn close_arrivals(&mut self) {
        self.arrivals.take();
    }

    /// Wait for the next dispatched payload
    pub async fn next(&mut self) -> &'static str {
        tokio::time::timeout(WAIT, self.dispatches.recv())
            .await
            .expect("Timed out waiting for a dispatch")
            .expect("Dispatch channel closed")
            .into_payload()
    }

    /// Assert nothing has been dispatched yet
    pub fn assert_idle(&mut self) {
        if let Ok(entry) = self.dispatches.try_recv() {
            panic!("Unexpected dispatch: {:?}", entry);
        }
    }

    /// Wait until the scheduler has armed a timer for `position`
    pub async fn wait_armed_for(&self, position: i64) {
        let clock = self.clock.clone();
        wait_for(move || clock.next_deadline() == Some(Position(position)), WAIT)
            .await
            .expect("Timer never armed for the expected position");
    }

    /// Signal shutdown
    pub fn shutdown(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }

    /// Wait for the loop to exit and return its result
    pub async fn join(&mut self) -> delayq::Result<()> {
        let task = self.task.take().expect("Scheduler already joined");
        tokio::time::timeout(WAIT, task)
            .await
            .expect("Scheduler did not exit")
            .expect("Scheduler task panicked")
    }

    /// Check whether the loop has exited
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |task| task.is_finished())
    }
}

impl Drop for TestScheduler {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Install a log subscriber once; filtered by `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Wait for a condition to be true
///
/// # Returns
/// Ok(()) if condition was met, Err if timeout occurred
pub async fn wait_for<F>(
    mut condition: F,
    timeout: Duration,
) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    let check_interval = Duration::from_millis(5);

    while start.elapsed() < timeout {
        if condition() {
            return Ok(());
        }
        tokio::time::sleep(check_interval).await;
    }

    Err(format!("Condition not met after {:?}", timeout).into())
}
