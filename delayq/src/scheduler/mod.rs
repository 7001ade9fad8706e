//! Scheduler implementation
//!
//! The scheduler is a single-owner event loop. It multiplexes three event
//! sources (new arrivals, timer expirations and shutdown) and is the only code
//! that touches the pending queue and the timer handle, so neither needs a lock.
//!
//! Entries whose position is already reached are dispatched on arrival without
//! entering the queue. Everything else waits in the queue, with a single timer
//! armed for the smallest pending position.

pub mod config;
pub mod handle;

pub use config::SchedulerConfig;
pub use handle::SchedulerHandle;

use crate::clock::{Distance, Position, TimeProvider, TimerHandle};
use crate::entry::Entry;
use crate::observability::{DispatchPath, SchedulerMetrics, TimerOp};
use crate::queue::Queue;
use crate::{Error, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Delay scheduler
///
/// Holds the time provider, the queue of pending entries and at most one
/// armed timer. `watcher` is `None` while unarmed. A handle that has fired is
/// taken out of it before any re-arming decision, including one whose wake-up
/// is still unread when an arrival is handled, so a fired handle is never
/// reset.
///
/// # Example
///
/// ```rust
/// use delayq::clock::{Position, RuntimeClock};
/// use delayq::queue::PriorityQueue;
/// use delayq::scheduler::Scheduler;
/// use delayq::Entry;
/// use tokio::sync::{mpsc, oneshot};
///
/// # async fn example() -> delayq::Result<()> {
/// let scheduler = Scheduler::new(RuntimeClock::new(), PriorityQueue::new());
/// let (arrivals, arrival_rx) = mpsc::channel(16);
/// let (dispatch_tx, mut dispatches) = mpsc::channel(16);
/// let (stop, stopped) = oneshot::channel::<()>();
///
/// let task = tokio::spawn(scheduler.run(arrival_rx, dispatch_tx, async move {
///     let _ = stopped.await;
/// }));
///
/// arrivals.send(Entry::new(Position(50), "ping")).await.ok();
/// let due = dispatches.recv().await;
/// assert_eq!(due.map(Entry::into_payload), Some("ping"));
///
/// let _ = stop.send(());
/// task.await??;
/// # Ok(())
/// # }
/// ```
pub struct Scheduler<P: TimeProvider, Q> {
    /// Source of positions and timers
    provider: P,

    /// Pending entries, smallest position first
    queue: Q,

    /// Timer armed for the smallest pending position
    watcher: Option<P::Handle>,

    /// Scheduler settings
    config: SchedulerConfig,

    /// Metrics collector
    metrics: Option<Arc<SchedulerMetrics>>,
}

impl<P: TimeProvider, Q> Scheduler<P, Q> {
    /// Create a new scheduler from a time provider and a queue
    ///
    /// Entries already in `queue` are scheduled when `run` starts.
    #[must_use]
    pub fn new(provider: P, queue: Q) -> Self {
        Self {
            provider,
            queue,
            watcher: None,
            config: SchedulerConfig::default(),
            metrics: None,
        }
    }

    /// Replace the configuration
    #[must_use]
    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Enable metrics collection
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<SchedulerMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Run the event loop until `shutdown` resolves
    ///
    /// Entries already in the queue are scheduled before the first event is
    /// handled. Shutdown takes precedence over pending expirations and
    /// arrivals. Entries still queued at shutdown are dropped without being
    /// dispatched.
    ///
    /// Dispatch waits for room in `dispatches`. A consumer that stops
    /// receiving therefore stalls the whole loop, including shutdown handling.
    ///
    /// If every arrival sender is dropped, queued entries are still dispatched
    /// and the loop keeps waiting for `shutdown`.
    ///
    /// # Errors
    ///
    /// Returns `Error::DispatchClosed` if the dispatch receiver is dropped.
    pub async fn run<T, S>(
        mut self,
        mut arrivals: mpsc::Receiver<Entry<T>>,
        dispatches: mpsc::Sender<Entry<T>>,
        shutdown: S,
    ) -> Result<()>
    where
        Q: Queue<Entry<T>>,
        T: Send + 'static,
        S: Future<Output = ()>,
    {
        tracing::info!("Scheduler {} started", self.config.name);

        let mut wake = Wake::new();
        let mut arrivals_open = true;
        tokio::pin!(shutdown);

        if !self.queue.is_empty() {
            tracing::debug!(
                "Scheduler {} starting with {} queued entries",
                self.config.name,
                self.queue.len()
            );
            self.reconcile(&mut wake, &dispatches).await?;
        }

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    tracing::info!("Scheduler {} received shutdown signal", self.config.name);
                    break;
                }

                Some(fired_at) = wake.rx.recv() => {
                    self.on_expire(fired_at, &mut wake, &dispatches).await?;
                }

                arrival = arrivals.recv(), if arrivals_open => match arrival {
                    Some(entry) => self.on_arrival(entry, &mut wake, &dispatches).await?,
                    None => {
                        tracing::info!(
                            "Scheduler {} arrival channel closed, {} entries still pending",
                            self.config.name,
                            self.queue.len()
                        );
                        arrivals_open = false;
                    }
                },
            }
        }

        let dropped = self.queue.len();
        if dropped > 0 {
            tracing::warn!(
                "Scheduler {} dropping {} pending entries on shutdown",
                self.config.name,
                dropped
            );
        }

        tracing::info!("Scheduler {} stopped", self.config.name);
        Ok(())
    }

    async fn on_arrival<T>(
        &mut self,
        entry: Entry<T>,
        wake: &mut Wake,
        dispatches: &mpsc::Sender<Entry<T>>,
    ) -> Result<()>
    where
        Q: Queue<Entry<T>>,
        T: Send + 'static,
    {
        if let Some(metrics) = &self.metrics {
            metrics.record_received(&self.config.name);
        }

        let delay = entry.position() - self.provider.current();
        if delay.is_due() {
            tracing::debug!("Entry at {} already due on arrival", entry.position());
            return self.dispatch(entry, DispatchPath::Immediate, dispatches).await;
        }

        self.queue.insert(entry);
        self.reconcile(wake, dispatches).await
    }

    async fn on_expire<T>(
        &mut self,
        fired_at: Position,
        wake: &mut Wake,
        dispatches: &mpsc::Sender<Entry<T>>,
    ) -> Result<()>
    where
        Q: Queue<Entry<T>>,
        T: Send + 'static,
    {
        if self.watcher.is_some() {
            // The handle has fired and must not be reset again
            self.release();
        } else {
            tracing::debug!("Wake-up at {} with no timer armed", fired_at);
        }

        self.reconcile(wake, dispatches).await
    }

    /// Dispatch every due entry, then arm the timer for the next pending
    /// position or release it if the queue is empty
    async fn reconcile<T>(
        &mut self,
        wake: &mut Wake,
        dispatches: &mpsc::Sender<Entry<T>>,
    ) -> Result<()>
    where
        Q: Queue<Entry<T>>,
        T: Send + 'static,
    {
        while let Some(delay) = self.next_delay::<T>() {
            if !delay.is_due() {
                self.arm(delay, wake);
                self.update_pending::<T>();
                return Ok(());
            }

            if let Some(entry) = self.queue.remove_min() {
                self.dispatch(entry, DispatchPath::Queued, dispatches).await?;
            }
        }

        if self.watcher.is_some() {
            tracing::debug!("Queue drained, timer released");
            self.release();
        }
        self.update_pending::<T>();
        Ok(())
    }

    /// Distance from now to the smallest pending position
    fn next_delay<T>(&self) -> Option<Distance>
    where
        Q: Queue<Entry<T>>,
    {
        let next = self.queue.peek_min()?;
        Some(next.position() - self.provider.current())
    }

    fn arm(&mut self, delay: Distance, wake: &mut Wake) {
        // A queued wake-up means the armed handle may already have fired.
        // Everything due was just dispatched, so the wake-up itself is spent.
        if let Some(fired_at) = wake.take_pending() {
            if self.watcher.is_some() {
                tracing::debug!("Timer fired at {} before its wake-up was handled", fired_at);
                self.release();
            }
        }

        let op = if let Some(handle) = self.watcher.as_mut() {
            handle.reset(delay);
            TimerOp::Reset
        } else {
            self.watcher = Some(self.provider.after(delay, wake.tx.clone()));
            TimerOp::Arm
        };

        tracing::debug!("Timer {:?} for next entry in {}", op, delay);
        if let Some(metrics) = &self.metrics {
            metrics.record_timer(&self.config.name, op);
        }
    }

    /// Drop the current timer handle, stopping it if it is still counting
    fn release(&mut self) {
        if let Some(mut handle) = self.watcher.take() {
            handle.stop();
            if let Some(metrics) = &self.metrics {
                metrics.record_timer(&self.config.name, TimerOp::Stop);
            }
        }
    }

    async fn dispatch<T>(
        &mut self,
        entry: Entry<T>,
        path: DispatchPath,
        dispatches: &mpsc::Sender<Entry<T>>,
    ) -> Result<()>
    where
        T: Send + 'static,
    {
        if let Some(metrics) = &self.metrics {
            let lateness = self.provider.current() - entry.position();
            metrics.record_dispatched(&self.config.name, path, lateness);
        }

        dispatches.send(entry).await.map_err(|_| {
            tracing::error!("Scheduler {} lost its consumer", self.config.name);
            Error::DispatchClosed
        })
    }

    fn update_pending<T>(&self)
    where
        Q: Queue<Entry<T>>,
    {
        if let Some(metrics) = &self.metrics {
            metrics.set_pending(&self.config.name, self.queue.len());
        }
    }
}

/// Wake-up channel shared by every timer the scheduler arms
///
/// Capacity 1: a wake-up already waiting covers any later one. A timer that
/// fires always leaves a message here until the loop reads it.
struct Wake {
    tx: mpsc::Sender<Position>,
    rx: mpsc::Receiver<Position>,
}

impl Wake {
    fn new() -> Self {
        let (tx, rx) = mpsc::channel(1);
        Self { tx, rx }
    }

    fn take_pending(&mut self) -> Option<Position> {
        self.rx.try_recv().ok()
    }
}
