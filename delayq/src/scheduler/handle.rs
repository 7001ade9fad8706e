//! Spawned scheduler handle
//!
//! Wires a `Scheduler` onto the tokio runtime with bounded channels and hands
//! back the producer side and the consumer side.

use super::Scheduler;
use crate::clock::TimeProvider;
use crate::entry::Entry;
use crate::queue::Queue;
use crate::{Error, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Handle to a scheduler running on the tokio runtime
///
/// Dropping the handle signals shutdown.
///
/// # Example
///
/// ```rust
/// use delayq::clock::{Position, RuntimeClock};
/// use delayq::queue::PriorityQueue;
/// use delayq::scheduler::Scheduler;
/// use delayq::Entry;
///
/// # async fn example() -> delayq::Result<()> {
/// let (handle, mut due) = Scheduler::new(RuntimeClock::new(), PriorityQueue::new()).spawn()?;
///
/// handle.submit(Entry::new(Position(100), "retry #1")).await?;
/// if let Some(entry) = due.recv().await {
///     println!("due: {}", entry.payload());
/// }
///
/// handle.stop().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SchedulerHandle<T> {
    arrivals: mpsc::Sender<Entry<T>>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<()>>,
}

impl<P: TimeProvider, Q> Scheduler<P, Q> {
    /// Spawn the event loop on the current tokio runtime
    ///
    /// Returns the handle used to submit entries and the receiver that due
    /// entries are dispatched to.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration is invalid.
    pub fn spawn<T>(self) -> Result<(SchedulerHandle<T>, mpsc::Receiver<Entry<T>>)>
    where
        Q: Queue<Entry<T>>,
        T: Send + 'static,
    {
        self.config.validate()?;

        let (arrivals, arrival_rx) = mpsc::channel(self.config.arrival_capacity);
        let (dispatch_tx, dispatches) = mpsc::channel(self.config.dispatch_capacity);
        let (shutdown, shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(self.run(arrival_rx, dispatch_tx, async move {
            // A dropped sender also means shutdown
            let _ = shutdown_rx.await;
        }));

        let handle = SchedulerHandle {
            arrivals,
            shutdown: Some(shutdown),
            task,
        };
        Ok((handle, dispatches))
    }
}

impl<T: Send + 'static> SchedulerHandle<T> {
    /// Submit an entry, waiting for room in the arrival channel
    ///
    /// # Errors
    ///
    /// Returns `Error::Stopped` if the scheduler is no longer running.
    pub async fn submit(&self, entry: Entry<T>) -> Result<()> {
        self.arrivals.send(entry).await.map_err(|_| Error::Stopped)
    }

    /// Submit an entry without waiting
    ///
    /// # Errors
    ///
    /// Returns `Error::Full` if the arrival channel has no room, or
    /// `Error::Stopped` if the scheduler is no longer running.
    pub fn try_submit(&self, entry: Entry<T>) -> Result<()> {
        self.arrivals.try_send(entry).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => Error::Full,
            mpsc::error::TrySendError::Closed(_) => Error::Stopped,
        })
    }

    /// Get an additional producer for this scheduler
    pub fn sender(&self) -> mpsc::Sender<Entry<T>> {
        self.arrivals.clone()
    }

    /// Signal shutdown; calling it again has no effect
    pub fn shutdown(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }

    /// Check whether the event loop has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the event loop to exit
    ///
    /// Does not signal shutdown by itself.
    ///
    /// # Errors
    ///
    /// Returns the loop's own error, or `Error::Join` if its task panicked.
    pub async fn join(self) -> Result<()> {
        let SchedulerHandle {
            arrivals,
            shutdown,
            task,
        } = self;
        // Keep the shutdown sender alive while waiting
        let _shutdown = shutdown;
        drop(arrivals);
        task.await?
    }

    /// Signal shutdown and wait for the event loop to exit
    ///
    /// # Errors
    ///
    /// Same as `join`.
    pub async fn stop(mut self) -> Result<()> {
        self.shutdown();
        self.join().await
    }
}
