//! Tokio-backed time provider
//!
//! Positions are milliseconds elapsed since the clock was created. Each timer
//! is a small task sleeping until its deadline, so it also follows paused and
//! auto-advanced time in tests.

use super::{Distance, Position, TimeProvider, TimerHandle};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Provider reading positions from the tokio clock
#[derive(Debug, Clone, Copy)]
pub struct RuntimeClock {
    epoch: Instant,
}

impl RuntimeClock {
    /// Create a clock whose position zero is now
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    fn position_at(epoch: Instant, at: Instant) -> Position {
        let elapsed = at.saturating_duration_since(epoch);
        Position(i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
    }
}

impl Default for RuntimeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeProvider for RuntimeClock {
    type Handle = RuntimeTimer;

    fn current(&self) -> Position {
        Self::position_at(self.epoch, Instant::now())
    }

    /// Arm a timer; must be called from within a tokio runtime
    fn after(&self, delay: Distance, notify: mpsc::Sender<Position>) -> RuntimeTimer {
        let (control, deadlines) = watch::channel(Some(Instant::now() + delay.as_duration()));
        let task = tokio::spawn(drive(self.epoch, deadlines, notify));
        RuntimeTimer { control, task }
    }
}

/// Handle to a timer armed by `RuntimeClock`
///
/// The timer can be reset after it fired or was stopped; dropping the handle
/// ends its task.
#[derive(Debug)]
pub struct RuntimeTimer {
    control: watch::Sender<Option<Instant>>,
    task: JoinHandle<()>,
}

impl TimerHandle for RuntimeTimer {
    fn reset(&mut self, delay: Distance) {
        self.control
            .send_replace(Some(Instant::now() + delay.as_duration()));
    }

    fn stop(&mut self) {
        self.control.send_replace(None);
    }
}

impl Drop for RuntimeTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn drive(
    epoch: Instant,
    mut deadlines: watch::Receiver<Option<Instant>>,
    notify: mpsc::Sender<Position>,
) {
    loop {
        let deadline = *deadlines.borrow_and_update();
        match deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = tokio::time::sleep_until(deadline) => {
                        let position = RuntimeClock::position_at(epoch, Instant::now());
                        // A full channel already holds a wake-up
                        let _ = notify.try_send(position);
                        if deadlines.changed().await.is_err() {
                            return;
                        }
                    }
                    changed = deadlines.changed() => {
                        if changed.is_err() {
                            return;
                        }
                    }
                }
            }
            None => {
                if deadlines.changed().await.is_err() {
                    return;
                }
            }
        }
    }
}
