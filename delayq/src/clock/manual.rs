//! Hand-advanced time provider
//!
//! `ManualClock` only moves when told to, which makes scheduling behavior
//! deterministic. It also counts timer operations so callers can observe how
//! the scheduler arms, resets and releases its timer.

use super::{Distance, Position, TimeProvider, TimerHandle};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

#[derive(Debug)]
struct TimerSlot {
    deadline: Option<Position>,
    notify: mpsc::Sender<Position>,
}

#[derive(Debug, Default)]
struct ManualState {
    current: Position,
    timers: BTreeMap<u64, TimerSlot>,
    next_id: u64,
    armed: usize,
    resets: usize,
}

impl ManualState {
    /// Fire every timer whose deadline has been reached
    fn fire_due(&mut self) {
        let current = self.current;
        for slot in self.timers.values_mut() {
            if slot.deadline.is_some_and(|deadline| deadline <= current) {
                slot.deadline = None;
                let _ = slot.notify.try_send(current);
            }
        }
    }
}

/// Provider whose position is advanced explicitly
///
/// Clones share the same position and timers.
///
/// # Example
///
/// ```rust
/// use delayq::clock::{ManualClock, Position, TimeProvider};
///
/// let clock = ManualClock::new(Position(0));
/// clock.advance_to(Position(1500));
/// assert_eq!(clock.current(), Position(1500));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    state: Arc<Mutex<ManualState>>,
}

impl ManualClock {
    /// Create a clock starting at `start`
    #[must_use]
    pub fn new(start: Position) -> Self {
        let state = ManualState {
            current: start,
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move the clock to `position` and fire the timers it reaches
    ///
    /// Positions never move backwards; an earlier `position` is ignored.
    pub fn advance_to(&self, position: Position) {
        let mut state = self.lock();
        if position < state.current {
            tracing::warn!(
                "Ignoring backwards clock move from {} to {}",
                state.current,
                position
            );
            return;
        }
        state.current = position;
        state.fire_due();
    }

    /// Move the clock forward by `distance`
    pub fn advance_by(&self, distance: Distance) {
        let target = self.lock().current + distance;
        self.advance_to(target);
    }

    /// Number of timers created through `after`
    pub fn armed(&self) -> usize {
        self.lock().armed
    }

    /// Number of `reset` calls made on live handles
    pub fn resets(&self) -> usize {
        self.lock().resets
    }

    /// Number of handles currently counting toward a deadline
    pub fn active(&self) -> usize {
        self.lock()
            .timers
            .values()
            .filter(|slot| slot.deadline.is_some())
            .count()
    }

    /// The earliest deadline among live timers
    pub fn next_deadline(&self) -> Option<Position> {
        self.lock()
            .timers
            .values()
            .filter_map(|slot| slot.deadline)
            .min()
    }
}

impl TimeProvider for ManualClock {
    type Handle = ManualTimer;

    fn current(&self) -> Position {
        self.lock().current
    }

    fn after(&self, delay: Distance, notify: mpsc::Sender<Position>) -> ManualTimer {
        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.armed += 1;
        let deadline = state.current + delay;
        state.timers.insert(
            id,
            TimerSlot {
                deadline: Some(deadline),
                notify,
            },
        );
        state.fire_due();

        ManualTimer {
            state: Arc::clone(&self.state),
            id,
        }
    }
}

/// Handle to a timer armed by `ManualClock`
#[derive(Debug)]
pub struct ManualTimer {
    state: Arc<Mutex<ManualState>>,
    id: u64,
}

impl ManualTimer {
    fn lock(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TimerHandle for ManualTimer {
    fn reset(&mut self, delay: Distance) {
        let mut state = self.lock();
        let deadline = state.current + delay;
        state.resets += 1;
        if let Some(slot) = state.timers.get_mut(&self.id) {
            slot.deadline = Some(deadline);
        }
        state.fire_due();
    }

    fn stop(&mut self) {
        if let Some(slot) = self.lock().timers.get_mut(&self.id) {
            slot.deadline = None;
        }
    }
}

impl Drop for ManualTimer {
    fn drop(&mut self) {
        let id = self.id;
        self.lock().timers.remove(&id);
    }
}
