//! Clock module
//!
//! Defines the ordering axis (`Position`, `Distance`) and the collaborator
//! traits the scheduler relies on: a `TimeProvider` that reads the current
//! position and arms one-shot timers, and the `TimerHandle` those timers
//! return.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::time::Duration;
use tokio::sync::mpsc;

pub mod manual;
pub mod runtime;

pub use manual::{ManualClock, ManualTimer};
pub use runtime::{RuntimeClock, RuntimeTimer};

/// A point on the scheduling axis, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Position(pub i64);

/// The difference between two positions, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Distance(pub i64);

impl Distance {
    /// Whether a target this far away is already reached
    ///
    /// An entry exactly at the current position is due.
    pub fn is_due(self) -> bool {
        self.0 <= 0
    }

    /// Convert to a `Duration`, clamping non-positive distances to zero
    pub fn as_duration(self) -> Duration {
        Duration::from_millis(self.0.max(0) as u64)
    }
}

impl Sub for Position {
    type Output = Distance;

    fn sub(self, rhs: Position) -> Distance {
        Distance(self.0.saturating_sub(rhs.0))
    }
}

impl Add<Distance> for Position {
    type Output = Position;

    fn add(self, rhs: Distance) -> Position {
        Position(self.0.saturating_add(rhs.0))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

impl From<i64> for Position {
    fn from(value: i64) -> Self {
        Position(value)
    }
}

impl From<i64> for Distance {
    fn from(value: i64) -> Self {
        Distance(value)
    }
}

/// Source of positions and one-shot timers
///
/// `current` must be monotonic and free of side effects. `after` arms a new
/// timer that sends the position it fired at on `notify` once, no earlier than
/// `delay` from now. Timers must fire with `try_send`: a full channel already
/// holds a pending wake-up.
pub trait TimeProvider: Send + 'static {
    /// Timer handle returned by `after`
    type Handle: TimerHandle;

    /// Read the current position
    fn current(&self) -> Position;

    /// Arm a new one-shot timer
    fn after(&self, delay: Distance, notify: mpsc::Sender<Position>) -> Self::Handle;
}

/// A one-shot timer owned by the scheduler
///
/// Dropping a handle stops it.
pub trait TimerHandle: Send + 'static {
    /// Re-arm the timer for a new delay from now
    ///
    /// The scheduler only calls this on a handle that has not fired.
    fn reset(&mut self, delay: Distance);

    /// Cancel the timer. Calling this on a stopped or fired handle is a no-op.
    fn stop(&mut self);
}
