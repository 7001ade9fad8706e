//! # delayq
//!
//! delayq is an in-memory delay scheduler. It accepts entries tagged with a
//! position on an ordered axis (usually a point in time) and hands each one to
//! a consumer exactly once, as soon as its position has been reached.
//!
//! ## Features
//!
//! - Single-owner event loop: no locks around the pending queue or the timer
//! - Immediate dispatch of entries that are already due
//! - One timer at a time, re-armed for the soonest pending entry
//! - Pluggable time providers (tokio clock, hand-advanced clock)
//! - Prometheus metrics
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use delayq::clock::{Position, RuntimeClock, TimeProvider};
//! use delayq::queue::PriorityQueue;
//! use delayq::scheduler::Scheduler;
//! use delayq::Entry;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let clock = RuntimeClock::new();
//!     let later = clock.current().0 + 2_000;
//!
//!     let (handle, mut due) = Scheduler::new(clock, PriorityQueue::new()).spawn()?;
//!
//!     handle.submit(Entry::new(Position(later), "send reminder")).await?;
//!
//!     if let Some(entry) = due.recv().await {
//!         println!("{} is due", entry.payload());
//!     }
//!
//!     handle.stop().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod error;

// Ordering axis and time providers
pub mod clock;

// Scheduled entries
pub mod entry;

// Ordered container
pub mod queue;

// Event loop
pub mod scheduler;

// Observability
pub mod observability;

// Re-export common types
pub use entry::Entry;
pub use error::{Error, Result};
