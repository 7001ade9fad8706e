//! Scheduled entry definitions
//!
//! An `Entry` ties an opaque payload to the position at which it becomes due.

use crate::clock::Position;

/// Anything that can be ordered on the scheduling axis
pub trait Scheduled {
    /// The position at which this item becomes due
    fn position(&self) -> Position;
}

/// A payload tagged with the position it is scheduled for
///
/// The position is fixed at creation. The scheduler never inspects the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<T> {
    position: Position,
    payload: T,
}

impl<T> Entry<T> {
    /// Create a new entry
    pub fn new(position: Position, payload: T) -> Self {
        Self {
            position,
            payload,
        }
    }

    /// Get the scheduled position
    pub fn position(&self) -> Position {
        self.position
    }

    /// Borrow the payload
    pub fn payload(&self) -> &T {
        &self.payload
    }

    /// Take the payload, discarding the position
    pub fn into_payload(self) -> T {
        self.payload
    }

    /// Split the entry into its position and payload
    pub fn into_parts(self) -> (Position, T) {
        (self.position, self.payload)
    }
}

impl<T> Scheduled for Entry<T> {
    fn position(&self) -> Position {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_accessors() {
        let entry = Entry::new(Position(500), "First");
        assert_eq!(entry.position(), Position(500));
        assert_eq!(*entry.payload(), "First");

        let (position, payload) = entry.clone().into_parts();
        assert_eq!(position, Position(500));
        assert_eq!(payload, "First");
        assert_eq!(entry.into_payload(), "First");
    }
}
