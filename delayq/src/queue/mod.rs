//! Ordered container module
//!
//! Provides the `Queue` abstraction the scheduler stores pending entries in,
//! and `PriorityQueue`, an array-backed binary min-heap keyed by position.

use crate::entry::Scheduled;

/// Ordered collection of pending items, smallest position first
///
/// Ties between equal positions may be resolved in any order.
pub trait Queue<E>: Send + 'static {
    /// Insert an item
    fn insert(&mut self, item: E);

    /// Borrow the item with the smallest position without removing it
    fn peek_min(&self) -> Option<&E>;

    /// Remove and return the item with the smallest position
    ///
    /// Returns `None` only when the queue is empty.
    fn remove_min(&mut self) -> Option<E>;

    /// Number of stored items
    fn len(&self) -> usize;

    /// Check if the queue is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Binary min-heap of scheduled items
///
/// Insert and remove are O(log n), peek is O(1).
#[derive(Debug, Clone)]
pub struct PriorityQueue<E> {
    heap: Vec<E>,
}

impl<E: Scheduled> PriorityQueue<E> {
    /// Create an empty queue
    #[must_use]
    pub fn new() -> Self {
        Self { heap: Vec::new() }
    }

    /// Create an empty queue with room for `capacity` items
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: Vec::with_capacity(capacity),
        }
    }

    /// Remove every item
    pub fn clear(&mut self) {
        self.heap.clear();
    }

    /// Remove every item, in no particular order
    pub fn drain(&mut self) -> std::vec::Drain<'_, E> {
        self.heap.drain(..)
    }

    /// Consume the queue, returning its items ordered by position
    pub fn into_sorted_vec(self) -> Vec<E> {
        let mut items = self.heap;
        items.sort_by_key(|item| item.position());
        items
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.heap[index].position() >= self.heap[parent].position() {
                break;
            }
            self.heap.swap(index, parent);
            index = parent;
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * index + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let smallest = if right < len
                && self.heap[right].position() < self.heap[left].position()
            {
                right
            } else {
                left
            };
            if self.heap[index].position() <= self.heap[smallest].position() {
                break;
            }
            self.heap.swap(index, smallest);
            index = smallest;
        }
    }
}

impl<E: Scheduled> Default for PriorityQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Scheduled + Send + 'static> Queue<E> for PriorityQueue<E> {
    fn insert(&mut self, item: E) {
        self.heap.push(item);
        self.sift_up(self.heap.len() - 1);
    }

    fn peek_min(&self) -> Option<&E> {
        self.heap.first()
    }

    fn remove_min(&mut self) -> Option<E> {
        if self.heap.is_empty() {
            return None;
        }
        let min = self.heap.swap_remove(0);
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        Some(min)
    }

    fn len(&self) -> usize {
        self.heap.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Position;
    use crate::entry::Entry;

    fn queue_of(positions: &[i64]) -> PriorityQueue<Entry<i64>> {
        let mut queue = PriorityQueue::new();
        for &position in positions {
            queue.insert(Entry::new(Position(position), position));
        }
        queue
    }

    #[test]
    fn test_empty_queue() {
        let mut queue: PriorityQueue<Entry<()>> = PriorityQueue::new();
        assert!(queue.is_empty());
        assert!(queue.peek_min().is_none());
        assert!(queue.remove_min().is_none());
    }

    #[test]
    fn test_peek_returns_minimum() {
        let mut queue = PriorityQueue::new();
        queue.insert(Entry::new(Position(1000), "First"));
        queue.insert(Entry::new(Position(200), "Second"));

        let min = queue.peek_min().unwrap();
        assert_eq!(min.position(), Position(200));
        assert_eq!(*min.payload(), "Second");
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_remove_min_returns_minimum() {
        let mut queue = PriorityQueue::new();
        queue.insert(Entry::new(Position(1000), "First"));
        queue.insert(Entry::new(Position(200), "Second"));

        let min = queue.remove_min().unwrap();
        assert_eq!(*min.payload(), "Second");
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.peek_min().unwrap().position(), Position(1000));
    }

    #[test]
    fn test_removal_order_is_sorted() {
        let mut queue = queue_of(&[50, 7, 300, 7, -2, 99, 1, 42, 300, 0, 18]);

        let mut removed = Vec::new();
        while let Some(entry) = queue.remove_min() {
            removed.push(entry.into_payload());
        }
        assert_eq!(removed, vec![-2, 0, 1, 7, 7, 18, 42, 50, 99, 300, 300]);
    }

    #[test]
    fn test_interleaved_insert_and_remove() {
        let mut queue = queue_of(&[40, 10, 30]);
        assert_eq!(queue.remove_min().unwrap().into_payload(), 10);

        queue.insert(Entry::new(Position(5), 5));
        queue.insert(Entry::new(Position(35), 35));
        assert_eq!(queue.remove_min().unwrap().into_payload(), 5);
        assert_eq!(queue.remove_min().unwrap().into_payload(), 30);
        assert_eq!(queue.remove_min().unwrap().into_payload(), 35);
        assert_eq!(queue.remove_min().unwrap().into_payload(), 40);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_into_sorted_vec_and_drain() {
        let queue = queue_of(&[3, 1, 2]);
        let sorted: Vec<i64> = queue
            .into_sorted_vec()
            .into_iter()
            .map(Entry::into_payload)
            .collect();
        assert_eq!(sorted, vec![1, 2, 3]);

        let mut queue = queue_of(&[3, 1, 2]);
        assert_eq!(queue.drain().count(), 3);
        assert!(queue.is_empty());
    }
}
