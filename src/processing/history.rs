// src/processing/history.rs
//! Bounded FIFO history of readings

use std::collections::VecDeque;

/// Fixed-capacity history; pushing beyond capacity evicts the oldest item
#[derive(Debug, Clone)]
pub struct HistoryBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> HistoryBuffer<T> {
    /// A zero capacity is raised to one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an item, returning the evicted one if the buffer was full
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() == self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    /// Items currently held
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// No item held
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Maximum items held
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent item
    pub fn latest(&self) -> Option<&T> {
        self.items.back()
    }

    /// Oldest first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.items.iter()
    }

    /// Drop every item
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T: Clone> HistoryBuffer<T> {
    /// Copy of the history, oldest first
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eviction_keeps_latest() {
        let mut buffer = HistoryBuffer::new(3);
        assert_eq!(buffer.push(1), None);
        buffer.push(2);
        buffer.push(3);
        assert_eq!(buffer.push(4), Some(1));
        assert_eq!(buffer.push(5), Some(2));

        assert_eq!(buffer.to_vec(), vec![3, 4, 5]);
        assert_eq!(buffer.latest(), Some(&5));
        assert_eq!(buffer.len(), buffer.capacity());
    }

    #[test]
    fn test_clear() {
        let mut buffer = HistoryBuffer::new(2);
        buffer.push("a");
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.latest(), None);
    }

    #[test]
    fn test_zero_capacity_raised() {
        let mut buffer = HistoryBuffer::new(0);
        buffer.push(1);
        buffer.push(2);
        assert_eq!(buffer.to_vec(), vec![2]);
    }
}
