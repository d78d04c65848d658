// src/monitor/history.rs
use std::collections::VecDeque;

/// Fixed-capacity FIFO. Once full, every push evicts the oldest entry in O(1).
#[derive(Clone, Debug)]
pub struct BoundedHistory<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedHistory<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `value`, returning the evicted oldest entry if the history was full.
    pub fn push(&mut self, value: T) -> Option<T> {
        let evicted = if self.items.len() == self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(value);
        evicted
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Position 0 is the oldest live entry.
    pub fn get(&self, position: usize) -> Option<&T> {
        self.items.get(position)
    }

    pub fn first(&self) -> Option<&T> {
        self.items.front()
    }

    pub fn last(&self) -> Option<&T> {
        self.items.back()
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator + '_ {
        self.items.iter()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Removes and yields every entry, oldest first.
    pub fn drain(&mut self) -> std::collections::vec_deque::Drain<'_, T> {
        self.items.drain(..)
    }
}

impl<T: Clone> BoundedHistory<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn evicts_oldest_once_full() {
        let mut history = BoundedHistory::new(3);
        assert_eq!(history.push(1), None);
        assert_eq!(history.push(2), None);
        assert_eq!(history.push(3), None);
        assert!(history.is_full());
        assert_eq!(history.push(4), Some(1));
        assert_eq!(history.to_vec(), vec![2, 3, 4]);
        assert_eq!(history.first(), Some(&2));
        assert_eq!(history.last(), Some(&4));
        assert_eq!(history.len(), 3);
    }
    #[test]
    fn zero_capacity_is_promoted_to_one() {
        let mut history = BoundedHistory::new(0);
        history.push("a");
        assert_eq!(history.push("b"), Some("a"));
        assert_eq!(history.capacity(), 1);
    }
    #[test]
    fn clear_keeps_capacity() {
        let mut history = BoundedHistory::new(2);
        history.push(1.0);
        history.push(2.0);
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.capacity(), 2);
        assert_eq!(history.get(0), None);
    }
}
