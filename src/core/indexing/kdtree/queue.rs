// src/core/indexing/kdtree/queue.rs

use crate::core::common::OxiclusterError;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Heap entry, ordered by priority and then by item, so among equal
/// priorities the greatest item is the first to be evicted.
#[derive(Debug)]
struct Entry<T> {
    priority: f32,
    item: T,
}

impl<T: Ord> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T: Ord> Eq for Entry<T> {}

impl<T: Ord> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Ord> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .total_cmp(&other.priority)
            .then_with(|| self.item.cmp(&other.item))
    }
}

/// Keeps the `capacity` items with the smallest `(priority, item)` seen so
/// far, so ties on priority are settled by the item's own order.
///
/// Backed by a max-heap, so the worst retained item is always at the top and
/// can be compared against new candidates in constant time.
#[derive(Debug)]
pub struct BoundedPriorityQueue<T: Ord> {
    capacity: usize,
    heap: BinaryHeap<Entry<T>>,
}

impl<T: Ord> BoundedPriorityQueue<T> {
    /// # Errors
    ///
    /// `InvalidArgument` if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, OxiclusterError> {
        if capacity == 0 {
            return Err(OxiclusterError::invalid_argument("queue capacity must be positive"));
        }
        Ok(Self { capacity, heap: BinaryHeap::with_capacity(capacity + 1) })
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.heap.len() >= self.capacity
    }

    /// Largest priority currently retained.
    pub fn worst(&self) -> Option<f32> {
        self.heap.peek().map(|entry| entry.priority)
    }

    /// Offers an item. It is kept if the queue has room or if it sorts
    /// before the current worst item, which is then dropped. Returns whether
    /// it was kept.
    pub fn push(&mut self, item: T, priority: f32) -> bool {
        let entry = Entry { priority, item };
        if self.is_full() {
            match self.heap.peek() {
                Some(worst) if entry < *worst => {
                    self.heap.pop();
                }
                _ => return false,
            }
        }
        self.heap.push(entry);
        true
    }

    /// Consumes the queue, returning `(item, priority)` by ascending priority.
    pub fn into_sorted_vec(self) -> Vec<(T, f32)> {
        self.heap.into_sorted_vec().into_iter().map(|entry| (entry.item, entry.priority)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(
            BoundedPriorityQueue::<u32>::new(0),
            Err(OxiclusterError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_keeps_smallest() {
        let mut queue = BoundedPriorityQueue::new(3).unwrap();
        for (item, priority) in [("a", 5.0), ("b", 1.0), ("c", 4.0), ("d", 2.0), ("e", 9.0)] {
            queue.push(item, priority);
        }
        assert!(queue.is_full());
        assert_eq!(queue.worst(), Some(4.0));

        let items: Vec<_> = queue.into_sorted_vec().into_iter().map(|(item, _)| item).collect();
        assert_eq!(items, vec!["b", "d", "c"]);
    }

    #[test]
    fn test_rejects_ties_when_full() {
        let mut queue = BoundedPriorityQueue::new(2).unwrap();
        assert!(queue.push(1, 1.0));
        assert!(queue.push(2, 2.0));
        assert!(!queue.push(3, 2.0));
        assert!(!queue.push(4, 3.0));
        assert!(queue.push(5, 0.5));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.worst(), Some(1.0));
    }

    #[test]
    fn test_equal_priority_keeps_smaller_items() {
        let mut queue = BoundedPriorityQueue::new(2).unwrap();
        assert!(queue.push(7, 1.0));
        assert!(queue.push(9, 1.0));
        assert!(queue.push(3, 1.0));
        assert!(!queue.push(8, 1.0));
        assert!(queue.push(5, 1.0));

        let items: Vec<_> = queue.into_sorted_vec().into_iter().map(|(item, _)| item).collect();
        assert_eq!(items, vec![3, 5]);
    }

    #[test]
    fn test_empty_queue() {
        let queue: BoundedPriorityQueue<u8> = BoundedPriorityQueue::new(4).unwrap();
        assert!(queue.is_empty());
        assert!(!queue.is_full());
        assert_eq!(queue.worst(), None);
        assert_eq!(queue.capacity(), 4);
    }
}
