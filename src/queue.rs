//! Bounded FIFO queue for passing items between tasks.
//!
//! Fixed capacity, no allocation. A push onto a full queue is dropped: the
//! caller gets no indication beyond a warning in the log, and the items
//! already queued are left untouched. Producers that cannot afford to lose
//! data should check [`BoundedQueue::is_full`] first.
//!
//! The queue is not synchronized on its own. Tasks share it through a
//! `critical_section::Mutex<RefCell<BoundedQueue<T>>>`.

use log::warn;

use crate::config::QUEUE_CAPACITY;

/// Circular FIFO with capacity `N`.
pub struct BoundedQueue<T, const N: usize = QUEUE_CAPACITY> {
    items: [Option<T>; N],
    front: usize,
    rear: usize,
    size: usize,
}

impl<T, const N: usize> BoundedQueue<T, N> {
    pub const fn new() -> Self {
        Self {
            items: [const { None }; N],
            front: 0,
            rear: 0,
            size: 0,
        }
    }

    /// Append `item` at the rear. Dropped if the queue is full.
    pub fn push(&mut self, item: T) {
        if self.size >= N {
            warn!("queue: full ({}), item dropped", N);
            return;
        }

        self.items[self.rear] = Some(item);
        self.rear = (self.rear + 1) % N;
        self.size += 1;
    }

    /// Remove the item at the front, or `None` when empty.
    pub fn pop(&mut self) -> Option<T> {
        if self.size == 0 {
            return None;
        }

        let item = self.items[self.front].take();
        self.front = (self.front + 1) % N;
        self.size -= 1;
        item
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.size == N
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        N
    }
}

impl<T, const N: usize> Default for BoundedQueue<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut queue: BoundedQueue<u32> = BoundedQueue::new();
        for i in 0..5 {
            queue.push(i);
        }
        assert_eq!(queue.len(), 5);
        for i in 0..5 {
            assert_eq!(queue.pop(), Some(i));
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_pop_empty() {
        let mut queue: BoundedQueue<u32> = BoundedQueue::new();
        assert_eq!(queue.pop(), None);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_push_when_full_is_dropped() {
        let mut queue: BoundedQueue<u32> = BoundedQueue::new();
        for i in 0..QUEUE_CAPACITY as u32 {
            queue.push(i);
        }
        assert!(queue.is_full());

        queue.push(99);
        assert_eq!(queue.len(), QUEUE_CAPACITY);

        for i in 0..QUEUE_CAPACITY as u32 {
            assert_eq!(queue.pop(), Some(i));
        }
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_wraparound() {
        let mut queue = BoundedQueue::<u32, 4>::new();
        for round in 0..5 {
            for i in 0..3 {
                queue.push(round * 10 + i);
            }
            for i in 0..3 {
                assert_eq!(queue.pop(), Some(round * 10 + i));
            }
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_size_stays_in_bounds_under_mixed_ops() {
        let mut queue = BoundedQueue::<u32, 3>::new();
        let mut expected = 0u32;
        let mut next = 0u32;

        // Three pushes then one pop, repeatedly: the queue saturates and
        // drops, but what comes out is always in push order.
        for _ in 0..10 {
            for _ in 0..3 {
                queue.push(next);
                next += 1;
                assert!(queue.len() <= queue.capacity());
            }
            let item = queue.pop().unwrap();
            assert!(item >= expected);
            expected = item + 1;
        }
    }

    #[test]
    fn test_array_items() {
        let mut queue = BoundedQueue::<[u8; 4], 2>::new();
        queue.push(*b"ping");
        queue.push(*b"pong");
        assert_eq!(queue.pop(), Some(*b"ping"));
        assert_eq!(queue.pop(), Some(*b"pong"));
    }
}
