//! Bounded message queue
//!
//! A fixed-capacity FIFO shared between a producer context and a single
//! consuming task. Messages are delivered strictly in send order.

use alloc::collections::VecDeque;
use spin::Mutex;

use crate::task::Rtos;
use crate::{HalError, Result};

/// Fixed-capacity FIFO queue.
pub struct BoundedQueue<T> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    /// Create a queue holding at most `capacity` items (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Enqueue without blocking. Gives the item back if the queue is full.
    pub fn try_send(&self, item: T) -> core::result::Result<(), T> {
        let mut items = self.items.lock();
        if items.len() >= self.capacity {
            return Err(item);
        }
        items.push_back(item);
        Ok(())
    }

    /// Enqueue, yielding through `rtos` while the queue is full.
    ///
    /// Gives up with `QueueFull` after `max_attempts` failed attempts.
    pub fn send(&self, mut item: T, rtos: &dyn Rtos, max_attempts: u32) -> Result<()> {
        for _ in 0..max_attempts.max(1) {
            match self.try_send(item) {
                Ok(()) => return Ok(()),
                Err(back) => {
                    item = back;
                    rtos.delay_ms(1);
                }
            }
        }
        Err(HalError::QueueFull)
    }

    /// Dequeue without blocking.
    pub fn try_recv(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    /// Drop every pending item.
    pub fn clear(&self) -> usize {
        let mut items = self.items.lock();
        let n = items.len();
        items.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostRtos;

    #[test]
    fn delivers_in_order() {
        let q = BoundedQueue::new(4);
        q.try_send(1).unwrap();
        q.try_send(2).unwrap();
        q.try_send(3).unwrap();
        assert_eq!(q.try_recv(), Some(1));
        assert_eq!(q.try_recv(), Some(2));
        assert_eq!(q.try_recv(), Some(3));
        assert_eq!(q.try_recv(), None);
    }

    #[test]
    fn full_queue_returns_item() {
        let q = BoundedQueue::new(1);
        q.try_send("a").unwrap();
        assert_eq!(q.try_send("b"), Err("b"));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn blocking_send_gives_up_when_never_drained() {
        let rtos = HostRtos::new();
        let q = BoundedQueue::new(1);
        q.try_send(0).unwrap();
        assert_eq!(q.send(1, &rtos, 3), Err(HalError::QueueFull));
    }

    #[test]
    fn clear_reports_dropped_items() {
        let q = BoundedQueue::new(3);
        q.try_send(1).unwrap();
        q.try_send(2).unwrap();
        assert_eq!(q.clear(), 2);
        assert!(q.is_empty());
    }

    #[test]
    fn zero_capacity_is_rounded_up() {
        let q: BoundedQueue<u8> = BoundedQueue::new(0);
        assert_eq!(q.capacity(), 1);
    }
}
