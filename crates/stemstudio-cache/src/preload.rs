//! Bounded queue of keys awaiting background fetch + decode.

use std::collections::VecDeque;

/// Result of offering a key to the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePush {
    Enqueued,
    /// Already waiting in the queue.
    Duplicate,
    /// The queue is at its bound; the newest request is dropped.
    Full,
}

/// Ordered, duplicate-free, bounded sequence of source keys.
#[derive(Debug)]
pub struct PreloadQueue {
    keys: VecDeque<String>,
    capacity: usize,
}

impl PreloadQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            keys: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, key: String) -> QueuePush {
        if self.contains(&key) {
            QueuePush::Duplicate
        } else if self.keys.len() >= self.capacity {
            QueuePush::Full
        } else {
            self.keys.push_back(key);
            QueuePush::Enqueued
        }
    }

    pub fn pop(&mut self) -> Option<String> {
        self.keys.pop_front()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }
}
