// src/events/queue.rs

use std::collections::VecDeque;

use tracing::warn;

/// FIFO of matched events waiting for dispatch.
///
/// With a limit set, pushing onto a full queue drops the oldest entry so a
/// chatty source cannot grow a suspended thread's queue without bound.
#[derive(Debug)]
pub struct EventQueue<T> {
    entries: VecDeque<T>,
    limit: Option<usize>,
    dropped: u64,
}

impl<T> EventQueue<T> {
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            entries: VecDeque::new(),
            limit: limit.map(|l| l.max(1)),
            dropped: 0,
        }
    }

    pub fn push(&mut self, entry: T) {
        if let Some(limit) = self.limit {
            while self.entries.len() >= limit {
                self.entries.pop_front();
                self.dropped += 1;
                warn!(limit, dropped = self.dropped, "event queue full; dropped oldest entry");
            }
        }
        self.entries.push_back(entry);
    }

    pub fn pop(&mut self) -> Option<T> {
        self.entries.pop_front()
    }

    pub fn retain(&mut self, keep: impl FnMut(&T) -> bool) {
        self.entries.retain(keep);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total entries discarded because of the limit.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::new(None)
    }
}
