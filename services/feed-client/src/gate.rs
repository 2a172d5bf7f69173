//! Readiness gate
//!
//! Unbounded FIFO in front of the bounded buffer. While closed it holds
//! every raw frame; opening it hands back everything held, in arrival
//! order, before any live frame gets through.

use std::collections::VecDeque;

#[derive(Debug)]
pub struct ReadinessGate<T> {
    ready: bool,
    pending: VecDeque<T>,
}

impl<T> ReadinessGate<T> {
    /// A closed gate.
    pub fn new() -> Self {
        Self {
            ready: false,
            pending: VecDeque::new(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Pass `item` through if open, otherwise hold it.
    pub fn admit(&mut self, item: T) -> Option<T> {
        if self.ready {
            Some(item)
        } else {
            self.pending.push_back(item);
            None
        }
    }

    /// Open the gate and take everything held so far.
    pub fn open(&mut self) -> VecDeque<T> {
        self.ready = true;
        std::mem::take(&mut self.pending)
    }

    /// Close the gate and discard anything held.
    pub fn close(&mut self) {
        self.ready = false;
        self.pending.clear();
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl<T> Default for ReadinessGate<T> {
    fn default() -> Self {
        Self::new()
    }
}
