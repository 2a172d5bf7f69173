//! Time-sliced draining
//!
//! One slice pops and handles buffered items until the wall-clock budget
//! is spent or the buffer is empty, then returns so the caller can yield.
//! Every slice handles at least one item.

use std::time::{Duration, Instant};

use crate::buffer::IngressBuffer;

#[derive(Debug, Clone, PartialEq)]
pub struct DrainConfig {
    /// Wall-clock work allowed per slice.
    pub slice_budget: Duration,
}

impl Default for DrainConfig {
    fn default() -> Self {
        Self {
            slice_budget: Duration::from_millis(8),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceReport {
    pub processed: usize,
    pub remaining: usize,
    pub elapsed: Duration,
}

impl SliceReport {
    /// The slice stopped on budget rather than on an empty buffer.
    pub fn yielded_early(&self) -> bool {
        self.remaining > 0
    }
}

pub fn drain_slice<T, F>(buffer: &mut IngressBuffer<T>, budget: Duration, mut handle: F) -> SliceReport
where
    F: FnMut(T),
{
    let started = Instant::now();
    let mut processed = 0;

    while let Some(item) = buffer.pop_front() {
        handle(item);
        processed += 1;
        if started.elapsed() >= budget {
            break;
        }
    }

    SliceReport {
        processed,
        remaining: buffer.len(),
        elapsed: started.elapsed(),
    }
}
