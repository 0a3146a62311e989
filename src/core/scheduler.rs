// src/core/scheduler.rs

use std::collections::VecDeque;

/// Interval between two samples of a running animation, in seconds.
pub const ANIMATION_TICK: f64 = 1.0 / 60.0;

#[derive(Debug, Clone)]
struct Entry<T> {
    due: f64,
    task: T,
}

/// Queue of time-stamped callbacks, advanced explicitly by the frame loop.
///
/// Entries are kept sorted by due time; entries with equal due times run in
/// the order they were scheduled. Nothing runs unless the owner drains it
/// with [`pop_due`](Scheduler::pop_due), so no wall clock is involved.
#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    queue: VecDeque<Entry<T>>,
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Queues `task` to run once the clock reaches `at`.
    pub fn schedule(&mut self, at: f64, task: T) {
        // Insert after every entry due at or before `at` to keep FIFO among ties.
        let idx = self.queue.partition_point(|e| e.due <= at);
        self.queue.insert(idx, Entry { due: at, task });
    }

    /// Removes and returns the earliest task due at or before `now`.
    pub fn pop_due(&mut self, now: f64) -> Option<(f64, T)> {
        match self.queue.front() {
            Some(entry) if entry.due <= now => self.queue.pop_front().map(|e| (e.due, e.task)),
            _ => None,
        }
    }

    /// Keeps only the tasks for which `keep` returns true.
    pub fn retain<F: FnMut(&T) -> bool>(&mut self, mut keep: F) {
        self.queue.retain(|e| keep(&e.task));
    }

    pub fn next_due(&self) -> Option<f64> {
        self.queue.front().map(|e| e.due)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}
