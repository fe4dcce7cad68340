//! Single-shot debounce timers.

use std::mem;
use std::time::Duration;

use tokio::time::Instant;

/// Collects items and fires once the input has been quiet for `delay`.
///
/// Every push restarts the timer, so only the last timer of a burst fires.
/// The timer is passive: the owner asks for the deadline and polls it.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    deadline: Option<Instant>,
    pending: Vec<T>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
            pending: Vec::new(),
        }
    }

    /// Queue an item and restart the timer.
    pub fn push(&mut self, item: T, now: Instant) {
        self.pending.push(item);
        self.deadline = Some(now + self.delay);
    }

    /// Queue several items and restart the timer once.
    pub fn extend(&mut self, items: impl IntoIterator<Item = T>, now: Instant) {
        self.pending.extend(items);
        self.deadline = Some(now + self.delay);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Fire if the deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> Option<Vec<T>> {
        if self.is_due(now) { self.flush() } else { None }
    }

    /// Fire now, regardless of the deadline. `None` when not armed.
    pub fn flush(&mut self) -> Option<Vec<T>> {
        self.deadline.take()?;
        Some(mem::take(&mut self.pending))
    }

    /// Change the quiet period. An armed timer keeps its current deadline.
    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }
}
