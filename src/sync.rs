//! Synchronization primitives for the request gate.
//!
//! Provides the hand-off between an engine callback thread and a caller
//! blocked with a deadline.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Deadline `timeout` from now, or `None` when it lies beyond what
/// `Instant` can represent (wait without a deadline).
#[inline]
#[must_use]
pub fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

struct Slot<T> {
    value: Mutex<Option<T>>,
    ready: Condvar,
}

/// A one-shot, thread-safe result slot.
///
/// One side calls [`Completion::complete`] (typically from an engine
/// callback), the other waits with a deadline. Only the first value is kept.
pub struct Completion<T>(Arc<Slot<T>>);

impl<T> Completion<T> {
    /// Create an empty completion.
    #[must_use]
    pub fn new() -> Self {
        Completion(Arc::new(Slot {
            value: Mutex::new(None),
            ready: Condvar::new(),
        }))
    }

    /// Store `value` and wake the waiter.
    ///
    /// Returns `false` (and drops `value`) if a value was already stored.
    pub fn complete(&self, value: T) -> bool {
        {
            let mut slot = self.0.value.lock();
            if slot.is_some() {
                return false;
            }
            *slot = Some(value);
        }
        self.0.ready.notify_all();
        true
    }

    /// Block until a value is stored or `timeout` elapses.
    ///
    /// Returns whether a value is present.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = deadline_after(timeout);
        let mut slot = self.0.value.lock();
        while slot.is_none() {
            match deadline {
                Some(deadline) => {
                    if self.0.ready.wait_until(&mut slot, deadline).timed_out() {
                        break;
                    }
                }
                None => self.0.ready.wait(&mut slot),
            }
        }
        slot.is_some()
    }

    /// Check if a value has been stored.
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.0.value.lock().is_some()
    }

    /// Take the stored value, leaving the slot empty.
    pub fn take(&self) -> Option<T> {
        self.0.value.lock().take()
    }
}

impl<T> Clone for Completion<T> {
    fn clone(&self) -> Self {
        Completion(Arc::clone(&self.0))
    }
}

impl<T> Default for Completion<T> {
    fn default() -> Self {
        Self::new()
    }
}
