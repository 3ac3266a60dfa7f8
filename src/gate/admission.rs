//! Optional cap on callers inside the gate.
//!
//! Counts callers that are waiting for, or holding, the engine. With no
//! limit the count is still kept so it can be reported.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::GateError;

pub(crate) struct Admission {
    limit: Option<usize>,
    inside: AtomicUsize,
}

/// Held for the lifetime of one request
pub(crate) struct Ticket<'a>(&'a AtomicUsize);

impl Admission {
    pub(crate) fn new(limit: Option<usize>) -> Self {
        Admission {
            limit,
            inside: AtomicUsize::new(0),
        }
    }

    pub(crate) fn enter(&self) -> Result<Ticket<'_>, GateError> {
        let before = self.inside.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = self.limit {
            if before >= limit {
                self.inside.fetch_sub(1, Ordering::SeqCst);
                return Err(GateError::Overloaded { limit });
            }
        }
        Ok(Ticket(&self.inside))
    }

    pub(crate) fn pending(&self) -> usize {
        self.inside.load(Ordering::SeqCst)
    }
}

impl Drop for Ticket<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
