//! Scoped ownership of one search on the shared engine.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::engine::{noop_bestmove, Engine};
use crate::sync::Completion;

/// The move an engine reported for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestMove {
    pub mv: String,
    pub ponder: Option<String>,
}

/// A registered bestmove callback plus the obligation to clean up.
///
/// Dropping it stops the engine, waits until it is idle, and swaps the
/// request's callback back for a no-op. This runs on every exit path,
/// including `?` returns and unwinding.
pub(crate) struct ActiveSearch<'a> {
    engine: &'a mut dyn Engine,
}

impl<'a> ActiveSearch<'a> {
    /// Route the engine's next bestmove into `completion`.
    pub(crate) fn begin(engine: &'a mut dyn Engine, completion: &Completion<BestMove>) -> Self {
        let sink = completion.clone();
        engine.set_on_bestmove(Arc::new(move |mv: &str, ponder: Option<&str>| {
            sink.complete(BestMove {
                mv: mv.to_string(),
                ponder: ponder.map(str::to_string),
            });
        }));
        ActiveSearch { engine }
    }
}

impl<'a> Deref for ActiveSearch<'a> {
    type Target = dyn Engine + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.engine
    }
}

impl<'a> DerefMut for ActiveSearch<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.engine
    }
}

impl Drop for ActiveSearch<'_> {
    fn drop(&mut self) {
        self.engine.stop();
        self.engine.wait_for_search_finished();
        self.engine.set_on_bestmove(noop_bestmove());
    }
}
