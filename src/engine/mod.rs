//! The search engine as seen from the gate.
//!
//! The engine is an opaque, single-instance, asynchronous collaborator: the
//! gate configures it, starts a search, and learns about the result through
//! callbacks fired on a thread the engine chooses. [`Engine`] captures that
//! capability set; [`uci::UciEngine`] implements it over the UCI protocol.

use std::fmt;
use std::sync::Arc;

use crate::error::EngineError;

pub mod options;
pub mod protocol;
pub mod uci;

pub use options::{EngineOption, OptionKind, OptionsMap};
pub use protocol::{EngineCommand, EngineMessage, SearchInfo};
pub use uci::UciEngine;

/// Token engines send instead of a move when the side to move has none
pub const NO_MOVE_TOKEN: &str = "(none)";
/// Null move, sent by some engines in place of [`NO_MOVE_TOKEN`]
pub const NULL_MOVE_TOKEN: &str = "0000";

/// Called once per search with `(best move, ponder move)`
pub type BestMoveCallback = Arc<dyn Fn(&str, Option<&str>) + Send + Sync>;

/// Called with intermediate search progress
pub type InfoCallback = Arc<dyn Fn(&SearchInfo) + Send + Sync>;

/// Inert bestmove callback.
#[must_use]
pub fn noop_bestmove() -> BestMoveCallback {
    Arc::new(|_, _| {})
}

/// Inert progress callback.
#[must_use]
pub fn noop_info() -> InfoCallback {
    Arc::new(|_| {})
}

/// Whether a reported move is one of the "no move" tokens
#[inline]
#[must_use]
pub fn is_no_move(mv: &str) -> bool {
    mv.is_empty() || mv == NO_MOVE_TOKEN || mv == NULL_MOVE_TOKEN
}

/// Limits for a single search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    /// Time to think in milliseconds (soft deadline)
    pub movetime_ms: u64,
}

impl SearchLimits {
    /// Limits for a fixed-time search
    #[must_use]
    pub fn movetime(ms: u64) -> Self {
        SearchLimits { movetime_ms: ms }
    }
}

impl fmt::Display for SearchLimits {
    /// Renders the arguments of a `go` command.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "movetime {}", self.movetime_ms)
    }
}

/// A single engine instance.
///
/// Not reentrant: callers serialize access (the gate holds it behind a
/// mutex). Callbacks may fire on any thread, so they must be `Send + Sync`.
pub trait Engine: Send {
    /// Options the engine declared at startup
    fn options(&self) -> &OptionsMap;

    /// Set a declared option, validating `value` against its declaration
    fn set_option(&mut self, name: &str, value: &str) -> Result<(), EngineError>;

    /// Set the root position (`startpos` or a FEN) plus moves played from it
    fn set_position(&mut self, position: &str, moves: &[String]) -> Result<(), EngineError>;

    /// Start searching; returns as soon as the search is running
    fn go(&mut self, limits: &SearchLimits) -> Result<(), EngineError>;

    /// Ask a running search to finish (no-op when idle)
    fn stop(&mut self);

    /// Block until no search is running
    fn wait_for_search_finished(&mut self);

    /// Replace the bestmove callback
    fn set_on_bestmove(&mut self, callback: BestMoveCallback);

    /// Replace the progress callback
    fn set_on_info(&mut self, callback: InfoCallback);

    /// Check if a search is running
    fn is_searching(&self) -> bool;
}
