//! Request gate: one blocking, time-bounded call per engine search.
//!
//! Callers from any thread are serialized on the shared engine. Each request
//! configures the engine, registers a callback closing over request-local
//! state, starts a search with the caller's budget as a soft deadline, and
//! waits for the callback up to a hard ceiling (budget + grace). Whatever
//! happens, the engine is stopped, awaited, and its callback reset before
//! the next caller gets it.

mod admission;
pub mod output;
pub mod request;
mod search;

use crate::config::{EngineConfig, GateConfig};
use crate::engine::{is_no_move, Engine, SearchLimits};
use crate::error::{EngineError, GateError};
use crate::lifecycle::EngineCell;
use crate::sync::Completion;

use admission::Admission;
use search::ActiveSearch;

pub use output::{write_terminated, MIN_OUTPUT_CAPACITY};
pub use request::{clamp_move_time, clamp_skill_level, MoveRequest, MAX_SKILL_LEVEL, MIN_SKILL_LEVEL};
pub use search::BestMove;

/// Engine option carrying the skill level
pub const SKILL_LEVEL_OPTION: &str = "Skill Level";

/// Serializes move requests against one lazily constructed engine
pub struct RequestGate {
    cell: EngineCell,
    config: GateConfig,
    admission: Admission,
}

impl RequestGate {
    #[must_use]
    pub fn new(cell: EngineCell, config: GateConfig) -> Self {
        RequestGate {
            admission: Admission::new(config.max_pending),
            cell,
            config,
        }
    }

    /// Gate over an external UCI engine configured from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(EngineCell::uci(EngineConfig::from_env()), GateConfig::from_env())
    }

    #[must_use]
    pub fn engine_cell(&self) -> &EngineCell {
        &self.cell
    }

    #[must_use]
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Initialize the engine if needed and report whether it is usable.
    pub fn is_available(&self) -> bool {
        self.cell.ensure_initialized().is_usable()
    }

    /// Callers currently waiting for or holding the engine
    #[must_use]
    pub fn pending(&self) -> usize {
        self.admission.pending()
    }

    /// Search `position` and return the engine's move.
    ///
    /// `skill_level` is clamped to `0..=20`; `move_time_ms` is raised to the
    /// configured floor. Blocks for at most the time budget plus the grace
    /// period, then for however long the engine takes to acknowledge `stop`.
    pub fn best_move(
        &self,
        position: &str,
        skill_level: i32,
        move_time_ms: i32,
    ) -> Result<BestMove, GateError> {
        let request = MoveRequest::new(position, skill_level, move_time_ms, &self.config)?;
        self.search(&request)
    }

    /// Boundary form of [`RequestGate::best_move`].
    ///
    /// On success writes the move and a NUL terminator into `out` and
    /// returns `true`. On any failure returns `false` and leaves `out`
    /// byte-for-byte unchanged.
    pub fn compute_best_move(
        &self,
        position: &str,
        skill_level: i32,
        move_time_ms: i32,
        out: &mut [u8],
    ) -> bool {
        match self.compute_into(position, skill_level, move_time_ms, out) {
            Ok(_) => true,
            Err(e) => {
                log_failure(&e);
                false
            }
        }
    }

    fn compute_into(
        &self,
        position: &str,
        skill_level: i32,
        move_time_ms: i32,
        out: &mut [u8],
    ) -> Result<usize, GateError> {
        if out.len() < MIN_OUTPUT_CAPACITY {
            return Err(GateError::BufferTooSmall {
                capacity: out.len(),
                required: MIN_OUTPUT_CAPACITY,
            });
        }
        let best = self.best_move(position, skill_level, move_time_ms)?;
        write_terminated(&best.mv, out)
    }

    fn search(&self, request: &MoveRequest<'_>) -> Result<BestMove, GateError> {
        let shared = self.cell.engine().ok_or(GateError::Unavailable)?;
        let _ticket = self.admission.enter()?;
        let mut engine = shared.lock();
        run_search(&mut **engine, request)
    }
}

/// Drive one request on an engine the caller holds exclusively.
fn run_search(engine: &mut dyn Engine, request: &MoveRequest<'_>) -> Result<BestMove, GateError> {
    engine.wait_for_search_finished();
    apply_skill_level(engine, request.skill_level)?;

    let completion = Completion::new();
    {
        let mut search = ActiveSearch::begin(engine, &completion);
        search.set_position(request.position, &[])?;
        search.go(&SearchLimits::movetime(request.move_time_ms))?;
        if !completion.wait_timeout(request.wait_ceiling()) {
            log::warn!(
                "no bestmove within {} ms; stopping the engine",
                request.wait_ceiling_ms
            );
        }
    }

    // Read after cleanup: a move delivered while the engine was stopping counts.
    let best = completion.take().ok_or(GateError::Timeout {
        waited_ms: request.wait_ceiling_ms,
    })?;
    if is_no_move(&best.mv) {
        return Err(GateError::NoMove { reported: best.mv });
    }
    Ok(best)
}

fn apply_skill_level(engine: &mut dyn Engine, skill_level: i32) -> Result<(), GateError> {
    match engine.set_option(SKILL_LEVEL_OPTION, &skill_level.to_string()) {
        Ok(()) => Ok(()),
        Err(EngineError::UnknownOption { .. }) => {
            log::warn!("engine has no '{SKILL_LEVEL_OPTION}' option; searching at full strength");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn log_failure(e: &GateError) {
    match e {
        GateError::EmptyPosition | GateError::BufferTooSmall { .. } | GateError::NoMove { .. } => {
            log::debug!("no move: {e}");
        }
        _ => log::warn!("no move: {e}"),
    }
}
