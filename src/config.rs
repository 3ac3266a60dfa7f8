//! Configuration for launching the engine and for the request gate.
//!
//! Both structs have conservative defaults and can be overridden from
//! `BESTMOVE_*` environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Program launched when `BESTMOVE_ENGINE` is not set
pub const DEFAULT_ENGINE_PROGRAM: &str = "stockfish";
pub const DEFAULT_HANDSHAKE_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_STOP_TIMEOUT_MS: u64 = 2_000;

/// Floor applied to the caller's time budget
pub const DEFAULT_MIN_MOVE_TIME_MS: u64 = 25;
/// Extra wait on top of the time budget before declaring a timeout
pub const DEFAULT_GRACE_MS: u64 = 500;

/// How to start and talk to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Engine executable (looked up on `PATH` when not absolute)
    pub program: PathBuf,
    /// Extra command-line arguments
    pub args: Vec<String>,
    /// Bound on each handshake step (`uciok`, `readyok`)
    pub handshake_timeout_ms: u64,
    /// Bound on waiting for the engine to go idle
    pub stop_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            program: PathBuf::from(DEFAULT_ENGINE_PROGRAM),
            args: Vec::new(),
            handshake_timeout_ms: DEFAULT_HANDSHAKE_TIMEOUT_MS,
            stop_timeout_ms: DEFAULT_STOP_TIMEOUT_MS,
        }
    }
}

impl EngineConfig {
    /// Build from `BESTMOVE_ENGINE`, `BESTMOVE_ENGINE_ARGS`,
    /// `BESTMOVE_HANDSHAKE_TIMEOUT_MS` and `BESTMOVE_STOP_TIMEOUT_MS`.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = EngineConfig::default();
        if let Some(program) = env::var_os("BESTMOVE_ENGINE").filter(|p| !p.is_empty()) {
            config.program = PathBuf::from(program);
        }
        if let Ok(args) = env::var("BESTMOVE_ENGINE_ARGS") {
            config.args = args.split_whitespace().map(str::to_string).collect();
        }
        if let Some(ms) = env_number("BESTMOVE_HANDSHAKE_TIMEOUT_MS") {
            config.handshake_timeout_ms = ms;
        }
        if let Some(ms) = env_number("BESTMOVE_STOP_TIMEOUT_MS") {
            config.stop_timeout_ms = ms;
        }
        config
    }
}

/// Request gate policy
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GateConfig {
    /// Smallest time budget handed to the engine
    pub min_move_time_ms: u64,
    /// Added to the time budget to form the hard wait ceiling
    pub grace_ms: u64,
    /// Callers allowed inside the gate at once (`None` = unbounded)
    pub max_pending: Option<usize>,
}

impl Default for GateConfig {
    fn default() -> Self {
        GateConfig {
            min_move_time_ms: DEFAULT_MIN_MOVE_TIME_MS,
            grace_ms: DEFAULT_GRACE_MS,
            max_pending: None,
        }
    }
}

impl GateConfig {
    /// Build from `BESTMOVE_MIN_MOVE_TIME_MS`, `BESTMOVE_GRACE_MS` and
    /// `BESTMOVE_MAX_PENDING`.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = GateConfig::default();
        if let Some(ms) = env_number("BESTMOVE_MIN_MOVE_TIME_MS") {
            config.min_move_time_ms = ms;
        }
        if let Some(ms) = env_number("BESTMOVE_GRACE_MS") {
            config.grace_ms = ms;
        }
        if let Some(limit) = env_number::<usize>("BESTMOVE_MAX_PENDING") {
            config.max_pending = Some(limit.max(1));
        }
        config
    }

    /// Time floor, never zero.
    #[inline]
    #[must_use]
    pub fn move_time_floor_ms(&self) -> u64 {
        self.min_move_time_ms.max(1)
    }

    /// Grace period, never zero, so the ceiling stays above the soft deadline.
    #[inline]
    #[must_use]
    pub fn effective_grace_ms(&self) -> u64 {
        self.grace_ms.max(1)
    }
}

fn env_number<T: FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("ignoring {key}={raw:?}: not a number");
            None
        }
    }
}
