//! Caller input, validated and clamped before any shared state is touched.

use std::time::Duration;

use crate::config::GateConfig;
use crate::error::GateError;

pub const MIN_SKILL_LEVEL: i32 = 0;
pub const MAX_SKILL_LEVEL: i32 = 20;

/// Clamp a skill level into the engine's accepted range.
#[inline]
#[must_use]
pub fn clamp_skill_level(skill_level: i32) -> i32 {
    skill_level.clamp(MIN_SKILL_LEVEL, MAX_SKILL_LEVEL)
}

/// Raise a time budget to the configured floor.
#[inline]
#[must_use]
pub fn clamp_move_time(move_time_ms: i32, floor_ms: u64) -> u64 {
    u64::try_from(move_time_ms).unwrap_or(0).max(floor_ms)
}

/// One caller's move request after validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRequest<'a> {
    pub position: &'a str,
    pub skill_level: i32,
    /// Soft deadline handed to the engine
    pub move_time_ms: u64,
    /// Soft deadline plus grace: how long the caller may block
    pub wait_ceiling_ms: u64,
}

impl<'a> MoveRequest<'a> {
    pub fn new(
        position: &'a str,
        skill_level: i32,
        move_time_ms: i32,
        config: &GateConfig,
    ) -> Result<Self, GateError> {
        if position.is_empty() {
            return Err(GateError::EmptyPosition);
        }
        let move_time_ms = clamp_move_time(move_time_ms, config.move_time_floor_ms());
        Ok(MoveRequest {
            position,
            skill_level: clamp_skill_level(skill_level),
            move_time_ms,
            wait_ceiling_ms: move_time_ms.saturating_add(config.effective_grace_ms()),
        })
    }

    #[must_use]
    pub fn wait_ceiling(&self) -> Duration {
        Duration::from_millis(self.wait_ceiling_ms)
    }
}
