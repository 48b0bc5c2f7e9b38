//! No-progress detection for movement leaves.
//!
//! Tracks displacement over game time; when the agent has not moved a
//! minimum distance for the configured window, the leaf treats itself as
//! stuck and switches to a local recovery subtask (wander, shimmy)
//! before retrying.

use crate::agent::types::Vec3;
use crate::agent::Agent;
use crate::config;

#[derive(Debug, Clone)]
pub struct ProgressChecker {
    min_displacement: f64,
    timeout_ticks: u64,
    anchor: Option<(Vec3, u64)>,
}

impl ProgressChecker {
    pub fn new(min_displacement: f64, timeout_ticks: u64) -> Self {
        Self {
            min_displacement,
            timeout_ticks,
            anchor: None,
        }
    }

    /// Defaults from `config`.
    pub fn for_movement() -> Self {
        Self::new(config::STUCK_MIN_DISPLACEMENT, config::STUCK_TIMEOUT_TICKS)
    }

    /// Sample the agent's position; call once per tick while moving.
    pub fn update(&mut self, agent: &dyn Agent) {
        let pos = agent.position();
        let now = agent.game_ticks();
        match self.anchor {
            Some((at, _)) if pos.distance_to(at) < self.min_displacement => {}
            _ => self.anchor = Some((pos, now)),
        }
    }

    /// True when no minimum displacement happened for the whole window.
    pub fn failed(&self, agent: &dyn Agent) -> bool {
        match self.anchor {
            None => false,
            Some((_, since)) => agent.game_ticks().saturating_sub(since) >= self.timeout_ticks,
        }
    }

    pub fn reset(&mut self) {
        self.anchor = None;
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
