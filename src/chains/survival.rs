//! World-hazard survival: fall protection and lava escape.
//!
//! Both leaves declare `overrides_grounded`, which is the whole point:
//! they must be allowed to displace grounded-protected subtasks while
//! the agent is mid-air or burning.

use std::any::Any;

use crate::agent::types::{BlockPos, ControlState, EquipSlot};
use crate::agent::Agent;
use crate::config;
use crate::engine::chain::{Chain, TaskChain, PRIORITY_DANGER, PRIORITY_INACTIVE};
use crate::engine::events::EventBus;
use crate::engine::task::Task;

fn falling_dangerously(agent: &dyn Agent) -> bool {
    !agent.on_ground() && !agent.in_water() && agent.velocity().y < config::FALL_DANGER_SPEED
}

/// Air blocks between the agent's feet and the first non-air block.
fn height_above_ground(agent: &dyn Agent) -> u32 {
    let feet = BlockPos::containing(agent.position());
    for i in 1..=30 {
        let below = feet.offset(0, -i, 0);
        if agent.block_at(below).is_some_and(|b| !b.is_air()) {
            return (i - 1) as u32;
        }
    }
    30
}

// ─── Chain ───────────────────────────────────────────────────────────

pub struct WorldSurvivalChain {
    chain: TaskChain,
}

impl WorldSurvivalChain {
    pub fn new() -> Self {
        Self {
            chain: TaskChain::new("world-survival"),
        }
    }
}

impl Default for WorldSurvivalChain {
    fn default() -> Self {
        Self::new()
    }
}

impl Chain for WorldSurvivalChain {
    fn name(&self) -> &str {
        self.chain.name()
    }

    fn priority(&self, agent: &dyn Agent) -> u32 {
        if agent.in_lava() || falling_dangerously(agent) || self.chain.is_active(agent) {
            PRIORITY_DANGER
        } else {
            PRIORITY_INACTIVE
        }
    }

    fn is_active(&self, agent: &dyn Agent) -> bool {
        self.chain.is_active(agent)
    }

    fn on_tick(&mut self, agent: &mut dyn Agent, events: &mut EventBus) {
        if agent.in_lava() {
            self.chain.set_task(agent, Box::new(EscapeLavaTask::new()));
        } else if falling_dangerously(agent) {
            self.chain.set_task(agent, Box::new(MlgBucketTask::new()));
        }
        self.chain.on_tick(agent, events);
    }

    fn on_interrupt(&mut self, agent: &mut dyn Agent, _winner: Option<&str>) {
        self.chain.stop_current(agent);
    }

    fn current_task_name(&self) -> Option<String> {
        self.chain.current_task_name()
    }
}

// ─── MLG bucket ──────────────────────────────────────────────────────

/// Emergency water-bucket landing: equip, look straight down, click just
/// above the surface. Safe to run mid-air by definition.
pub struct MlgBucketTask {
    failed: bool,
}

impl MlgBucketTask {
    pub fn new() -> Self {
        Self { failed: false }
    }
}

impl Default for MlgBucketTask {
    fn default() -> Self {
        Self::new()
    }
}

impl Task for MlgBucketTask {
    fn display_name(&self) -> String {
        "mlg-bucket".to_string()
    }

    fn on_tick(&mut self, agent: &mut dyn Agent) -> Option<Box<dyn Task>> {
        if agent.in_water() || agent.on_ground() {
            return None;
        }
        if agent.equip("water_bucket", EquipSlot::Hand).is_err() {
            self.failed = true;
            return None;
        }
        agent.look(agent.yaw(), 90.0);
        if height_above_ground(&*agent) <= config::MLG_ACTIVATE_HEIGHT as u32 {
            let _ = agent.activate_item();
        }
        None
    }

    fn is_finished(&self, agent: &dyn Agent) -> bool {
        self.failed || agent.in_water() || agent.on_ground()
    }

    fn is_failed(&self) -> bool {
        self.failed
    }

    fn is_equal(&self, other: &dyn Task) -> bool {
        other.as_any().downcast_ref::<Self>().is_some()
    }

    fn overrides_grounded(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ─── Lava escape ─────────────────────────────────────────────────────

/// Jump-and-swim out of lava toward the nearest standable block.
pub struct EscapeLavaTask;

impl EscapeLavaTask {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EscapeLavaTask {
    fn default() -> Self {
        Self::new()
    }
}

impl Task for EscapeLavaTask {
    fn display_name(&self) -> String {
        "escape-lava".to_string()
    }

    fn on_tick(&mut self, agent: &mut dyn Agent) -> Option<Box<dyn Task>> {
        if !agent.in_lava() {
            agent.clear_control_states();
            return None;
        }
        // Head for the nearest solid footing; failing that, just push
        // forward and up.
        if let Some(pos) = agent.find_nearest_block(
            &["stone", "netherrack", "cobblestone", "obsidian"],
            8.0,
            &[],
        ) {
            agent.look_at(pos.center());
        }
        agent.set_control_state(ControlState::Jump, true);
        agent.set_control_state(ControlState::Forward, true);
        None
    }

    fn on_stop(&mut self, agent: &mut dyn Agent, _interrupt: Option<&dyn Task>) {
        agent.clear_control_states();
    }

    fn is_finished(&self, agent: &dyn Agent) -> bool {
        !agent.in_lava()
    }

    fn is_equal(&self, other: &dyn Task) -> bool {
        other.as_any().downcast_ref::<Self>().is_some()
    }

    fn overrides_grounded(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::sim::SimAgent;
    use crate::agent::types::Vec3;

    #[test]
    fn chain_activates_on_fall_and_lava() {
        let mut agent = SimAgent::new();
        let chain = WorldSurvivalChain::new();
        assert_eq!(chain.priority(&agent), PRIORITY_INACTIVE);

        agent.grounded = false;
        agent.vel = Vec3::new(0.0, -1.0, 0.0);
        assert_eq!(chain.priority(&agent), PRIORITY_DANGER);

        agent.grounded = true;
        agent.vel = Vec3::ZERO;
        agent.lava = true;
        assert_eq!(chain.priority(&agent), PRIORITY_DANGER);
    }

    #[test]
    fn mlg_bucket_places_water_near_the_ground() {
        let mut agent = SimAgent::new();
        agent.grounded = false;
        agent.vel = Vec3::new(0.0, -1.0, 0.0);
        agent.pos = Vec3::new(0.5, 64.0, 0.5);
        agent.set_block(BlockPos::new(0, 60, 0), "stone");
        agent.give("water_bucket", 1);

        let mut chain = WorldSurvivalChain::new();
        let mut events = EventBus::new();
        chain.on_tick(&mut agent, &mut events);

        assert!(agent.in_water());
        assert_eq!(agent.count("bucket"), 1);
        // Landed safe: the chain goes quiet once the task finishes.
        chain.on_tick(&mut agent, &mut events);
        agent.vel = Vec3::ZERO;
        assert_eq!(chain.priority(&agent), PRIORITY_INACTIVE);
    }

    #[test]
    fn mlg_bucket_waits_while_high_up() {
        let mut agent = SimAgent::new();
        agent.grounded = false;
        agent.vel = Vec3::new(0.0, -1.0, 0.0);
        agent.pos = Vec3::new(0.5, 80.0, 0.5);
        agent.set_block(BlockPos::new(0, 60, 0), "stone");
        agent.give("water_bucket", 1);

        let mut task = MlgBucketTask::new();
        task.on_tick(&mut agent);
        // Too high: bucket stays unused.
        assert!(!agent.in_water());
        assert_eq!(agent.count("water_bucket"), 1);
    }

    #[test]
    fn mlg_bucket_fails_without_a_bucket() {
        let mut agent = SimAgent::new();
        agent.grounded = false;
        agent.vel = Vec3::new(0.0, -1.0, 0.0);
        let mut task = MlgBucketTask::new();
        task.on_tick(&mut agent);
        assert!(task.is_failed());
    }

    #[test]
    fn escape_lava_holds_jump_until_out() {
        let mut agent = SimAgent::new();
        agent.lava = true;
        let mut task = EscapeLavaTask::new();
        assert!(!task.is_finished(&agent));
        task.on_tick(&mut agent);

        agent.lava = false;
        assert!(task.is_finished(&agent));
    }
}
