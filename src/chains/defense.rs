//! Combat defense.
//!
//! Wins at DANGER priority while a hostile mob is inside the danger
//! radius. Interruption hard-stops the fight so a resumed chain
//! re-acquires a fresh target instead of chasing a stale one.

use std::any::Any;

use crate::agent::Agent;
use crate::catalogue::tables::HOSTILE_MOBS;
use crate::config;
use crate::engine::chain::{Chain, TaskChain, PRIORITY_DANGER, PRIORITY_INACTIVE};
use crate::engine::events::EventBus;
use crate::engine::task::Task;
use crate::engine::timer::TickTimer;
use crate::tasks::movement::GetWithinRangeTask;

/// Melee range for the fight task.
const ATTACK_REACH: f64 = 3.0;
/// Give up on targets that get this far away.
const DISENGAGE_RADIUS: f64 = 1.5 * config::MOB_DANGER_RADIUS;

fn is_hostile(name: &str) -> bool {
    HOSTILE_MOBS.iter().any(|h| name.contains(h))
}

/// Nearest valid hostile entity within `radius`.
pub fn nearest_hostile(agent: &dyn Agent, radius: f64) -> Option<u32> {
    let mut best: Option<(u32, f64)> = None;
    for e in agent.entities() {
        if !e.valid || !is_hostile(&e.name) {
            continue;
        }
        let d = e.position.distance_to(agent.position());
        if d <= radius && best.map_or(true, |(_, bd)| d < bd) {
            best = Some((e.id, d));
        }
    }
    best.map(|(id, _)| id)
}

// ─── Chain ───────────────────────────────────────────────────────────

pub struct MobDefenseChain {
    chain: TaskChain,
}

impl MobDefenseChain {
    pub fn new() -> Self {
        Self {
            chain: TaskChain::new("mob-defense"),
        }
    }
}

impl Default for MobDefenseChain {
    fn default() -> Self {
        Self::new()
    }
}

impl Chain for MobDefenseChain {
    fn name(&self) -> &str {
        self.chain.name()
    }

    fn priority(&self, agent: &dyn Agent) -> u32 {
        if nearest_hostile(agent, config::MOB_DANGER_RADIUS).is_some() {
            PRIORITY_DANGER
        } else {
            PRIORITY_INACTIVE
        }
    }

    fn is_active(&self, agent: &dyn Agent) -> bool {
        self.chain.is_active(agent)
    }

    fn on_tick(&mut self, agent: &mut dyn Agent, events: &mut EventBus) {
        if let Some(id) = nearest_hostile(&*agent, config::MOB_DANGER_RADIUS) {
            self.chain.set_task(agent, Box::new(FightMobTask::new(id)));
        }
        self.chain.on_tick(agent, events);
    }

    fn on_interrupt(&mut self, agent: &mut dyn Agent, _winner: Option<&str>) {
        // A stale fight must not resume; re-acquire when we win again.
        self.chain.stop_current(agent);
    }

    fn current_task_name(&self) -> Option<String> {
        self.chain.current_task_name()
    }
}

// ─── Fight task ──────────────────────────────────────────────────────

/// Chase and attack one entity until it is gone or disengages.
pub struct FightMobTask {
    entity_id: u32,
    cooldown: TickTimer,
}

impl FightMobTask {
    pub fn new(entity_id: u32) -> Self {
        Self {
            entity_id,
            cooldown: TickTimer::new(config::ATTACK_COOLDOWN_TICKS),
        }
    }

    fn target(&self, agent: &dyn Agent) -> Option<crate::agent::types::EntityInfo> {
        agent
            .entities()
            .into_iter()
            .find(|e| e.id == self.entity_id && e.valid)
    }
}

impl Task for FightMobTask {
    fn display_name(&self) -> String {
        format!("fight-mob({})", self.entity_id)
    }

    fn on_tick(&mut self, agent: &mut dyn Agent) -> Option<Box<dyn Task>> {
        let Some(target) = self.target(&*agent) else {
            return None;
        };
        if target.position.distance_to(agent.position()) > ATTACK_REACH {
            // The chase is the shared walking leaf; its equality absorbs
            // the target drifting within a block.
            return Some(GetWithinRangeTask::boxed(target.position, ATTACK_REACH));
        }
        agent.look_at(target.position);
        if self.cooldown.elapsed(&*agent) && agent.attack(self.entity_id).is_ok() {
            self.cooldown.reset(&*agent);
        }
        None
    }

    fn on_stop(&mut self, agent: &mut dyn Agent, _interrupt: Option<&dyn Task>) {
        agent.clear_control_states();
    }

    fn is_finished(&self, agent: &dyn Agent) -> bool {
        match self.target(agent) {
            None => true,
            Some(t) => t.position.distance_to(agent.position()) > DISENGAGE_RADIUS,
        }
    }

    fn is_equal(&self, other: &dyn Task) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|o| o.entity_id == self.entity_id)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
