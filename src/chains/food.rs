//! Automatic eating.
//!
//! Wins the scheduler at FOOD priority whenever hunger drops below the
//! eat threshold and the inventory holds something edible. Interruption
//! keeps the eat task so a short danger burst resumes the meal.

use std::any::Any;

use crate::agent::types::EquipSlot;
use crate::agent::Agent;
use crate::catalogue::tables::FOOD_VALUES;
use crate::config;
use crate::engine::chain::{Chain, TaskChain, PRIORITY_FOOD, PRIORITY_INACTIVE};
use crate::engine::events::EventBus;
use crate::engine::task::Task;
use crate::engine::timer::TickTimer;

const EAT_COOLDOWN_TICKS: u64 = 32; // one eat animation

/// Best edible item in the inventory by restored hunger.
pub fn best_food(agent: &dyn Agent) -> Option<(String, u32)> {
    let mut best: Option<(String, u32)> = None;
    for stack in agent.items() {
        let Some(&value) = FOOD_VALUES.get(&stack.name) else {
            continue;
        };
        if best.as_ref().map_or(true, |(_, b)| value > *b) {
            best = Some((stack.name, value));
        }
    }
    best
}

fn hungry(agent: &dyn Agent) -> bool {
    agent.food_level() < config::FOOD_EAT_THRESHOLD
}

// ─── Chain ───────────────────────────────────────────────────────────

pub struct FoodChain {
    chain: TaskChain,
}

impl FoodChain {
    pub fn new() -> Self {
        Self {
            chain: TaskChain::new("food"),
        }
    }
}

impl Default for FoodChain {
    fn default() -> Self {
        Self::new()
    }
}

impl Chain for FoodChain {
    fn name(&self) -> &str {
        self.chain.name()
    }

    fn priority(&self, agent: &dyn Agent) -> u32 {
        if hungry(agent) && best_food(agent).is_some() {
            PRIORITY_FOOD
        } else {
            PRIORITY_INACTIVE
        }
    }

    fn is_active(&self, agent: &dyn Agent) -> bool {
        self.chain.is_active(agent)
    }

    fn on_tick(&mut self, agent: &mut dyn Agent, events: &mut EventBus) {
        self.chain.set_task(agent, Box::new(EatFoodTask::new()));
        self.chain.on_tick(agent, events);
    }

    fn current_task_name(&self) -> Option<String> {
        self.chain.current_task_name()
    }
}

// ─── Eat task ────────────────────────────────────────────────────────

/// Equip the best food and eat until full or out of food.
pub struct EatFoodTask {
    cooldown: TickTimer,
    failed: bool,
}

impl EatFoodTask {
    pub fn new() -> Self {
        Self {
            cooldown: TickTimer::new(EAT_COOLDOWN_TICKS),
            failed: false,
        }
    }
}

impl Default for EatFoodTask {
    fn default() -> Self {
        Self::new()
    }
}

impl Task for EatFoodTask {
    fn display_name(&self) -> String {
        "eat-food".to_string()
    }

    fn on_tick(&mut self, agent: &mut dyn Agent) -> Option<Box<dyn Task>> {
        if self.failed || agent.food_level() >= 20 {
            return None;
        }
        let Some((food, _)) = best_food(&*agent) else {
            self.failed = true;
            return None;
        };
        if !self.cooldown.elapsed(&*agent) {
            return None;
        }
        if agent.equip(&food, EquipSlot::Hand).is_ok() && agent.activate_item().is_ok() {
            self.cooldown.reset(&*agent);
        }
        None
    }

    fn is_finished(&self, agent: &dyn Agent) -> bool {
        self.failed || agent.food_level() >= 20 || best_food(agent).is_none()
    }

    fn is_failed(&self) -> bool {
        self.failed
    }

    fn is_equal(&self, other: &dyn Task) -> bool {
        other.as_any().downcast_ref::<Self>().is_some()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
