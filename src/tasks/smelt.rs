//! The furnace subtree.
//!
//! Furnace slot layout is fixed: input 0, fuel 1, output 2. The task
//! loads input and the highest-burn-time fuel it holds, then polls the
//! output slot on a cooldown; a stall window turns missing progress into
//! terminal failure instead of waiting forever.

use std::any::Any;

use crate::agent::types::{BlockPos, WindowKind};
use crate::agent::Agent;
use crate::catalogue::recipe::{ItemTarget, MatchMode};
use crate::catalogue::smelting::{FuelTable, SmeltingRecipe};
use crate::config;
use crate::engine::task::Task;
use crate::engine::timer::TickTimer;

use super::movement::GetToBlockTask;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SmeltState {
    FindingFurnace,
    GoingToFurnace,
    OpeningFurnace,
    AddingInput,
    AddingFuel,
    Waiting,
    Collecting,
    Finished,
    Failed,
}

/// Smelt until the desired output count is in the inventory.
pub struct SmeltTask {
    recipe: SmeltingRecipe,
    desired_count: u32,
    fuel_table: FuelTable,
    state: SmeltState,
    furnace_pos: Option<BlockPos>,
    cooldown: TickTimer,
    opened: bool,
    ops_loaded: u32,
    last_output: u32,
    last_progress_tick: u64,
}

impl SmeltTask {
    pub fn new(recipe: SmeltingRecipe, desired_count: u32, fuel_table: FuelTable) -> Self {
        Self {
            recipe,
            desired_count,
            fuel_table,
            state: SmeltState::FindingFurnace,
            furnace_pos: None,
            cooldown: TickTimer::new(config::SMELT_COOLDOWN_TICKS),
            opened: false,
            ops_loaded: 0,
            last_output: 0,
            last_progress_tick: 0,
        }
    }

    pub fn boxed(
        recipe: SmeltingRecipe,
        desired_count: u32,
        fuel_table: FuelTable,
    ) -> Box<dyn Task> {
        Box::new(Self::new(recipe, desired_count, fuel_table))
    }

    fn have_output(&self, agent: &dyn Agent) -> u32 {
        ItemTarget::of(&self.recipe.output_name, 1)
            .with_match_mode(MatchMode::Exact)
            .count_in(agent)
    }

    fn close_if_open(&mut self, agent: &mut dyn Agent) {
        if self.opened {
            agent.close_window();
            self.opened = false;
        }
    }
}

impl Task for SmeltTask {
    fn display_name(&self) -> String {
        format!("smelt({} x{})", self.recipe.output_name, self.desired_count)
    }

    fn on_tick(&mut self, agent: &mut dyn Agent) -> Option<Box<dyn Task>> {
        match self.state {
            SmeltState::Finished | SmeltState::Failed => None,

            SmeltState::FindingFurnace => {
                if self.have_output(&*agent) >= self.desired_count {
                    self.state = SmeltState::Finished;
                    return None;
                }
                match agent.find_nearest_block(
                    &["furnace"],
                    config::CONTAINER_SEARCH_RADIUS,
                    &[],
                ) {
                    Some(pos) => {
                        self.furnace_pos = Some(pos);
                        self.state = SmeltState::GoingToFurnace;
                    }
                    None => self.state = SmeltState::Failed,
                }
                None
            }

            SmeltState::GoingToFurnace => {
                let Some(pos) = self.furnace_pos else {
                    self.state = SmeltState::FindingFurnace;
                    return None;
                };
                if pos.distance_to(agent.position()) > config::CONTAINER_REACH {
                    return Some(GetToBlockTask::boxed(pos, config::CONTAINER_REACH));
                }
                self.state = SmeltState::OpeningFurnace;
                None
            }

            SmeltState::OpeningFurnace => {
                let Some(pos) = self.furnace_pos else {
                    self.state = SmeltState::FindingFurnace;
                    return None;
                };
                match agent.open_container(pos) {
                    Ok(WindowKind::Furnace) => {
                        self.opened = true;
                        self.state = SmeltState::AddingInput;
                    }
                    Ok(_) | Err(_) => self.state = SmeltState::Failed,
                }
                None
            }

            SmeltState::AddingInput => {
                let missing = self
                    .desired_count
                    .saturating_sub(self.have_output(&*agent));
                let ops = missing.div_ceil(self.recipe.output_count.max(1));
                let available = self.recipe.input.count_in(&*agent);
                let put = available.min(ops);
                if put == 0 {
                    self.state = SmeltState::Failed;
                    return None;
                }
                let mut moved = 0;
                for name in self.recipe.input.acceptable_names() {
                    if moved >= put {
                        break;
                    }
                    if let Ok(n) =
                        agent.fill_window_slot(name, put - moved, config::FURNACE_SLOT_INPUT)
                    {
                        moved += n;
                    }
                }
                if moved == 0 {
                    self.state = SmeltState::Failed;
                    return None;
                }
                self.ops_loaded = moved;
                self.state = SmeltState::AddingFuel;
                None
            }

            SmeltState::AddingFuel => {
                let Some((fuel, burn)) = self.recipe.best_fuel(&*agent, &self.fuel_table) else {
                    self.state = SmeltState::Failed;
                    return None;
                };
                let fuel = fuel.to_string();
                let needed = SmeltingRecipe::fuel_needed(self.ops_loaded, burn);
                match agent.fill_window_slot(&fuel, needed, config::FURNACE_SLOT_FUEL) {
                    Ok(_) => {
                        self.cooldown.reset(&*agent);
                        self.last_output = self.have_output(&*agent);
                        self.last_progress_tick = agent.game_ticks();
                        self.state = SmeltState::Waiting;
                    }
                    Err(_) => self.state = SmeltState::Failed,
                }
                None
            }

            SmeltState::Waiting => {
                if agent.current_window().is_none() {
                    // Window lost (death, interference); re-approach.
                    self.opened = false;
                    self.state = SmeltState::FindingFurnace;
                    return None;
                }
                if self.cooldown.elapsed(&*agent) {
                    let _ = agent.take_window_slot(config::FURNACE_SLOT_OUTPUT);
                    self.cooldown.reset(&*agent);
                }
                let have = self.have_output(&*agent);
                if have >= self.desired_count {
                    self.state = SmeltState::Collecting;
                    return None;
                }
                if have > self.last_output {
                    self.last_output = have;
                    self.last_progress_tick = agent.game_ticks();
                } else if agent.game_ticks().saturating_sub(self.last_progress_tick)
                    > config::SMELT_STALL_TIMEOUT_TICKS
                {
                    self.state = SmeltState::Failed;
                }
                None
            }

            SmeltState::Collecting => {
                let _ = agent.take_window_slot(config::FURNACE_SLOT_OUTPUT);
                self.close_if_open(agent);
                self.state = SmeltState::Finished;
                None
            }
        }
    }

    fn on_stop(&mut self, agent: &mut dyn Agent, _interrupt: Option<&dyn Task>) {
        self.close_if_open(agent);
    }

    fn is_finished(&self, _agent: &dyn Agent) -> bool {
        matches!(self.state, SmeltState::Finished | SmeltState::Failed)
    }

    fn is_failed(&self) -> bool {
        self.state == SmeltState::Failed
    }

    fn is_equal(&self, other: &dyn Task) -> bool {
        other.as_any().downcast_ref::<Self>().is_some_and(|o| {
            o.desired_count == self.desired_count
                && o.recipe.output_name == self.recipe.output_name
                && o.recipe.input.same_names(&self.recipe.input)
        })
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
    use crate::catalogue::tables::{FUEL_BURN_TICKS, SMELTING_RECIPES};
    use crate::engine::task::TaskNode;

    fn drive(node: &mut TaskNode, agent: &mut SimAgent, ticks: usize) {
        for _ in 0..ticks {
            node.tick(agent);
            agent.step();
            if node.is_finished(agent) {
                break;
            }
        }
    }

    fn iron_task(count: u32) -> Box<dyn Task> {
        SmeltTask::boxed(
            SMELTING_RECIPES["iron_ingot"].clone(),
            count,
            FUEL_BURN_TICKS.clone(),
        )
    }

    #[test]
    fn smelts_iron_end_to_end() {
        let mut agent = SimAgent::new();
        agent.set_block(BlockPos::new(2, 64, 0), "furnace");
        agent.give("raw_iron", 3);
        agent.give("coal", 2);
        let mut node = TaskNode::new(iron_task(3));

        drive(&mut node, &mut agent, 400);
        assert!(node.is_finished(&agent), "{}", node.task_chain_string());
        assert!(!node.is_failed());
        assert_eq!(agent.count("iron_ingot"), 3);
        assert!(agent.current_window().is_none());
    }

    #[test]
    fn fails_without_a_furnace() {
        let mut agent = SimAgent::new();
        agent.give("raw_iron", 1);
        agent.give("coal", 1);
        let mut node = TaskNode::new(iron_task(1));
        drive(&mut node, &mut agent, 10);
        assert!(node.is_failed());
    }

    #[test]
    fn fails_without_input() {
        let mut agent = SimAgent::new();
        agent.set_block(BlockPos::new(2, 64, 0), "furnace");
        agent.give("coal", 1);
        let mut node = TaskNode::new(iron_task(1));
        drive(&mut node, &mut agent, 20);
        assert!(node.is_failed());
    }

    #[test]
    fn fails_without_fuel() {
        let mut agent = SimAgent::new();
        agent.set_block(BlockPos::new(2, 64, 0), "furnace");
        agent.give("raw_iron", 1);
        let mut node = TaskNode::new(iron_task(1));
        drive(&mut node, &mut agent, 20);
        assert!(node.is_failed());
    }

    #[test]
    fn already_satisfied_finishes_immediately() {
        let mut agent = SimAgent::new();
        agent.give("iron_ingot", 5);
        let mut node = TaskNode::new(iron_task(3));
        node.tick(&mut agent);
        assert!(node.is_finished(&agent));
        assert!(!node.is_failed());
    }
}
