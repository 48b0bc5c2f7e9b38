//! The crafting subtree.
//!
//! One state machine covers both the 2x2 inventory grid and the
//! crafting-table path; the branch is decided by the recipe's grid size.
//! Crafting is fire-and-poll: the craft primitive is invoked with the
//! remaining craft count and completion is observed through inventory
//! reads, with a cooldown between attempts to tolerate asynchronous
//! completion.

use std::any::Any;

use crate::agent::types::BlockPos;
use crate::agent::Agent;
use crate::catalogue::recipe::{ItemTarget, MatchMode, Recipe, RecipeTarget};
use crate::config;
use crate::engine::task::Task;
use crate::engine::timer::TickTimer;

use super::movement::GetToBlockTask;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CraftState {
    CheckingIngredients,
    GoingToTable,
    OpeningTable,
    Crafting,
    Collecting,
    Finished,
    Failed,
}

/// Craft a recipe until the desired output count is in the inventory.
pub struct CraftTask {
    target: RecipeTarget,
    state: CraftState,
    table_pos: Option<BlockPos>,
    cooldown: TickTimer,
    opened: bool,
}

impl CraftTask {
    pub fn new(target: RecipeTarget) -> Self {
        Self {
            target,
            state: CraftState::CheckingIngredients,
            table_pos: None,
            cooldown: TickTimer::new(config::CRAFT_COOLDOWN_TICKS),
            opened: false,
        }
    }

    pub fn boxed(recipe: Recipe, desired_count: u32) -> Box<dyn Task> {
        Box::new(Self::new(RecipeTarget::new(recipe, desired_count)))
    }

    pub fn recipe(&self) -> &Recipe {
        &self.target.recipe
    }

    fn have_output(&self, agent: &dyn Agent) -> u32 {
        ItemTarget::of(&self.target.recipe.result_name, 1)
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

impl Task for CraftTask {
    fn display_name(&self) -> String {
        format!(
            "craft({} x{})",
            self.target.recipe.result_name, self.target.desired_count
        )
    }

    fn on_tick(&mut self, agent: &mut dyn Agent) -> Option<Box<dyn Task>> {
        match self.state {
            CraftState::Finished | CraftState::Failed => None,

            CraftState::CheckingIngredients => {
                let have = self.have_output(&*agent);
                if have >= self.target.desired_count {
                    self.state = CraftState::Collecting;
                    return None;
                }
                let crafts = self.target.crafts_needed(have);
                for (slot_target, per_craft) in self.target.recipe.per_craft_requirements() {
                    if slot_target.count_in(&*agent) < per_craft * crafts {
                        self.state = CraftState::Failed;
                        return None;
                    }
                }
                self.state = if self.target.recipe.requires_crafting_table() {
                    CraftState::GoingToTable
                } else {
                    CraftState::Crafting
                };
                None
            }

            CraftState::GoingToTable => {
                let pos = match self.table_pos {
                    Some(pos) => pos,
                    None => {
                        let found = agent.find_nearest_block(
                            &["crafting_table"],
                            config::CONTAINER_SEARCH_RADIUS,
                            &[],
                        );
                        match found {
                            Some(pos) => {
                                self.table_pos = Some(pos);
                                pos
                            }
                            None => {
                                self.state = CraftState::Failed;
                                return None;
                            }
                        }
                    }
                };
                if pos.distance_to(agent.position()) > config::CONTAINER_REACH {
                    return Some(GetToBlockTask::boxed(pos, config::CONTAINER_REACH));
                }
                self.state = CraftState::OpeningTable;
                None
            }

            CraftState::OpeningTable => {
                let Some(pos) = self.table_pos else {
                    self.state = CraftState::GoingToTable;
                    return None;
                };
                match agent.open_container(pos) {
                    Ok(_) => {
                        self.opened = true;
                        self.state = CraftState::Crafting;
                    }
                    Err(_) => self.state = CraftState::Failed,
                }
                None
            }

            CraftState::Crafting => {
                let have = self.have_output(&*agent);
                if have >= self.target.desired_count {
                    self.state = CraftState::Collecting;
                    return None;
                }
                if !self.cooldown.elapsed(&*agent) {
                    return None;
                }
                let crafts = self.target.crafts_needed(have);
                let table = self
                    .target
                    .recipe
                    .requires_crafting_table()
                    .then_some(self.table_pos)
                    .flatten();
                match agent.craft(&self.target.recipe, crafts, table) {
                    Ok(()) => self.cooldown.reset(&*agent),
                    Err(_) => self.state = CraftState::Failed,
                }
                None
            }

            CraftState::Collecting => {
                self.close_if_open(agent);
                self.state = CraftState::Finished;
                None
            }
        }
    }

    fn on_stop(&mut self, agent: &mut dyn Agent, _interrupt: Option<&dyn Task>) {
        self.close_if_open(agent);
    }

    fn is_finished(&self, _agent: &dyn Agent) -> bool {
        matches!(self.state, CraftState::Finished | CraftState::Failed)
    }

    fn is_failed(&self) -> bool {
        self.state == CraftState::Failed
    }

    fn is_equal(&self, other: &dyn Task) -> bool {
        other.as_any().downcast_ref::<Self>().is_some_and(|o| {
            o.target.desired_count == self.target.desired_count
                && o.target.recipe.same_recipe(&self.target.recipe)
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
    use crate::catalogue::tables::CRAFTING_RECIPES;
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

    #[test]
    fn crafts_in_inventory_without_a_table() {
        let mut agent = SimAgent::new();
        agent.give("oak_planks", 2);
        let mut node = TaskNode::new(CraftTask::boxed(CRAFTING_RECIPES["stick"].clone(), 4));

        drive(&mut node, &mut agent, 40);
        assert!(node.is_finished(&agent));
        assert!(!node.is_failed());
        assert_eq!(agent.count("stick"), 4);
        assert_eq!(agent.count("oak_planks"), 0);
    }

    #[test]
    fn fails_fast_on_missing_ingredients() {
        let mut agent = SimAgent::new();
        agent.give("oak_planks", 1); // stick needs 2
        let mut node = TaskNode::new(CraftTask::boxed(CRAFTING_RECIPES["stick"].clone(), 4));
        node.tick(&mut agent);
        assert!(node.is_finished(&agent));
        assert!(node.is_failed());
        assert_eq!(agent.count("oak_planks"), 1);
    }

    #[test]
    fn finishes_without_crafting_when_already_satisfied() {
        let mut agent = SimAgent::new();
        agent.give("stick", 6);
        let mut node = TaskNode::new(CraftTask::boxed(CRAFTING_RECIPES["stick"].clone(), 4));
        drive(&mut node, &mut agent, 5);
        assert!(node.is_finished(&agent));
        assert_eq!(agent.count("stick"), 6);
    }

    #[test]
    fn big_recipe_walks_to_and_uses_a_table() {
        let mut agent = SimAgent::new();
        agent.give("cobblestone", 8);
        let table = BlockPos::new(6, 64, 0);
        agent.set_block(table, "crafting_table");
        let mut node = TaskNode::new(CraftTask::boxed(CRAFTING_RECIPES["furnace"].clone(), 1));

        drive(&mut node, &mut agent, 300);
        assert!(node.is_finished(&agent), "{}", node.task_chain_string());
        assert!(!node.is_failed());
        assert_eq!(agent.count("furnace"), 1);
        // COLLECTING closed the window on the way out.
        assert!(agent.current_window().is_none());
    }

    #[test]
    fn big_recipe_without_a_table_nearby_fails() {
        let mut agent = SimAgent::new();
        agent.give("cobblestone", 8);
        let mut node = TaskNode::new(CraftTask::boxed(CRAFTING_RECIPES["furnace"].clone(), 1));
        drive(&mut node, &mut agent, 10);
        assert!(node.is_failed());
        assert_eq!(agent.count("cobblestone"), 8);
    }

    #[test]
    fn polls_async_craft_completion() {
        let mut agent = SimAgent::new();
        agent.craft_delay_ticks = 5; // output lands after the attempt
        agent.give("oak_planks", 2);
        let mut node = TaskNode::new(CraftTask::boxed(CRAFTING_RECIPES["stick"].clone(), 4));

        drive(&mut node, &mut agent, 60);
        assert!(node.is_finished(&agent));
        assert_eq!(agent.count("stick"), 4);
    }

    #[test]
    fn equality_compares_recipe_and_count() {
        let a = CraftTask::new(RecipeTarget::new(CRAFTING_RECIPES["stick"].clone(), 4));
        let b = CraftTask::new(RecipeTarget::new(CRAFTING_RECIPES["stick"].clone(), 4));
        let c = CraftTask::new(RecipeTarget::new(CRAFTING_RECIPES["stick"].clone(), 8));
        assert!(a.is_equal(&b));
        assert!(!a.is_equal(&c));
    }
}
