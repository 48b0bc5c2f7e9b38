//! Matching-materials crafting.
//!
//! Some recipes demand the *same* variant from a family across a subset
//! of slots (one wool colour for a bed, one wood species for a fence).
//! The planner scores every variant by what the inventory could yield,
//! picks the majority (first-seen wins ties), and emits either a
//! variant-concrete craft, the conversion that raises the majority's
//! true count, or a collection subtree for more raw family material.

use std::any::Any;

use crate::agent::Agent;
use crate::catalogue::recipe::{ItemTarget, MatchMode, Recipe};
use crate::catalogue::tables::{all_planks, log_name, MINING_SOURCES, WOOD_SPECIES};
use crate::engine::task::Task;

use super::craft::CraftTask;
use super::resources::MineAndCollect;

// ─── Family contract ─────────────────────────────────────────────────

/// A variant family (planks by species, wool by colour) with its
/// conversion and collection strategies.
pub trait MaterialFamily: 'static {
    fn family_name(&self) -> &str;

    /// Variant item names in tie-break order.
    fn variants(&self) -> Vec<String>;

    /// Exact inventory count of a variant.
    fn true_count(&self, agent: &dyn Agent, variant: &str) -> u32 {
        ItemTarget::of(variant, 1)
            .with_match_mode(MatchMode::Exact)
            .count_in(agent)
    }

    /// Extra count obtainable by the family's obvious conversion
    /// (logs -> 4 planks).
    fn derived_count(&self, agent: &dyn Agent, variant: &str) -> u32;

    /// Subtree raising `variant`'s true count to `desired_total`.
    fn conversion_task(
        &self,
        agent: &dyn Agent,
        variant: &str,
        desired_total: u32,
    ) -> Box<dyn Task>;

    /// Subtree collecting raw material worth `missing_units` more of the
    /// family.
    fn collect_task(&self, agent: &dyn Agent, missing_units: u32) -> Box<dyn Task>;

    /// Output already in hand for the needed calculation; exact result
    /// name by default, families whose results vary per variant widen it.
    fn have_result(&self, agent: &dyn Agent, base: &Recipe) -> u32 {
        ItemTarget::of(&base.result_name, 1)
            .with_match_mode(MatchMode::Exact)
            .count_in(agent)
    }
}

// ─── Planner ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Plan {
    Done,
    Craft { variant: String, desired: u32 },
    Convert { variant: String, desired_total: u32 },
    Collect { missing_units: u32 },
}

/// Craft `target_count` of the base recipe's result using one family
/// variant across all masked slots.
pub struct CraftWithMatchingMaterialsTask {
    base: Recipe,
    same_mask: Vec<bool>,
    target_count: u32,
    family: Box<dyn MaterialFamily>,
    /// Number of masked slots, the per-craft variant requirement.
    k: u32,
}

impl CraftWithMatchingMaterialsTask {
    pub fn new(
        base: Recipe,
        same_mask: Vec<bool>,
        target_count: u32,
        family: Box<dyn MaterialFamily>,
    ) -> Self {
        assert_eq!(
            same_mask.len(),
            base.ingredients.len(),
            "mask must cover every recipe slot"
        );
        let k = same_mask.iter().filter(|m| **m).count() as u32;
        assert!(k > 0, "mask selects no slots");
        Self {
            base,
            same_mask,
            target_count,
            family,
            k,
        }
    }

    /// The base recipe with every masked slot pinned to `variant`.
    fn concrete_recipe(&self, variant: &str) -> Recipe {
        let mut recipe = self.base.clone();
        recipe.recipe_key = format!("{}:{}", self.base.recipe_key, variant);
        for (slot, masked) in recipe.ingredients.iter_mut().zip(self.same_mask.iter()) {
            if *masked {
                *slot = Some(ItemTarget::of(variant, 1).with_match_mode(MatchMode::Exact));
            }
        }
        recipe
    }

    fn plan(&self, agent: &dyn Agent) -> Plan {
        let have = self.family.have_result(agent, &self.base);
        let needed = self.target_count.saturating_sub(have);
        if needed == 0 {
            return Plan::Done;
        }

        let result_count = self.base.result_count;
        let mut majority: Option<(String, u32, u32)> = None; // name, can_craft, true
        let mut total_possible = 0;
        for variant in self.family.variants() {
            let true_count = self.family.true_count(agent, &variant);
            let effective = true_count + self.family.derived_count(agent, &variant);
            let can_craft = (effective / self.k) * result_count;
            total_possible += can_craft;
            // Strictly-greater keeps the first-seen variant on ties.
            if majority.as_ref().map_or(true, |(_, best, _)| can_craft > *best) {
                majority = Some((variant, can_craft, true_count));
            }
        }
        let Some((variant, _, majority_true)) = majority else {
            return Plan::Collect {
                missing_units: needed.div_ceil(result_count) * self.k,
            };
        };

        if total_possible >= needed {
            let crafts_from_true = majority_true / self.k;
            if crafts_from_true >= 1 {
                let desired = (have + crafts_from_true * result_count).min(self.target_count);
                Plan::Craft { variant, desired }
            } else {
                let crafts_needed = needed.div_ceil(result_count);
                Plan::Convert {
                    variant,
                    desired_total: crafts_needed * self.k,
                }
            }
        } else {
            let shortfall = needed - total_possible;
            Plan::Collect {
                missing_units: shortfall.div_ceil(result_count) * self.k,
            }
        }
    }
}

impl Task for CraftWithMatchingMaterialsTask {
    fn display_name(&self) -> String {
        format!(
            "craft-matching({} x{} from {})",
            self.base.result_name,
            self.target_count,
            self.family.family_name()
        )
    }

    fn on_tick(&mut self, agent: &mut dyn Agent) -> Option<Box<dyn Task>> {
        match self.plan(&*agent) {
            Plan::Done => None,
            Plan::Craft { variant, desired } => {
                Some(CraftTask::boxed(self.concrete_recipe(&variant), desired))
            }
            Plan::Convert {
                variant,
                desired_total,
            } => Some(self.family.conversion_task(&*agent, &variant, desired_total)),
            Plan::Collect { missing_units } => {
                Some(self.family.collect_task(&*agent, missing_units))
            }
        }
    }

    fn is_finished(&self, agent: &dyn Agent) -> bool {
        self.family.have_result(agent, &self.base) >= self.target_count
    }

    fn is_equal(&self, other: &dyn Task) -> bool {
        other.as_any().downcast_ref::<Self>().is_some_and(|o| {
            o.target_count == self.target_count
                && o.same_mask == self.same_mask
                && o.family.family_name() == self.family.family_name()
                && o.base.same_recipe(&self.base)
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ─── Plank family ────────────────────────────────────────────────────

/// Planks by wood species; logs convert 1 -> 4.
pub struct PlankFamily;

impl PlankFamily {
    fn species_of(variant: &str) -> &str {
        variant.strip_suffix("_planks").unwrap_or(variant)
    }
}

impl MaterialFamily for PlankFamily {
    fn family_name(&self) -> &str {
        "planks"
    }

    fn variants(&self) -> Vec<String> {
        all_planks()
    }

    fn derived_count(&self, agent: &dyn Agent, variant: &str) -> u32 {
        let log = log_name(Self::species_of(variant));
        ItemTarget::of(&log, 1)
            .with_match_mode(MatchMode::Exact)
            .count_in(agent)
            * 4
    }

    fn conversion_task(
        &self,
        _agent: &dyn Agent,
        variant: &str,
        desired_total: u32,
    ) -> Box<dyn Task> {
        let log = log_name(Self::species_of(variant));
        let recipe = Recipe::shapeless(variant, variant, 4, vec![ItemTarget::of(&log, 1)]);
        CraftTask::boxed(recipe, desired_total)
    }

    fn collect_task(&self, agent: &dyn Agent, missing_units: u32) -> Box<dyn Task> {
        let logs: Vec<String> = WOOD_SPECIES.iter().map(|s| log_name(s)).collect();
        let have_logs: u32 = logs
            .iter()
            .map(|l| {
                ItemTarget::of(l, 1)
                    .with_match_mode(MatchMode::Exact)
                    .count_in(agent)
            })
            .sum();
        let needed_logs = have_logs + missing_units.div_ceil(4);
        let sources: std::collections::HashMap<String, Vec<String>> = logs
            .iter()
            .filter_map(|l| MINING_SOURCES.get(l).map(|b| (l.clone(), b.clone())))
            .collect();
        MineAndCollect::task(vec![ItemTarget::new(logs, needed_logs)], sources)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
