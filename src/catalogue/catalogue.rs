//! Item-name -> obtaining-subtree routing.
//!
//! The catalogue owns the injected data tables (custom providers,
//! crafting recipes, smelting recipes, mineable sources, fuel burn
//! times) and maps `(item, count)` to the task subtree that deposits the
//! item into the inventory. Lookup order is fixed: custom, craft, smelt,
//! mine; the first source that matches wins.

use std::any::Any;
use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::agent::Agent;
use crate::engine::task::Task;
use crate::tasks::craft::CraftTask;
use crate::tasks::resources::MineAndCollect;
use crate::tasks::smelt::SmeltTask;

use super::recipe::{ItemTarget, Recipe, RecipeTarget};
use super::smelting::{FuelTable, SmeltingRecipe};
use super::tables;

/// A registered custom provider: `(agent, count) -> task`, where `None`
/// means "cannot provide right now" and lookup falls through to the
/// other sources.
pub type ProviderFn = Box<dyn Fn(&dyn Agent, u32) -> Option<Box<dyn Task>>>;

/// Which source a lookup resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionMethod {
    Custom,
    Craft,
    Smelt,
    Mine,
}

pub struct TaskCatalogue {
    providers: HashMap<String, ProviderFn>,
    recipes: HashMap<String, Recipe>,
    smelting: HashMap<String, SmeltingRecipe>,
    mining: HashMap<String, Vec<String>>,
    fuel_ticks: FuelTable,
}

impl TaskCatalogue {
    /// An empty catalogue; callers register everything themselves.
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
            recipes: HashMap::new(),
            smelting: HashMap::new(),
            mining: HashMap::new(),
            fuel_ticks: FuelTable::new(),
        }
    }

    /// The built-in data tables.
    pub fn with_default_tables() -> Self {
        Self {
            providers: HashMap::new(),
            recipes: tables::CRAFTING_RECIPES.clone(),
            smelting: tables::SMELTING_RECIPES.clone(),
            mining: tables::MINING_SOURCES.clone(),
            fuel_ticks: tables::FUEL_BURN_TICKS.clone(),
        }
    }

    // ── Registration ──

    pub fn register_provider(&mut self, item: &str, provider: ProviderFn) {
        self.providers.insert(item.to_string(), provider);
    }

    pub fn unregister_provider(&mut self, item: &str) -> bool {
        self.providers.remove(item).is_some()
    }

    pub fn register_recipe(&mut self, recipe: Recipe) {
        self.recipes.insert(recipe.result_name.clone(), recipe);
    }

    pub fn register_smelting(&mut self, recipe: SmeltingRecipe) {
        self.smelting.insert(recipe.output_name.clone(), recipe);
    }

    pub fn register_mining(&mut self, item: &str, source_blocks: Vec<String>) {
        self.mining.insert(item.to_string(), source_blocks);
    }

    pub fn fuel_table(&self) -> &FuelTable {
        &self.fuel_ticks
    }

    // ── Lookup ──

    /// The winning source kind for an item, if any.
    pub fn get_acquisition_method(&self, item: &str) -> Option<AcquisitionMethod> {
        if self.providers.contains_key(item) {
            Some(AcquisitionMethod::Custom)
        } else if self.recipes.contains_key(item) {
            Some(AcquisitionMethod::Craft)
        } else if self.smelting.contains_key(item) {
            Some(AcquisitionMethod::Smelt)
        } else if self.mining.contains_key(item) {
            Some(AcquisitionMethod::Mine)
        } else {
            None
        }
    }

    pub fn can_obtain(&self, item: &str) -> bool {
        self.get_acquisition_method(item).is_some()
    }

    /// Every item some source can produce, sorted for stable output.
    pub fn obtainable_items(&self) -> Vec<String> {
        let mut items: HashSet<&String> = HashSet::new();
        items.extend(self.providers.keys());
        items.extend(self.recipes.keys());
        items.extend(self.smelting.keys());
        items.extend(self.mining.keys());
        let mut out: Vec<String> = items.into_iter().cloned().collect();
        out.sort();
        out
    }

    /// Build the subtree that obtains `count` of `item`. A custom
    /// provider that declines (returns `None`) falls through to the
    /// remaining sources. Unroutable items yield a terminally failed
    /// placeholder so callers observe "cannot make progress" through the
    /// normal status surface.
    pub fn get_item_task(&self, agent: &dyn Agent, item: &str, count: u32) -> Box<dyn Task> {
        if let Some(provider) = self.providers.get(item) {
            if let Some(task) = provider(agent, count) {
                return task;
            }
        }
        if let Some(recipe) = self.recipes.get(item) {
            return Box::new(CraftTask::new(RecipeTarget::new(recipe.clone(), count)));
        }
        if let Some(recipe) = self.smelting.get(item) {
            return SmeltTask::boxed(recipe.clone(), count, self.fuel_ticks.clone());
        }
        if let Some(blocks) = self.mining.get(item) {
            let mut sources = HashMap::new();
            sources.insert(item.to_string(), blocks.clone());
            return MineAndCollect::task(vec![ItemTarget::of(item, count)], sources);
        }
        debug!(item, "no acquisition route");
        Box::new(UnobtainableTask {
            item: item.to_string(),
        })
    }

    /// Route an [`ItemTarget`]: the first acceptable name with a source
    /// wins.
    pub fn get_item_target_task(&self, agent: &dyn Agent, target: &ItemTarget) -> Box<dyn Task> {
        for name in target.acceptable_names() {
            if self.can_obtain(name) {
                return self.get_item_task(agent, name, target.target_count);
            }
        }
        Box::new(UnobtainableTask {
            item: target.first_name().to_string(),
        })
    }

    // ── Derivation ──

    /// The dependency tree behind obtaining an item: sub-items for
    /// crafts, input and fuel for smelts. Display and planning hints
    /// only; cycles are broken by a visited set.
    pub fn derive_acquisition(&self, item: &str) -> Derivation {
        let mut visited = HashSet::new();
        self.derive_inner(item, &mut visited)
    }

    fn derive_inner(&self, item: &str, visited: &mut HashSet<String>) -> Derivation {
        let method = self.get_acquisition_method(item);
        if !visited.insert(item.to_string()) {
            // Already on the path: cut the cycle here.
            return Derivation {
                item: item.to_string(),
                method,
                children: Vec::new(),
            };
        }
        let mut children = Vec::new();
        match method {
            Some(AcquisitionMethod::Craft) => {
                if let Some(recipe) = self.recipes.get(item) {
                    for (target, _) in recipe.per_craft_requirements() {
                        children.push(self.derive_inner(target.first_name(), visited));
                    }
                }
            }
            Some(AcquisitionMethod::Smelt) => {
                if let Some(recipe) = self.smelting.get(item) {
                    children.push(self.derive_inner(recipe.input.first_name(), visited));
                    let fuels: Vec<String> = match &recipe.fuels {
                        Some(fuels) => fuels.clone(),
                        None if self.fuel_ticks.contains_key("coal") => {
                            vec!["coal".to_string()]
                        }
                        None => Vec::new(),
                    };
                    for fuel in fuels {
                        children.push(self.derive_inner(&fuel, visited));
                    }
                }
            }
            _ => {}
        }
        visited.remove(item);
        Derivation {
            item: item.to_string(),
            method,
            children,
        }
    }
}

impl Default for TaskCatalogue {
    fn default() -> Self {
        Self::with_default_tables()
    }
}

/// One node of an acquisition dependency tree.
#[derive(Debug, Clone, Serialize)]
pub struct Derivation {
    pub item: String,
    pub method: Option<AcquisitionMethod>,
    pub children: Vec<Derivation>,
}

// ─── Unobtainable placeholder ────────────────────────────────────────

/// Terminal placeholder for items no source can produce.
struct UnobtainableTask {
    item: String,
}

impl Task for UnobtainableTask {
    fn display_name(&self) -> String {
        format!("unobtainable({})", self.item)
    }

    fn on_tick(&mut self, _agent: &mut dyn Agent) -> Option<Box<dyn Task>> {
        None
    }

    fn is_finished(&self, _agent: &dyn Agent) -> bool {
        true
    }

    fn is_failed(&self) -> bool {
        true
    }

    fn is_equal(&self, other: &dyn Task) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|o| o.item == self.item)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
