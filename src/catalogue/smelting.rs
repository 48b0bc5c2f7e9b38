//! Smelting recipe model and fuel planning.
//!
//! Burn times are used for *count* planning (how much fuel to load), not
//! for timing; the smelt leaf observes actual progress through window
//! reads.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::agent::Agent;

use super::recipe::ItemTarget;

/// One furnace operation takes this many game ticks of burn time.
pub const BURN_TICKS_PER_ITEM: u32 = 200;

/// Fuel item name -> burn time in game ticks.
pub type FuelTable = HashMap<String, u32>;

/// A furnace recipe: acceptable inputs and what they produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmeltingRecipe {
    pub input: ItemTarget,
    pub output_name: String,
    pub output_count: u32,
    /// Restrict usable fuels (blast-furnace style recipes); `None`
    /// accepts anything in the fuel table.
    pub fuels: Option<Vec<String>>,
}

impl SmeltingRecipe {
    pub fn new(input: ItemTarget, output_name: &str, output_count: u32) -> Self {
        Self {
            input,
            output_name: output_name.to_string(),
            output_count,
            fuels: None,
        }
    }

    pub fn with_fuels<S: Into<String>>(mut self, fuels: Vec<S>) -> Self {
        self.fuels = Some(fuels.into_iter().map(Into::into).collect());
        self
    }

    fn fuel_allowed(&self, name: &str) -> bool {
        match &self.fuels {
            Some(allowed) => allowed.iter().any(|f| f == name),
            None => true,
        }
    }

    /// The highest-burn-time fuel the agent currently holds and the
    /// recipe accepts.
    pub fn best_fuel<'t>(
        &self,
        agent: &dyn Agent,
        fuel_table: &'t FuelTable,
    ) -> Option<(&'t str, u32)> {
        let mut best: Option<(&'t str, u32)> = None;
        for stack in agent.items() {
            let Some((key, &burn)) = fuel_table.get_key_value(&stack.name) else {
                continue;
            };
            if !self.fuel_allowed(&stack.name) {
                continue;
            }
            if best.map_or(true, |(_, b)| burn > b) {
                best = Some((key.as_str(), burn));
            }
        }
        best
    }

    /// How many units of `fuel` cover `items` furnace operations.
    pub fn fuel_needed(items: u32, fuel_burn_ticks: u32) -> u32 {
        if fuel_burn_ticks == 0 {
            return 0;
        }
        (items * BURN_TICKS_PER_ITEM).div_ceil(fuel_burn_ticks)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
