//! Crafting recipe model.
//!
//! Recipes are plain data the planner consumes and the agent's `craft`
//! primitive receives opaquely. Item names use the game's snake_case
//! identifiers so they round-trip through serde unchanged.

use serde::{Deserialize, Serialize};

use crate::agent::Agent;

// ─── Item targets ────────────────────────────────────────────────────

/// How an [`ItemTarget`] compares inventory names against its acceptable
/// names.
///
/// `Contains` is the historical behaviour: an inventory item matches when
/// its name equals *or contains* an acceptable name, so a target of
/// `iron` matches `iron_nugget`. That is almost certainly broader than
/// intended for short names, but it is what existing callers rely on, so
/// it stays the default; use `Exact` where the looseness bites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    #[default]
    Contains,
    Exact,
}

/// A set of acceptable item names paired with a required count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemTarget {
    names: Vec<String>,
    pub target_count: u32,
    #[serde(default)]
    pub match_mode: MatchMode,
}

impl ItemTarget {
    /// A target accepting any of `names`. Panics on an empty name set or
    /// a zero count; both are construction bugs, not runtime conditions.
    pub fn new<S: Into<String>>(names: Vec<S>, target_count: u32) -> Self {
        assert!(!names.is_empty(), "ItemTarget needs at least one name");
        assert!(target_count > 0, "ItemTarget needs a positive count");
        Self {
            names: names.into_iter().map(Into::into).collect(),
            target_count,
            match_mode: MatchMode::default(),
        }
    }

    /// A single-name target.
    pub fn of(name: &str, target_count: u32) -> Self {
        Self::new(vec![name], target_count)
    }

    pub fn with_match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    pub fn acceptable_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// First acceptable name, used where one concrete name is needed
    /// (display, derivation trees).
    pub fn first_name(&self) -> &str {
        &self.names[0]
    }

    /// Whether an inventory item name satisfies this target.
    pub fn matches(&self, item_name: &str) -> bool {
        match self.match_mode {
            MatchMode::Exact => self.names.iter().any(|n| n == item_name),
            MatchMode::Contains => self
                .names
                .iter()
                .any(|n| item_name == n || item_name.contains(n.as_str())),
        }
    }

    /// Total matching count across the agent's inventory.
    pub fn count_in(&self, agent: &dyn Agent) -> u32 {
        agent
            .items()
            .iter()
            .filter(|s| self.matches(&s.name))
            .map(|s| s.count)
            .sum()
    }

    pub fn met(&self, agent: &dyn Agent) -> bool {
        self.count_in(agent) >= self.target_count
    }

    /// Slot-level equality: same sorted set of acceptable names,
    /// regardless of listing order or counts.
    pub fn same_names(&self, other: &ItemTarget) -> bool {
        let mut a: Vec<&str> = self.names.iter().map(String::as_str).collect();
        let mut b: Vec<&str> = other.names.iter().map(String::as_str).collect();
        a.sort_unstable();
        a.dedup();
        b.sort_unstable();
        b.dedup();
        a == b
    }
}

// ─── Recipes ─────────────────────────────────────────────────────────

/// A width x height ingredient grid producing `result_count` of
/// `result_name`. Shapeless recipes may match any permutation of the
/// same ingredient multiset; shaped recipes are position-exact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub result_name: String,
    pub result_count: u32,
    pub width: u32,
    pub height: u32,
    pub shapeless: bool,
    /// Row-major, length `width * height`; `None` = empty slot.
    pub ingredients: Vec<Option<ItemTarget>>,
    pub recipe_key: String,
}

impl Recipe {
    pub fn new(
        recipe_key: &str,
        result_name: &str,
        result_count: u32,
        width: u32,
        height: u32,
        shapeless: bool,
        ingredients: Vec<Option<ItemTarget>>,
    ) -> Result<Self, String> {
        if result_count == 0 {
            return Err(format!("recipe {recipe_key}: zero result count"));
        }
        if !(1..=3).contains(&width) || !(1..=3).contains(&height) {
            return Err(format!("recipe {recipe_key}: grid {width}x{height} out of range"));
        }
        if ingredients.len() != (width * height) as usize {
            return Err(format!(
                "recipe {recipe_key}: {} ingredient slots for a {width}x{height} grid",
                ingredients.len()
            ));
        }
        Ok(Self {
            result_name: result_name.to_string(),
            result_count,
            width,
            height,
            shapeless,
            ingredients,
            recipe_key: recipe_key.to_string(),
        })
    }

    /// Shaped constructor used by the built-in tables; panics on invalid
    /// geometry since the tables are compiled in.
    pub fn shaped(
        recipe_key: &str,
        result_name: &str,
        result_count: u32,
        width: u32,
        height: u32,
        ingredients: Vec<Option<ItemTarget>>,
    ) -> Self {
        match Self::new(recipe_key, result_name, result_count, width, height, false, ingredients) {
            Ok(r) => r,
            Err(e) => panic!("bad built-in recipe: {e}"),
        }
    }

    pub fn shapeless(
        recipe_key: &str,
        result_name: &str,
        result_count: u32,
        ingredients: Vec<ItemTarget>,
    ) -> Self {
        let n = ingredients.len() as u32;
        let (width, height) = match n {
            1 => (1, 1),
            2 => (2, 1),
            3..=4 => (2, 2),
            5..=6 => (3, 2),
            7..=9 => (3, 3),
            _ => panic!("bad built-in recipe {recipe_key}: {n} ingredients"),
        };
        let mut slots: Vec<Option<ItemTarget>> = ingredients.into_iter().map(Some).collect();
        slots.resize((width * height) as usize, None);
        match Self::new(recipe_key, result_name, result_count, width, height, true, slots) {
            Ok(r) => r,
            Err(e) => panic!("bad built-in recipe: {e}"),
        }
    }

    /// Whether the grid does not fit the 2x2 inventory grid.
    pub fn requires_crafting_table(&self) -> bool {
        self.width > 2 || self.height > 2
    }

    /// Expand the ingredients onto a `grid x grid` crafting grid:
    /// `(x, y)` is filled from `ingredients[y * width + x]` for
    /// `x < width` and `y < height`, every other position empty.
    pub fn slots(&self, grid: u32) -> Vec<Option<ItemTarget>> {
        let mut out: Vec<Option<ItemTarget>> = vec![None; (grid * grid) as usize];
        for y in 0..self.height.min(grid) {
            for x in 0..self.width.min(grid) {
                out[(y * grid + x) as usize] =
                    self.ingredients[(y * self.width + x) as usize].clone();
            }
        }
        out
    }

    /// Distinct slot targets with how many slots each fills per craft.
    /// Slot identity is the sorted acceptable-name set.
    pub fn per_craft_requirements(&self) -> Vec<(ItemTarget, u32)> {
        let mut out: Vec<(ItemTarget, u32)> = Vec::new();
        for target in self.ingredients.iter().flatten() {
            if let Some((_, n)) = out.iter_mut().find(|(t, _)| t.same_names(target)) {
                *n += 1;
            } else {
                out.push((target.clone(), 1));
            }
        }
        out
    }

    /// Same work: same key, same result, same grid, slot-equal
    /// ingredients.
    pub fn same_recipe(&self, other: &Recipe) -> bool {
        self.recipe_key == other.recipe_key
            && self.result_name == other.result_name
            && self.result_count == other.result_count
            && self.width == other.width
            && self.height == other.height
            && self.shapeless == other.shapeless
            && self.ingredients.len() == other.ingredients.len()
            && self
                .ingredients
                .iter()
                .zip(other.ingredients.iter())
                .all(|(a, b)| match (a, b) {
                    (None, None) => true,
                    (Some(a), Some(b)) => a.same_names(b),
                    _ => false,
                })
    }
}

// ─── Recipe targets ──────────────────────────────────────────────────

/// A recipe plus how many of its output the caller wants overall.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeTarget {
    pub recipe: Recipe,
    pub desired_count: u32,
}

impl RecipeTarget {
    pub fn new(recipe: Recipe, desired_count: u32) -> Self {
        Self {
            recipe,
            desired_count,
        }
    }

    /// Crafts still required given `have` of the output already in hand:
    /// `max(0, ceil((desired - have) / result_count))`.
    pub fn crafts_needed(&self, have: u32) -> u32 {
        if have >= self.desired_count {
            return 0;
        }
        let missing = self.desired_count - have;
        missing.div_ceil(self.recipe.result_count)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::sim::SimAgent;

    fn plank_target() -> ItemTarget {
        ItemTarget::of("oak_planks", 1)
    }

    /// The 2x2 all-planks recipe the scenario tests use.
    fn crafting_table_recipe() -> Recipe {
        Recipe::shaped(
            "crafting_table",
            "crafting_table",
            1,
            2,
            2,
            vec![
                Some(plank_target()),
                Some(plank_target()),
                Some(plank_target()),
                Some(plank_target()),
            ],
        )
    }

    // ─── ItemTarget matching ───────────────────────────────────────

    #[test]
    fn contains_match_is_default() {
        let target = ItemTarget::of("iron", 1);
        assert!(target.matches("iron"));
        assert!(target.matches("iron_nugget"));
        assert!(!target.matches("gold_ingot"));
    }

    #[test]
    fn exact_match_rejects_superstrings() {
        let target = ItemTarget::of("iron", 1).with_match_mode(MatchMode::Exact);
        assert!(target.matches("iron"));
        assert!(!target.matches("iron_nugget"));
    }

    #[test]
    fn count_in_sums_across_acceptable_names() {
        let mut agent = SimAgent::new();
        agent.give("oak_planks", 3);
        agent.give("birch_planks", 2);
        agent.give("stone", 5);
        let target = ItemTarget::new(vec!["oak_planks", "birch_planks"], 4);
        assert_eq!(target.count_in(&agent), 5);
        assert!(target.met(&agent));
    }

    #[test]
    fn slot_equality_uses_sorted_name_sets() {
        let a = ItemTarget::new(vec!["oak_planks", "birch_planks"], 1);
        let b = ItemTarget::new(vec!["birch_planks", "oak_planks"], 3);
        let c = ItemTarget::new(vec!["oak_planks"], 1);
        assert!(a.same_names(&b));
        assert!(!a.same_names(&c));
    }

    // ─── Recipe invariants ─────────────────────────────────────────

    #[test]
    fn constructor_rejects_slot_count_mismatch() {
        let bad = Recipe::new(
            "bad",
            "x",
            1,
            2,
            2,
            false,
            vec![Some(plank_target()); 3],
        );
        assert!(bad.is_err());
    }

    #[test]
    fn constructor_rejects_out_of_range_grid() {
        assert!(Recipe::new("bad", "x", 1, 4, 1, false, vec![None; 4]).is_err());
        assert!(Recipe::new("bad", "x", 0, 1, 1, false, vec![None]).is_err());
    }

    #[test]
    fn table_requirement_follows_grid_size() {
        let small = crafting_table_recipe();
        assert!(!small.requires_crafting_table());
        let wide = Recipe::shaped("wide", "x", 1, 3, 1, vec![Some(plank_target()); 3]);
        assert!(wide.requires_crafting_table());
        let tall = Recipe::shaped("tall", "x", 1, 1, 3, vec![Some(plank_target()); 3]);
        assert!(tall.requires_crafting_table());
    }

    #[test]
    fn crafts_needed_rounds_up_and_clamps() {
        let recipe = Recipe::shapeless(
            "planks",
            "oak_planks",
            4,
            vec![ItemTarget::of("oak_log", 1)],
        );
        let target = RecipeTarget::new(recipe, 10);
        assert_eq!(target.crafts_needed(0), 3); // ceil(10/4)
        assert_eq!(target.crafts_needed(8), 1);
        assert_eq!(target.crafts_needed(10), 0);
        assert_eq!(target.crafts_needed(99), 0);
    }

    // ─── Slot expansion (scenario S4) ──────────────────────────────

    #[test]
    fn slot_expansion_on_matching_grid() {
        let recipe = crafting_table_recipe();
        let slots = recipe.slots(2);
        assert_eq!(slots.len(), 4);
        assert!(slots.iter().all(Option::is_some));
    }

    #[test]
    fn slot_expansion_pads_larger_grid() {
        let recipe = crafting_table_recipe();
        let slots = recipe.slots(3);
        assert_eq!(slots.len(), 9);
        let filled: Vec<usize> = slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.is_some().then_some(i))
            .collect();
        // First two of each of the first two rows; third row empty.
        assert_eq!(filled, vec![0, 1, 3, 4]);
    }

    #[test]
    fn crafts_needed_for_three_tables() {
        let target = RecipeTarget::new(crafting_table_recipe(), 3);
        assert_eq!(target.crafts_needed(0), 3);
    }

    #[test]
    fn per_craft_requirements_group_equal_slots() {
        let recipe = crafting_table_recipe();
        let reqs = recipe.per_craft_requirements();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].1, 4);
    }
}
