//! Built-in data tables for the default catalogue.
//!
//! A deliberately small but real slice of the game's data: enough for the
//! engine to mine, craft, smelt and eat without external tables. Callers
//! can extend or replace any of it through the catalogue's registration
//! methods; these statics are only the defaults injected at construction.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::recipe::{ItemTarget, Recipe};
use super::smelting::SmeltingRecipe;

// ─── Wood species ────────────────────────────────────────────────────

/// Wood species in family-enumeration order. Matching-materials
/// planning breaks ties in favour of the earlier species.
pub const WOOD_SPECIES: &[&str] = &[
    "oak", "spruce", "birch", "jungle", "acacia", "dark_oak", "mangrove", "cherry",
];

pub fn plank_name(species: &str) -> String {
    format!("{species}_planks")
}

pub fn log_name(species: &str) -> String {
    format!("{species}_log")
}

/// Every plank variant, family order.
pub fn all_planks() -> Vec<String> {
    WOOD_SPECIES.iter().map(|s| plank_name(s)).collect()
}

fn any_plank_target(count: u32) -> ItemTarget {
    ItemTarget::new(all_planks(), count)
}

// ─── Mining sources ──────────────────────────────────────────────────

/// Item name -> blocks that drop it when mined.
pub static MINING_SOURCES: Lazy<HashMap<String, Vec<String>>> = Lazy::new(|| {
    let mut sources: HashMap<String, Vec<String>> = HashMap::new();
    let mut add = |item: &str, blocks: &[&str]| {
        sources.insert(item.to_string(), blocks.iter().map(|b| (*b).to_string()).collect());
    };

    add("cobblestone", &["stone", "cobblestone"]);
    add("dirt", &["dirt", "grass_block"]);
    add("sand", &["sand"]);
    add("gravel", &["gravel"]);
    add("coal", &["coal_ore", "deepslate_coal_ore"]);
    add("raw_iron", &["iron_ore", "deepslate_iron_ore"]);
    add("raw_gold", &["gold_ore", "deepslate_gold_ore"]);
    add("diamond", &["diamond_ore", "deepslate_diamond_ore"]);
    add("redstone", &["redstone_ore", "deepslate_redstone_ore"]);
    add("netherrack", &["netherrack"]);
    add("obsidian", &["obsidian"]);
    add("white_wool", &["white_wool"]);
    for species in WOOD_SPECIES {
        let log = log_name(species);
        sources.insert(log.clone(), vec![log]);
    }

    sources
});

// ─── Crafting recipes ────────────────────────────────────────────────

/// Result item name -> recipe. One recipe per item; alternates go
/// through the matching-materials planner instead.
pub static CRAFTING_RECIPES: Lazy<HashMap<String, Recipe>> = Lazy::new(|| {
    let mut recipes: HashMap<String, Recipe> = HashMap::new();
    let mut add = |r: Recipe| {
        recipes.insert(r.result_name.clone(), r);
    };

    // Any log -> 4 planks of that species; the generic entry targets oak
    // and the planner generates species-concrete variants as needed.
    add(Recipe::shapeless(
        "oak_planks",
        "oak_planks",
        4,
        vec![ItemTarget::of("oak_log", 1)],
    ));
    add(Recipe::shapeless(
        "stick",
        "stick",
        4,
        vec![any_plank_target(1), any_plank_target(1)],
    ));
    add(Recipe::shaped(
        "crafting_table",
        "crafting_table",
        1,
        2,
        2,
        vec![
            Some(any_plank_target(1)),
            Some(any_plank_target(1)),
            Some(any_plank_target(1)),
            Some(any_plank_target(1)),
        ],
    ));
    add(Recipe::shapeless(
        "torch",
        "torch",
        4,
        vec![
            ItemTarget::new(vec!["coal", "charcoal"], 1),
            ItemTarget::of("stick", 1),
        ],
    ));
    add(Recipe::shaped(
        "furnace",
        "furnace",
        1,
        3,
        3,
        vec![
            Some(ItemTarget::of("cobblestone", 1)),
            Some(ItemTarget::of("cobblestone", 1)),
            Some(ItemTarget::of("cobblestone", 1)),
            Some(ItemTarget::of("cobblestone", 1)),
            None,
            Some(ItemTarget::of("cobblestone", 1)),
            Some(ItemTarget::of("cobblestone", 1)),
            Some(ItemTarget::of("cobblestone", 1)),
            Some(ItemTarget::of("cobblestone", 1)),
        ],
    ));
    add(Recipe::shaped(
        "chest",
        "chest",
        1,
        3,
        3,
        vec![
            Some(any_plank_target(1)),
            Some(any_plank_target(1)),
            Some(any_plank_target(1)),
            Some(any_plank_target(1)),
            None,
            Some(any_plank_target(1)),
            Some(any_plank_target(1)),
            Some(any_plank_target(1)),
            Some(any_plank_target(1)),
        ],
    ));
    add(Recipe::shaped(
        "wooden_pickaxe",
        "wooden_pickaxe",
        1,
        3,
        3,
        vec![
            Some(any_plank_target(1)),
            Some(any_plank_target(1)),
            Some(any_plank_target(1)),
            None,
            Some(ItemTarget::of("stick", 1)),
            None,
            None,
            Some(ItemTarget::of("stick", 1)),
            None,
        ],
    ));
    add(Recipe::shaped(
        "stone_pickaxe",
        "stone_pickaxe",
        1,
        3,
        3,
        vec![
            Some(ItemTarget::of("cobblestone", 1)),
            Some(ItemTarget::of("cobblestone", 1)),
            Some(ItemTarget::of("cobblestone", 1)),
            None,
            Some(ItemTarget::of("stick", 1)),
            None,
            None,
            Some(ItemTarget::of("stick", 1)),
            None,
        ],
    ));
    // Fence: 4 same-species planks + 2 sticks -> 3. The generic entry is
    // oak; species-matched crafting goes through the planner.
    add(Recipe::shaped(
        "oak_fence",
        "oak_fence",
        3,
        3,
        2,
        vec![
            Some(ItemTarget::of("oak_planks", 1)),
            Some(ItemTarget::of("stick", 1)),
            Some(ItemTarget::of("oak_planks", 1)),
            Some(ItemTarget::of("oak_planks", 1)),
            Some(ItemTarget::of("stick", 1)),
            Some(ItemTarget::of("oak_planks", 1)),
        ],
    ));
    add(Recipe::shaped(
        "white_bed",
        "white_bed",
        1,
        3,
        2,
        vec![
            Some(ItemTarget::of("white_wool", 1)),
            Some(ItemTarget::of("white_wool", 1)),
            Some(ItemTarget::of("white_wool", 1)),
            Some(any_plank_target(1)),
            Some(any_plank_target(1)),
            Some(any_plank_target(1)),
        ],
    ));

    recipes
});

// ─── Smelting recipes ────────────────────────────────────────────────

/// Output item name -> furnace recipe.
pub static SMELTING_RECIPES: Lazy<HashMap<String, SmeltingRecipe>> = Lazy::new(|| {
    let mut recipes: HashMap<String, SmeltingRecipe> = HashMap::new();
    let mut add = |r: SmeltingRecipe| {
        recipes.insert(r.output_name.clone(), r);
    };

    add(SmeltingRecipe::new(
        ItemTarget::new(vec!["raw_iron", "iron_ore"], 1),
        "iron_ingot",
        1,
    ));
    add(SmeltingRecipe::new(
        ItemTarget::new(vec!["raw_gold", "gold_ore"], 1),
        "gold_ingot",
        1,
    ));
    add(SmeltingRecipe::new(ItemTarget::of("sand", 1), "glass", 1));
    add(SmeltingRecipe::new(
        ItemTarget::of("cobblestone", 1),
        "stone",
        1,
    ));
    add(SmeltingRecipe::new(
        ItemTarget::new(
            WOOD_SPECIES.iter().map(|s| log_name(s)).collect(),
            1,
        ),
        "charcoal",
        1,
    ));
    add(SmeltingRecipe::new(
        ItemTarget::of("beef", 1),
        "cooked_beef",
        1,
    ));
    add(SmeltingRecipe::new(
        ItemTarget::of("porkchop", 1),
        "cooked_porkchop",
        1,
    ));

    recipes
});

// ─── Fuel burn times ─────────────────────────────────────────────────

/// Fuel item name -> burn time in game ticks (one item = 200 ticks).
pub static FUEL_BURN_TICKS: Lazy<HashMap<String, u32>> = Lazy::new(|| {
    let mut fuels: HashMap<String, u32> = HashMap::new();
    let mut add = |name: &str, ticks: u32| {
        fuels.insert(name.to_string(), ticks);
    };

    add("lava_bucket", 20_000);
    add("coal_block", 16_000);
    add("coal", 1_600);
    add("charcoal", 1_600);
    for species in WOOD_SPECIES {
        add(&log_name(species), 300);
        add(&plank_name(species), 300);
    }
    add("stick", 100);

    fuels
});

// ─── Foods ───────────────────────────────────────────────────────────

/// Edible item name -> hunger restored (of 20).
pub static FOOD_VALUES: Lazy<HashMap<String, u32>> = Lazy::new(|| {
    let mut foods: HashMap<String, u32> = HashMap::new();
    let mut add = |name: &str, value: u32| {
        foods.insert(name.to_string(), value);
    };

    add("cooked_beef", 8);
    add("cooked_porkchop", 8);
    add("bread", 5);
    add("apple", 4);
    add("carrot", 3);
    add("beef", 3);
    add("porkchop", 3);
    add("rotten_flesh", 4);

    foods
});

// ─── Hostiles and throwaways ─────────────────────────────────────────

/// Entity names the defense chain treats as hostile.
pub const HOSTILE_MOBS: &[&str] = &[
    "zombie", "skeleton", "creeper", "spider", "witch", "drowned", "husk", "stray", "pillager",
];

/// Cheap blocks safe to consume for covering and pillaring.
pub const THROWAWAY_BLOCKS: &[&str] = &["dirt", "cobblestone", "netherrack"];

/// Every bed block, any colour.
pub const BED_BLOCKS: &[&str] = &[
    "white_bed",
    "orange_bed",
    "magenta_bed",
    "light_blue_bed",
    "yellow_bed",
    "lime_bed",
    "pink_bed",
    "gray_bed",
    "light_gray_bed",
    "cyan_bed",
    "purple_bed",
    "blue_bed",
    "brown_bed",
    "green_bed",
    "red_bed",
    "black_bed",
];

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_recipe_result_is_its_key() {
        for (key, recipe) in CRAFTING_RECIPES.iter() {
            assert_eq!(key, &recipe.result_name);
        }
    }

    #[test]
    fn grid_recipes_mark_table_requirement() {
        assert!(!CRAFTING_RECIPES["crafting_table"].requires_crafting_table());
        assert!(CRAFTING_RECIPES["furnace"].requires_crafting_table());
        assert!(CRAFTING_RECIPES["oak_fence"].requires_crafting_table());
    }

    #[test]
    fn fuels_are_positive() {
        assert!(FUEL_BURN_TICKS.values().all(|&t| t > 0));
    }

    #[test]
    fn wood_species_have_logs_and_planks() {
        for species in WOOD_SPECIES {
            assert!(MINING_SOURCES.contains_key(&log_name(species)));
        }
        assert_eq!(all_planks()[0], "oak_planks");
    }
}
