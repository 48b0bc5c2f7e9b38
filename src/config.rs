#![allow(dead_code)]
/// All engine constants. Distances are in blocks, times in game ticks
/// (20 ticks per game-second) unless noted otherwise.

pub const TICK_RATE: u32 = 20;
pub const TICK_INTERVAL_MS: u64 = 50; // 1000 / TICK_RATE

// Reach and search
pub const BLOCK_REACH: f64 = 4.5;
pub const MINE_SEARCH_RADIUS: f64 = 32.0;
pub const CONTAINER_SEARCH_RADIUS: f64 = 32.0;
pub const CONTAINER_REACH: f64 = 4.0;
pub const BED_SEARCH_RADIUS: f64 = 32.0;

// Item pickup
pub const ITEM_SEARCH_RADIUS: f64 = 16.0;
pub const ITEM_PICKUP_REACH: f64 = 1.5;
pub const PICKUP_WAIT_TICKS: u64 = 20;
pub const PICKUP_SEARCH_TIMEOUT_TICKS: u64 = 100;

// Mining
pub const MINE_BLOCK_TIMEOUT_TICKS: u64 = 200;

// Movement
pub const MOVE_SPEED: f64 = 4.3; // blocks/sec, vanilla walking speed
pub const STUCK_TIMEOUT_TICKS: u64 = 40;
pub const STUCK_MIN_DISPLACEMENT: f64 = 0.25;
pub const WANDER_TICKS: u64 = 30;

// Crafting and smelting
pub const CRAFT_COOLDOWN_TICKS: u64 = 10; // ~0.5 game-seconds between attempts
pub const SMELT_COOLDOWN_TICKS: u64 = 20;
pub const SMELT_STALL_TIMEOUT_TICKS: u64 = 400;
pub const FURNACE_SLOT_INPUT: u32 = 0;
pub const FURNACE_SLOT_FUEL: u32 = 1;
pub const FURNACE_SLOT_OUTPUT: u32 = 2;

// Inventory slot layout (survival inventory)
pub const MAIN_INVENTORY_SLOTS: u32 = 36;
pub const ARMOR_SLOTS: [u32; 4] = [36, 37, 38, 39];
pub const OFFHAND_SLOT: u32 = 40;

// Concern chains
pub const FOOD_EAT_THRESHOLD: u32 = 14; // of 20
pub const MOB_DANGER_RADIUS: f64 = 8.0;
pub const ATTACK_COOLDOWN_TICKS: u64 = 12;
pub const FALL_DANGER_SPEED: f64 = -0.6; // blocks/tick, downward
pub const MLG_ACTIVATE_HEIGHT: f64 = 4.0;

// Leaf state machines
pub const COVER_MIN_THROWAWAY_BLOCKS: u32 = 128;
pub const GOLEM_DETECT_RADIUS: f64 = 3.0;
pub const GOLEM_WAIT_TICKS: u64 = 100;
pub const SLEEP_TIMEOUT_TICKS: u64 = 200;
pub const MAX_STUCK_RETRIES: u32 = 4;
