//! The agent surface the engine runs against.
//!
//! [`Agent`] is the narrow contract an adapter for a real game client must
//! satisfy: transient world/inventory reads plus non-blocking actuators.
//! The engine never stores a reference to the agent; every task hook
//! receives `&mut dyn Agent` from the ticking thread, so adapters need no
//! internal locking on the engine's account.
//!
//! [`sim::SimAgent`] is a self-contained in-memory implementation used by
//! the test suite and the demo driver.

pub mod sim;
pub mod types;

use std::fmt;

use crate::catalogue::recipe::Recipe;

use self::types::{
    BlockInfo, BlockPos, ControlState, Dimension, EntityInfo, EquipSlot, ItemStack, Vec3,
    WindowInfo, WindowKind,
};

// ─── Errors ──────────────────────────────────────────────────────────

/// Failure of a single actuator call. These are transient by contract:
/// a leaf swallows them and re-polls the world on a later tick, or turns
/// them into its own FAILED status. They never cross tick boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    OutOfReach,
    NoSuchItem,
    NoWindow,
    InventoryFull,
    Rejected(String),
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfReach => write!(f, "target out of reach"),
            Self::NoSuchItem => write!(f, "item not in inventory"),
            Self::NoWindow => write!(f, "no open window"),
            Self::InventoryFull => write!(f, "inventory full"),
            Self::Rejected(reason) => write!(f, "rejected: {reason}"),
        }
    }
}

pub type AgentResult<T> = Result<T, AgentError>;

// ─── Agent contract ──────────────────────────────────────────────────

/// Capabilities the engine reads and writes on the driven game agent.
///
/// Reads are cheap transient snapshots re-taken every tick. Actuators are
/// non-blocking: they start an action whose effect is observed through
/// reads on subsequent ticks. Pathfinding, click arithmetic, and block
/// tracking live behind this trait, not in the engine.
pub trait Agent {
    // ── Spatial ──
    fn position(&self) -> Vec3;
    fn velocity(&self) -> Vec3;
    fn yaw(&self) -> f64;
    fn on_ground(&self) -> bool;
    fn in_water(&self) -> bool;
    fn in_lava(&self) -> bool;
    /// Whether the agent is standing on a climbable block (ladder, vine).
    /// The adapter decides what counts as climbable.
    fn is_on_climbable(&self) -> bool;
    fn dimension(&self) -> Dimension;
    fn block_at(&self, pos: BlockPos) -> Option<BlockInfo>;
    /// The block currently under the crosshair within `range`.
    fn block_at_cursor(&self, range: f64) -> Option<BlockInfo>;
    /// Nearest block whose name is in `names`, within `radius` of the
    /// agent, skipping positions in `exclude` (callers blacklist spots
    /// they failed to work). Backed by the adapter's block tracker.
    fn find_nearest_block(&self, names: &[&str], radius: f64, exclude: &[BlockPos])
        -> Option<BlockPos>;
    fn entities(&self) -> Vec<EntityInfo>;

    // ── Vitals ──
    fn health(&self) -> f64;
    fn food_level(&self) -> u32;
    fn is_sleeping(&self) -> bool;

    // ── Inventory ──
    fn items(&self) -> Vec<ItemStack>;
    fn slot_item(&self, slot: u32) -> Option<ItemStack>;
    fn cursor_stack(&self) -> Option<ItemStack>;
    fn held_item(&self) -> Option<ItemStack>;
    fn first_empty_inventory_slot(&self) -> Option<u32>;

    // ── Actuators ──
    fn set_control_state(&mut self, control: ControlState, active: bool);
    fn clear_control_states(&mut self);
    fn look(&mut self, yaw: f64, pitch: f64);
    fn look_at(&mut self, target: Vec3);
    /// Start or continue digging the block. Re-issued every tick while a
    /// leaf wants the block gone.
    fn dig(&mut self, pos: BlockPos) -> AgentResult<()>;
    fn stop_digging(&mut self);
    /// Place one `item` block at `pos` (the adapter picks the support face).
    fn place_block(&mut self, pos: BlockPos, item: &str) -> AgentResult<()>;
    /// Right-click a block without placing (beds, doors, levers).
    fn activate_block(&mut self, pos: BlockPos) -> AgentResult<()>;
    /// Right-click with the held item (eat, bucket).
    fn activate_item(&mut self) -> AgentResult<()>;
    fn equip(&mut self, item: &str, slot: EquipSlot) -> AgentResult<()>;
    fn attack(&mut self, entity_id: u32) -> AgentResult<()>;
    fn toss(&mut self, item: &str, count: u32) -> AgentResult<()>;

    // ── Windows ──
    fn open_container(&mut self, pos: BlockPos) -> AgentResult<WindowKind>;
    fn close_window(&mut self);
    fn current_window(&self) -> Option<WindowInfo>;
    /// Raw window click (slot, right button, shift held).
    fn click_window(&mut self, slot: u32, right: bool, shift: bool) -> AgentResult<()>;
    /// Move up to `count` of `item` from the inventory into a window slot,
    /// returning how many were moved. The click arithmetic is the
    /// adapter's problem.
    fn fill_window_slot(&mut self, item: &str, count: u32, slot: u32) -> AgentResult<u32>;
    /// Take whatever sits in a window slot back into the inventory.
    fn take_window_slot(&mut self, slot: u32) -> AgentResult<Option<ItemStack>>;
    /// Run `count` crafts of `recipe`, in the 2x2 grid or at the open
    /// table at `table`. Completion is observed via inventory reads.
    fn craft(&mut self, recipe: &Recipe, count: u32, table: Option<BlockPos>) -> AgentResult<()>;

    // ── Clock ──
    /// Monotonic game-tick counter, 20 per game-second.
    fn game_ticks(&self) -> u64;
}

/// Total count of `name` across the agent's inventory.
pub fn count_of(agent: &dyn Agent, name: &str) -> u32 {
    agent
        .items()
        .iter()
        .filter(|s| s.name == name)
        .map(|s| s.count)
        .sum()
}
