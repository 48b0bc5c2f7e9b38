//! Shared world/agent value types.
//!
//! Everything the engine reads from or hands to an [`Agent`](super::Agent)
//! is expressed with these types. String names use the game's snake_case
//! identifiers (`oak_planks`, `iron_ore`) so they round-trip through serde
//! unchanged.

use serde::{Deserialize, Serialize};

// ─── Geometry ────────────────────────────────────────────────────────

/// A floating-point position or velocity in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn distance_to(&self, other: Vec3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Distance ignoring the Y axis.
    pub fn horizontal_distance_to(&self, other: Vec3) -> f64 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }
}

/// An integer block coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The block containing a world position.
    pub fn containing(pos: Vec3) -> Self {
        Self {
            x: pos.x.floor() as i32,
            y: pos.y.floor() as i32,
            z: pos.z.floor() as i32,
        }
    }

    /// Center of the block in world space.
    pub fn center(&self) -> Vec3 {
        Vec3::new(
            f64::from(self.x) + 0.5,
            f64::from(self.y) + 0.5,
            f64::from(self.z) + 0.5,
        )
    }

    pub fn offset(&self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    pub fn up(&self) -> Self {
        self.offset(0, 1, 0)
    }

    pub fn down(&self) -> Self {
        self.offset(0, -1, 0)
    }

    /// The four horizontal neighbours (north, south, west, east).
    pub fn cardinals(&self) -> [BlockPos; 4] {
        [
            self.offset(0, 0, -1),
            self.offset(0, 0, 1),
            self.offset(-1, 0, 0),
            self.offset(1, 0, 0),
        ]
    }

    pub fn distance_to(&self, pos: Vec3) -> f64 {
        self.center().distance_to(pos)
    }
}

// ─── Blocks ──────────────────────────────────────────────────────────

/// Coarse bounding-box kind of a block, enough for standability and
/// emptiness checks. Anything the agent cannot classify reports `Solid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockShape {
    Empty,
    Solid,
    Liquid,
}

/// A known block in the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub pos: BlockPos,
    pub name: String,
    pub shape: BlockShape,
}

impl BlockInfo {
    pub fn is_air(&self) -> bool {
        self.shape == BlockShape::Empty
    }
}

// ─── Entities ────────────────────────────────────────────────────────

/// What kind of thing an entity is, with the payload the engine cares
/// about for dropped items.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityKind {
    Player,
    Mob,
    DroppedItem { item: String, count: u32 },
    Other,
}

/// A snapshot of a known entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityInfo {
    pub id: u32,
    pub name: String,
    pub position: Vec3,
    pub velocity: Vec3,
    pub valid: bool,
    pub kind: EntityKind,
}

impl EntityInfo {
    /// The dropped-item payload, if this entity is one.
    pub fn dropped_item(&self) -> Option<(&str, u32)> {
        match &self.kind {
            EntityKind::DroppedItem { item, count } => Some((item.as_str(), *count)),
            _ => None,
        }
    }
}

// ─── Inventory ───────────────────────────────────────────────────────

/// A stack of items in a concrete inventory slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ItemStack {
    pub name: String,
    pub count: u32,
    pub slot: u32,
    pub stack_size: u32,
}

/// Destination for [`Agent::equip`](super::Agent::equip).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquipSlot {
    Hand,
    OffHand,
    Head,
    Chest,
    Legs,
    Feet,
}

// ─── World / control ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Overworld,
    Nether,
    End,
}

impl Dimension {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Overworld => "overworld",
            Self::Nether => "nether",
            Self::End => "end",
        }
    }
}

/// A held movement control, mirroring the client's key states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlState {
    Forward,
    Back,
    Left,
    Right,
    Jump,
    Sprint,
    Sneak,
}

/// Kind of an open container window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    CraftingTable,
    Furnace,
    Other,
}

/// The currently open window, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowInfo {
    pub kind: WindowKind,
    /// Block the window was opened from, when known.
    pub pos: Option<BlockPos>,
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_pos_containing_floors_negatives() {
        let pos = BlockPos::containing(Vec3::new(-0.5, 64.9, 3.2));
        assert_eq!(pos, BlockPos::new(-1, 64, 3));
    }

    #[test]
    fn block_pos_center() {
        let c = BlockPos::new(1, 2, -3).center();
        assert_eq!(c, Vec3::new(1.5, 2.5, -2.5));
    }

    #[test]
    fn cardinals_are_horizontal() {
        let p = BlockPos::new(0, 10, 0);
        for n in p.cardinals() {
            assert_eq!(n.y, 10);
            assert_eq!((n.x - p.x).abs() + (n.z - p.z).abs(), 1);
        }
    }

    #[test]
    fn horizontal_distance_ignores_y() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(3.0, 100.0, 4.0);
        assert!((a.horizontal_distance_to(b) - 5.0).abs() < 1e-9);
    }
}
