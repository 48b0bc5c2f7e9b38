//! Construction leaves: region clearing, lava capping, golem building.

use std::any::Any;

use crate::agent::types::{BlockPos, Dimension};
use crate::agent::Agent;
use crate::catalogue::recipe::ItemTarget;
use crate::catalogue::tables::{MINING_SOURCES, THROWAWAY_BLOCKS};
use crate::config;
use crate::engine::task::Task;

use super::movement::{DestroyBlockTask, PlaceBlockTask};
use super::resources::MineAndCollect;

// ─── ClearRegionTask ─────────────────────────────────────────────────

/// Remove every block in an inclusive region. Scans top-down so gravity
/// blocks fall into already-scanned space instead of above the agent.
pub struct ClearRegionTask {
    from: BlockPos,
    to: BlockPos,
}

impl ClearRegionTask {
    /// Corners in any order; the region is normalized.
    pub fn new(a: BlockPos, b: BlockPos) -> Self {
        Self {
            from: BlockPos::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            to: BlockPos::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    fn next_block(&self, agent: &dyn Agent) -> Option<BlockPos> {
        for y in (self.from.y..=self.to.y).rev() {
            for x in self.from.x..=self.to.x {
                for z in self.from.z..=self.to.z {
                    let pos = BlockPos::new(x, y, z);
                    if agent.block_at(pos).is_some_and(|b| !b.is_air()) {
                        return Some(pos);
                    }
                }
            }
        }
        None
    }
}

impl Task for ClearRegionTask {
    fn display_name(&self) -> String {
        format!(
            "clear-region(({},{},{})..({},{},{}))",
            self.from.x, self.from.y, self.from.z, self.to.x, self.to.y, self.to.z
        )
    }

    fn on_tick(&mut self, agent: &mut dyn Agent) -> Option<Box<dyn Task>> {
        self.next_block(&*agent).map(DestroyBlockTask::boxed)
    }

    fn is_finished(&self, agent: &dyn Agent) -> bool {
        self.next_block(agent).is_none()
    }

    fn is_equal(&self, other: &dyn Task) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|o| o.from == self.from && o.to == self.to)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ─── CoverWithBlocksTask ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CoverState {
    GettingBlocks,
    GoingToNether,
    SearchingLava,
    Covering(BlockPos),
}

/// Nether safety daemon: keep capping lava at the edge of pools with
/// throwaway blocks. Never finishes; it cycles back to searching after
/// every placement and to collecting whenever the block reserve runs
/// low.
pub struct CoverWithBlocksTask {
    state: CoverState,
    /// Lava positions judged not worth capping (not at a pool edge).
    rejected: Vec<BlockPos>,
}

impl CoverWithBlocksTask {
    pub fn new() -> Self {
        Self {
            state: CoverState::GettingBlocks,
            rejected: Vec::new(),
        }
    }

    fn throwaway_count(agent: &dyn Agent) -> u32 {
        THROWAWAY_BLOCKS
            .iter()
            .map(|b| crate::agent::count_of(agent, b))
            .sum()
    }

    fn throwaway_item(agent: &dyn Agent) -> Option<String> {
        THROWAWAY_BLOCKS
            .iter()
            .find(|b| crate::agent::count_of(agent, b) > 0)
            .map(|b| (*b).to_string())
    }

    /// A lava block is worth capping iff the block above is air and at
    /// least one cardinal neighbour is not lava (the edge of a pool).
    pub fn valid_to_cover(agent: &dyn Agent, pos: BlockPos) -> bool {
        let above_air = agent.block_at(pos.up()).is_some_and(|b| b.is_air());
        if !above_air {
            return false;
        }
        pos.cardinals()
            .iter()
            .any(|n| agent.block_at(*n).map_or(true, |b| b.name != "lava"))
    }

    fn collect_task() -> Box<dyn Task> {
        let names: Vec<String> = THROWAWAY_BLOCKS.iter().map(|b| (*b).to_string()).collect();
        let sources = THROWAWAY_BLOCKS
            .iter()
            .filter_map(|b| {
                MINING_SOURCES
                    .get(*b)
                    .map(|blocks| ((*b).to_string(), blocks.clone()))
            })
            .collect();
        MineAndCollect::task(
            vec![ItemTarget::new(names, config::COVER_MIN_THROWAWAY_BLOCKS)],
            sources,
        )
    }
}

impl Default for CoverWithBlocksTask {
    fn default() -> Self {
        Self::new()
    }
}

impl Task for CoverWithBlocksTask {
    fn display_name(&self) -> String {
        "cover-lava".to_string()
    }

    fn on_tick(&mut self, agent: &mut dyn Agent) -> Option<Box<dyn Task>> {
        // Reserve first: covering burns blocks continuously.
        if Self::throwaway_count(&*agent) < config::COVER_MIN_THROWAWAY_BLOCKS {
            self.state = CoverState::GettingBlocks;
            return Some(Self::collect_task());
        }

        // Wrong dimension: hold until the driving application gets the
        // agent into the Nether; portal travel is not an engine concern.
        if agent.dimension() != Dimension::Nether {
            self.state = CoverState::GoingToNether;
            return None;
        }

        if let CoverState::Covering(pos) = self.state {
            if agent.block_at(pos).is_some_and(|b| b.name == "lava") {
                if let Some(item) = Self::throwaway_item(&*agent) {
                    return Some(PlaceBlockTask::boxed(pos, &item));
                }
            }
            self.state = CoverState::SearchingLava;
        }

        self.state = CoverState::SearchingLava;
        // A bounded number of rejections per tick keeps the scan cheap.
        for _ in 0..16 {
            let Some(pos) =
                agent.find_nearest_block(&["lava"], config::MINE_SEARCH_RADIUS, &self.rejected)
            else {
                return None;
            };
            if Self::valid_to_cover(&*agent, pos) {
                self.state = CoverState::Covering(pos);
                if let Some(item) = Self::throwaway_item(&*agent) {
                    return Some(PlaceBlockTask::boxed(pos, &item));
                }
                return None;
            }
            self.rejected.push(pos);
        }
        None
    }

    fn is_finished(&self, _agent: &dyn Agent) -> bool {
        false // daemon
    }

    fn is_equal(&self, other: &dyn Task) -> bool {
        other.as_any().downcast_ref::<Self>().is_some()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ─── ConstructIronGolemTask ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GolemState {
    Building,
    Waiting,
    Finished,
    Failed,
}

/// Build the T of iron blocks plus the pumpkin head and wait for the
/// golem to appear. Base, center, east arm, west arm, clear the sides at
/// the base layer, then the head.
pub struct ConstructIronGolemTask {
    base: BlockPos,
    state: GolemState,
    wait_started: Option<u64>,
}

impl ConstructIronGolemTask {
    pub fn new(base: BlockPos) -> Self {
        Self {
            base,
            state: GolemState::Building,
            wait_started: None,
        }
    }

    fn placements(&self) -> [(BlockPos, &'static str); 4] {
        let center = self.base.up();
        [
            (self.base, "iron_block"),
            (center, "iron_block"),
            (center.offset(1, 0, 0), "iron_block"),
            (center.offset(-1, 0, 0), "iron_block"),
        ]
    }

    fn side_clears(&self) -> [BlockPos; 2] {
        [self.base.offset(1, 0, 0), self.base.offset(-1, 0, 0)]
    }

    fn head(&self) -> BlockPos {
        self.base.up().up()
    }

    fn golem_nearby(&self, agent: &dyn Agent) -> bool {
        agent.entities().iter().any(|e| {
            e.valid
                && e.name.contains("iron_golem")
                && e.position.distance_to(self.base.center()) <= config::GOLEM_DETECT_RADIUS
        })
    }

    fn missing_materials(&self, agent: &dyn Agent) -> bool {
        let placed_iron = self
            .placements()
            .iter()
            .filter(|(pos, item)| agent.block_at(*pos).is_some_and(|b| b.name == *item))
            .count() as u32;
        let head_placed = agent
            .block_at(self.head())
            .is_some_and(|b| b.name == "carved_pumpkin");
        crate::agent::count_of(agent, "iron_block") + placed_iron < 4
            || (!head_placed && crate::agent::count_of(agent, "carved_pumpkin") < 1)
    }
}

impl Task for ConstructIronGolemTask {
    fn display_name(&self) -> String {
        format!(
            "construct-iron-golem({},{},{})",
            self.base.x, self.base.y, self.base.z
        )
    }

    fn on_tick(&mut self, agent: &mut dyn Agent) -> Option<Box<dyn Task>> {
        match self.state {
            GolemState::Finished | GolemState::Failed => None,

            GolemState::Building => {
                if self.golem_nearby(&*agent) {
                    self.state = GolemState::Finished;
                    return None;
                }
                if self.missing_materials(&*agent) {
                    self.state = GolemState::Failed;
                    return None;
                }
                for (pos, item) in self.placements() {
                    if !agent.block_at(pos).is_some_and(|b| b.name == item) {
                        return Some(PlaceBlockTask::boxed(pos, item));
                    }
                }
                for pos in self.side_clears() {
                    if agent.block_at(pos).is_some_and(|b| !b.is_air()) {
                        return Some(DestroyBlockTask::boxed(pos));
                    }
                }
                let head = self.head();
                if !agent
                    .block_at(head)
                    .is_some_and(|b| b.name == "carved_pumpkin")
                {
                    return Some(PlaceBlockTask::boxed(head, "carved_pumpkin"));
                }
                self.wait_started = Some(agent.game_ticks());
                self.state = GolemState::Waiting;
                None
            }

            GolemState::Waiting => {
                if self.golem_nearby(&*agent) {
                    self.state = GolemState::Finished;
                    return None;
                }
                let started = self.wait_started.unwrap_or_else(|| agent.game_ticks());
                if agent.game_ticks().saturating_sub(started) > config::GOLEM_WAIT_TICKS {
                    self.state = GolemState::Failed;
                }
                None
            }
        }
    }

    fn is_finished(&self, _agent: &dyn Agent) -> bool {
        matches!(self.state, GolemState::Finished | GolemState::Failed)
    }

    fn is_failed(&self) -> bool {
        self.state == GolemState::Failed
    }

    fn is_equal(&self, other: &dyn Task) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|o| o.base == self.base)
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
    use crate::agent::types::Vec3;
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

    // ─── ClearRegion ───────────────────────────────────────────────

    #[test]
    fn clears_blocks_top_down() {
        let mut agent = SimAgent::new();
        agent.set_block(BlockPos::new(1, 64, 0), "stone");
        agent.set_block(BlockPos::new(1, 66, 0), "stone");
        let task = ClearRegionTask::new(BlockPos::new(2, 66, 1), BlockPos::new(0, 63, -1));
        // Normalization put the corners in order.
        assert_eq!(task.next_block(&agent), Some(BlockPos::new(1, 66, 0)));

        let mut node = TaskNode::new(Box::new(task));
        drive(&mut node, &mut agent, 100);
        assert!(node.is_finished(&agent));
        assert_eq!(agent.block_name(BlockPos::new(1, 64, 0)), "air");
        assert_eq!(agent.block_name(BlockPos::new(1, 66, 0)), "air");
    }

    #[test]
    fn empty_region_is_finished_immediately() {
        let agent = SimAgent::new();
        let task = ClearRegionTask::new(BlockPos::new(0, 60, 0), BlockPos::new(2, 62, 2));
        assert!(task.is_finished(&agent));
    }

    // ─── CoverWithBlocks ───────────────────────────────────────────

    #[test]
    fn lava_edge_detection() {
        let mut agent = SimAgent::new();
        let pool = BlockPos::new(5, 30, 5);
        agent.set_block(pool, "lava");
        // Edge of pool: air above, stone neighbour.
        agent.set_block(pool.offset(1, 0, 0), "stone");
        assert!(CoverWithBlocksTask::valid_to_cover(&agent, pool));

        // Interior: all four neighbours lava.
        let inner = BlockPos::new(10, 30, 10);
        agent.set_block(inner, "lava");
        for n in inner.cardinals() {
            agent.set_block(n, "lava");
        }
        assert!(!CoverWithBlocksTask::valid_to_cover(&agent, inner));

        // Covered from above: nothing to do.
        let roofed = BlockPos::new(15, 30, 15);
        agent.set_block(roofed, "lava");
        agent.set_block(roofed.up(), "netherrack");
        assert!(!CoverWithBlocksTask::valid_to_cover(&agent, roofed));
    }

    #[test]
    fn collects_blocks_before_covering() {
        let mut agent = SimAgent::new();
        agent.world_dimension = Dimension::Nether;
        let mut task = CoverWithBlocksTask::new();
        let sub = task.on_tick(&mut agent).expect("collect subtree");
        assert!(sub.display_name().contains("mine-and-collect"));
        assert!(!task.is_finished(&agent));
    }

    #[test]
    fn caps_edge_lava_with_throwaway() {
        let mut agent = SimAgent::new();
        agent.world_dimension = Dimension::Nether;
        agent.give("netherrack", config::COVER_MIN_THROWAWAY_BLOCKS + 4);
        let pool = BlockPos::new(2, 64, 0);
        agent.set_block(pool, "lava");
        agent.set_block(pool.offset(1, 0, 0), "netherrack");

        let mut node = TaskNode::new(Box::new(CoverWithBlocksTask::new()));
        for _ in 0..50 {
            node.tick(&mut agent);
            agent.step();
        }
        assert_eq!(agent.block_name(pool), "netherrack");
        // Daemon: still not finished.
        assert!(!node.is_finished(&agent));
    }

    // ─── ConstructIronGolem ────────────────────────────────────────

    #[test]
    fn fails_without_materials() {
        let mut agent = SimAgent::new();
        let mut node = TaskNode::new(Box::new(ConstructIronGolemTask::new(BlockPos::new(
            2, 64, 0,
        ))));
        node.tick(&mut agent);
        assert!(node.is_finished(&agent));
        assert!(node.is_failed());
    }

    #[test]
    fn builds_structure_then_detects_golem() {
        let mut agent = SimAgent::new();
        agent.give("iron_block", 4);
        agent.give("carved_pumpkin", 1);
        let base = BlockPos::new(2, 64, 0);
        let mut node = TaskNode::new(Box::new(ConstructIronGolemTask::new(base)));

        for _ in 0..60 {
            node.tick(&mut agent);
            agent.step();
            if node.is_finished(&agent) {
                break;
            }
        }
        // Structure is up, task waits on the spawn.
        assert_eq!(agent.block_name(base), "iron_block");
        assert_eq!(agent.block_name(base.up()), "iron_block");
        assert_eq!(agent.block_name(base.up().offset(1, 0, 0)), "iron_block");
        assert_eq!(agent.block_name(base.up().offset(-1, 0, 0)), "iron_block");
        assert_eq!(agent.block_name(base.up().up()), "carved_pumpkin");
        assert!(!node.is_finished(&agent));

        agent.add_mob("iron_golem", base.center(), 100.0);
        node.tick(&mut agent);
        assert!(node.is_finished(&agent));
        assert!(!node.is_failed());
    }

    #[test]
    fn golem_wait_times_out_to_failure() {
        let mut agent = SimAgent::new();
        agent.give("iron_block", 4);
        agent.give("carved_pumpkin", 1);
        let base = BlockPos::new(2, 64, 0);
        let mut node = TaskNode::new(Box::new(ConstructIronGolemTask::new(base)));

        for _ in 0..(config::GOLEM_WAIT_TICKS as usize + 40) {
            node.tick(&mut agent);
            agent.step();
            if node.is_finished(&agent) {
                break;
            }
        }
        assert!(node.is_finished(&agent));
        assert!(node.is_failed());
    }

    #[test]
    fn ignores_distant_golems() {
        let mut agent = SimAgent::new();
        agent.give("iron_block", 4);
        agent.give("carved_pumpkin", 1);
        let base = BlockPos::new(2, 64, 0);
        agent.add_mob("iron_golem", Vec3::new(50.0, 64.0, 50.0), 100.0);
        let task = ConstructIronGolemTask::new(base);
        assert!(!task.golem_nearby(&agent));
    }
}
