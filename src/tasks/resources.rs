//! The resource task family: loop until inventory counts meet targets.
//!
//! [`ResourceTask`] is the shared wrapper: it owns the item targets,
//! declares itself finished when every target's summed inventory count
//! is met, and otherwise delegates the tick to its [`ResourceWork`].
//! [`MineAndCollect`] and [`PickupWork`] are the two stock works.

use std::any::Any;
use std::collections::HashMap;

use crate::agent::types::BlockPos;
use crate::agent::Agent;
use crate::catalogue::recipe::ItemTarget;
use crate::config;
use crate::engine::task::Task;
use crate::engine::timer::TickTimer;

use super::movement::{DestroyBlockTask, GetToBlockTask};

// ─── Resource work contract ──────────────────────────────────────────

/// The per-kind half of a resource task. The wrapper handles target
/// accounting; the work decides what to do on a tick where targets are
/// still unmet.
pub trait ResourceWork: 'static {
    fn work_name(&self) -> &str;

    fn on_resource_start(&mut self, _agent: &mut dyn Agent) {}

    fn on_resource_tick(
        &mut self,
        agent: &mut dyn Agent,
        targets: &[ItemTarget],
    ) -> Option<Box<dyn Task>>;

    fn on_resource_stop(&mut self, _agent: &mut dyn Agent, _interrupt: Option<&dyn Task>) {}

    /// Parameter-level equality against another work of the same kind.
    fn resource_equal(&self, other: &Self) -> bool;

    /// Terminal failure local to the work (no sources, search exhausted).
    fn is_failed(&self) -> bool {
        false
    }
}

// ─── Wrapper ─────────────────────────────────────────────────────────

/// Wrapper task tying item targets to a [`ResourceWork`].
pub struct ResourceTask<W: ResourceWork> {
    targets: Vec<ItemTarget>,
    work: W,
}

impl<W: ResourceWork> ResourceTask<W> {
    pub fn new(targets: Vec<ItemTarget>, work: W) -> Self {
        assert!(!targets.is_empty(), "resource task needs targets");
        Self { targets, work }
    }

    pub fn targets(&self) -> &[ItemTarget] {
        &self.targets
    }

    fn targets_met(&self, agent: &dyn Agent) -> bool {
        self.targets.iter().all(|t| t.met(agent))
    }
}

impl<W: ResourceWork> Task for ResourceTask<W> {
    fn display_name(&self) -> String {
        let wants: Vec<String> = self
            .targets
            .iter()
            .map(|t| format!("{} x{}", t.first_name(), t.target_count))
            .collect();
        format!("{}[{}]", self.work.work_name(), wants.join(", "))
    }

    fn on_start(&mut self, agent: &mut dyn Agent) {
        self.work.on_resource_start(agent);
    }

    fn on_tick(&mut self, agent: &mut dyn Agent) -> Option<Box<dyn Task>> {
        if self.targets_met(&*agent) || self.work.is_failed() {
            return None;
        }
        self.work.on_resource_tick(agent, &self.targets)
    }

    fn on_stop(&mut self, agent: &mut dyn Agent, interrupt: Option<&dyn Task>) {
        self.work.on_resource_stop(agent, interrupt);
    }

    fn is_finished(&self, agent: &dyn Agent) -> bool {
        self.work.is_failed() || self.targets_met(agent)
    }

    fn is_failed(&self) -> bool {
        self.work.is_failed()
    }

    fn is_equal(&self, other: &dyn Task) -> bool {
        let Some(o) = other.as_any().downcast_ref::<Self>() else {
            return false;
        };
        o.targets.len() == self.targets.len()
            && self
                .targets
                .iter()
                .zip(o.targets.iter())
                .all(|(a, b)| a.same_names(b) && a.target_count == b.target_count)
            && self.work.resource_equal(&o.work)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ─── Mine and collect ────────────────────────────────────────────────

pub type MineAndCollectTask = ResourceTask<MineAndCollect>;

/// Break source blocks for the first unmet target, sweeping matching
/// drops as they appear. Positions that refuse to break in time are
/// blacklisted so the task changes intent instead of restart-looping.
pub struct MineAndCollect {
    sources: HashMap<String, Vec<String>>,
    search_radius: f64,
    blacklist: Vec<BlockPos>,
    current: Option<(BlockPos, u64)>,
    failed: bool,
}

impl MineAndCollect {
    pub fn new(sources: HashMap<String, Vec<String>>) -> Self {
        Self {
            sources,
            search_radius: config::MINE_SEARCH_RADIUS,
            blacklist: Vec::new(),
            current: None,
            failed: false,
        }
    }

    pub fn task(targets: Vec<ItemTarget>, sources: HashMap<String, Vec<String>>) -> Box<dyn Task> {
        Box::new(ResourceTask::new(targets, Self::new(sources)))
    }

    fn source_blocks<'s>(&'s self, target: &'s ItemTarget) -> Vec<&'s str> {
        target
            .acceptable_names()
            .filter_map(|n| self.sources.get(n))
            .flatten()
            .map(String::as_str)
            .collect()
    }
}

impl ResourceWork for MineAndCollect {
    fn work_name(&self) -> &str {
        "mine-and-collect"
    }

    fn on_resource_tick(
        &mut self,
        agent: &mut dyn Agent,
        targets: &[ItemTarget],
    ) -> Option<Box<dyn Task>> {
        let unmet = targets.iter().find(|t| !t.met(&*agent))?;

        // Drops on the ground beat digging for more.
        let has_drop = agent.entities().iter().any(|e| {
            e.valid
                && e.dropped_item().is_some_and(|(item, _)| unmet.matches(item))
                && e.position.distance_to(agent.position()) <= config::ITEM_SEARCH_RADIUS
        });
        if has_drop {
            return Some(PickupDroppedItems::task(vec![unmet.clone()]));
        }

        let names = self.source_blocks(unmet);
        if names.is_empty() {
            self.failed = true;
            return None;
        }
        let Some(pos) = agent.find_nearest_block(&names, self.search_radius, &self.blacklist)
        else {
            self.failed = true;
            return None;
        };

        // A block that will not break in time gets blacklisted.
        let now = agent.game_ticks();
        match self.current {
            Some((cur, since)) if cur == pos => {
                if now.saturating_sub(since) > config::MINE_BLOCK_TIMEOUT_TICKS {
                    self.blacklist.push(pos);
                    self.current = None;
                    return None;
                }
            }
            _ => self.current = Some((pos, now)),
        }
        Some(DestroyBlockTask::boxed(pos))
    }

    fn resource_equal(&self, other: &Self) -> bool {
        self.sources == other.sources && self.search_radius == other.search_radius
    }

    fn is_failed(&self) -> bool {
        self.failed
    }
}

// ─── Pickup dropped items ────────────────────────────────────────────

pub type PickupDroppedItemsTask = ResourceTask<PickupWork>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PickupState {
    Searching,
    GoingTo(u32),
    Waiting(u32),
}

/// Walk to matching dropped-item entities and wait for the pickup to
/// land. Items that stay on the ground after arrival count as blocked
/// and are skipped on later searches.
pub struct PickupWork {
    state: PickupState,
    blocked: Vec<u32>,
    wait_timer: TickTimer,
    search_started: Option<u64>,
    failed: bool,
}

impl Default for PickupWork {
    fn default() -> Self {
        Self {
            state: PickupState::Searching,
            blocked: Vec::new(),
            wait_timer: TickTimer::new(config::PICKUP_WAIT_TICKS),
            search_started: None,
            failed: false,
        }
    }
}

/// Namespace for the pickup constructors.
pub struct PickupDroppedItems;

impl PickupDroppedItems {
    pub fn task(targets: Vec<ItemTarget>) -> Box<dyn Task> {
        Box::new(ResourceTask::new(targets, PickupWork::default()))
    }
}

impl PickupWork {
    fn find_target(&self, agent: &dyn Agent, targets: &[ItemTarget]) -> Option<u32> {
        let mut best: Option<(u32, f64)> = None;
        for e in agent.entities() {
            let Some((item, _)) = e.dropped_item() else {
                continue;
            };
            if !e.valid || self.blocked.contains(&e.id) {
                continue;
            }
            if !targets.iter().any(|t| t.matches(item)) {
                continue;
            }
            let d = e.position.distance_to(agent.position());
            if d <= config::ITEM_SEARCH_RADIUS && best.map_or(true, |(_, bd)| d < bd) {
                best = Some((e.id, d));
            }
        }
        best.map(|(id, _)| id)
    }
}

impl ResourceWork for PickupWork {
    fn work_name(&self) -> &str {
        "pickup-drops"
    }

    fn on_resource_tick(
        &mut self,
        agent: &mut dyn Agent,
        targets: &[ItemTarget],
    ) -> Option<Box<dyn Task>> {
        match self.state {
            PickupState::Searching => {
                let started = *self.search_started.get_or_insert(agent.game_ticks());
                match self.find_target(&*agent, targets) {
                    Some(id) => {
                        self.search_started = None;
                        self.state = PickupState::GoingTo(id);
                    }
                    None => {
                        if agent.game_ticks().saturating_sub(started)
                            > config::PICKUP_SEARCH_TIMEOUT_TICKS
                        {
                            self.failed = true;
                        }
                    }
                }
                None
            }
            PickupState::GoingTo(id) => {
                let entity = agent
                    .entities()
                    .into_iter()
                    .find(|e| e.id == id && e.valid);
                let Some(entity) = entity else {
                    // Item vanished (picked up or despawned); recount.
                    self.state = PickupState::Searching;
                    return None;
                };
                // Slightly wider than the walk target's reach so an
                // arrival that lands between the two radii still moves
                // to Waiting instead of re-delegating forever.
                if entity.position.distance_to(agent.position())
                    <= config::ITEM_PICKUP_REACH + 0.75
                {
                    self.wait_timer.reset(&*agent);
                    self.state = PickupState::Waiting(id);
                    return None;
                }
                Some(GetToBlockTask::boxed(
                    BlockPos::containing(entity.position),
                    config::ITEM_PICKUP_REACH,
                ))
            }
            PickupState::Waiting(id) => {
                if !self.wait_timer.elapsed(&*agent) {
                    return None;
                }
                let still_there = agent.entities().iter().any(|e| e.id == id && e.valid);
                if still_there {
                    // Something blocks this pickup; skip it from now on.
                    self.blocked.push(id);
                }
                self.state = PickupState::Searching;
                None
            }
        }
    }

    fn resource_equal(&self, _other: &Self) -> bool {
        true
    }

    fn is_failed(&self) -> bool {
        self.failed
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
