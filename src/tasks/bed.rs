//! Sleep in a bed and set the respawn point.

use std::any::Any;

use crate::agent::types::{BlockPos, Dimension};
use crate::agent::Agent;
use crate::catalogue::tables::BED_BLOCKS;
use crate::config;
use crate::engine::task::Task;
use crate::engine::timer::TickTimer;

use super::movement::{GetToBlockTask, InteractBlockTask, PlaceBlockTask};

/// How long an accepted bed click may sit without sleep starting before
/// a fresh click is issued.
const CLICK_RETRY_TICKS: u64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BedState {
    FindingBed,
    Approaching,
    Sleeping,
    WaitingForSleep,
    FindingPlaceLocation,
    PlacingBed,
    Finished,
    Failed,
}

/// Find (or place) a bed, sleep in it, finish on wake. Refuses to run
/// outside the overworld, where a used bed explodes.
pub struct PlaceBedAndSetSpawnTask {
    place_if_missing: bool,
    state: BedState,
    bed_pos: Option<BlockPos>,
    was_asleep: bool,
    sleep_wait_started: Option<u64>,
    click_timer: TickTimer,
    click_attempt: u32,
}

impl PlaceBedAndSetSpawnTask {
    pub fn new() -> Self {
        Self {
            place_if_missing: false,
            state: BedState::FindingBed,
            bed_pos: None,
            was_asleep: false,
            sleep_wait_started: None,
            click_timer: TickTimer::new(CLICK_RETRY_TICKS),
            click_attempt: 0,
        }
    }

    /// Allow placing a held bed when none is found nearby.
    pub fn placing_if_missing(mut self) -> Self {
        self.place_if_missing = true;
        self
    }

    fn held_bed_item(agent: &dyn Agent) -> Option<String> {
        agent
            .items()
            .into_iter()
            .find(|s| s.name.ends_with("_bed"))
            .map(|s| s.name)
    }

    /// Two adjacent air blocks with solid ground under each, near the
    /// agent.
    fn find_place_spot(agent: &dyn Agent) -> Option<BlockPos> {
        let feet = BlockPos::containing(agent.position());
        for dx in -4..=4 {
            for dz in -4..=4 {
                let head = feet.offset(dx, 0, dz);
                let foot = head.offset(1, 0, 0);
                let clear = |p: BlockPos| agent.block_at(p).is_some_and(|b| b.is_air());
                let solid = |p: BlockPos| {
                    agent
                        .block_at(p)
                        .is_some_and(|b| b.shape == crate::agent::types::BlockShape::Solid)
                };
                if clear(head) && clear(foot) && solid(head.down()) && solid(foot.down()) {
                    return Some(head);
                }
            }
        }
        None
    }
}

impl Default for PlaceBedAndSetSpawnTask {
    fn default() -> Self {
        Self::new()
    }
}

impl Task for PlaceBedAndSetSpawnTask {
    fn display_name(&self) -> String {
        "place-bed-and-set-spawn".to_string()
    }

    fn on_tick(&mut self, agent: &mut dyn Agent) -> Option<Box<dyn Task>> {
        if agent.dimension() != Dimension::Overworld {
            self.state = BedState::Failed;
        }
        match self.state {
            BedState::Finished | BedState::Failed => None,

            BedState::FindingBed => {
                match agent.find_nearest_block(BED_BLOCKS, config::BED_SEARCH_RADIUS, &[]) {
                    Some(pos) => {
                        self.bed_pos = Some(pos);
                        self.state = BedState::Approaching;
                    }
                    None => {
                        if self.place_if_missing && Self::held_bed_item(&*agent).is_some() {
                            self.state = BedState::FindingPlaceLocation;
                        } else {
                            self.state = BedState::Failed;
                        }
                    }
                }
                None
            }

            BedState::Approaching => {
                let Some(pos) = self.bed_pos else {
                    self.state = BedState::FindingBed;
                    return None;
                };
                if pos.distance_to(agent.position()) > config::BLOCK_REACH {
                    return Some(GetToBlockTask::boxed(pos, config::BLOCK_REACH));
                }
                self.state = BedState::Sleeping;
                None
            }

            BedState::Sleeping => {
                let Some(pos) = self.bed_pos else {
                    self.state = BedState::FindingBed;
                    return None;
                };
                let started = *self
                    .sleep_wait_started
                    .get_or_insert(agent.game_ticks());
                if agent.game_ticks().saturating_sub(started) > config::SLEEP_TIMEOUT_TICKS {
                    self.state = BedState::Failed;
                    return None;
                }
                if agent.block_at(pos).map_or(true, |b| !b.name.ends_with("_bed")) {
                    // Bed broke under us; start over.
                    self.bed_pos = None;
                    self.state = BedState::FindingBed;
                    return None;
                }
                if agent.is_sleeping() {
                    self.state = BedState::WaitingForSleep;
                    return None;
                }
                // Delegate the click; an accepted click that never puts
                // us to sleep (mobs nearby, daytime) gets a fresh
                // attempt once the retry window passes.
                if self.click_timer.elapsed(&*agent) {
                    self.click_attempt += 1;
                    self.click_timer.reset(&*agent);
                }
                Some(Box::new(
                    InteractBlockTask::new(pos).with_attempt(self.click_attempt),
                ))
            }

            BedState::WaitingForSleep => {
                if agent.is_sleeping() {
                    self.was_asleep = true;
                    return None;
                }
                if self.was_asleep {
                    // Woke up: spawn is set.
                    self.state = BedState::Finished;
                    return None;
                }
                let started = self.sleep_wait_started.unwrap_or_else(|| agent.game_ticks());
                if agent.game_ticks().saturating_sub(started) > config::SLEEP_TIMEOUT_TICKS {
                    self.state = BedState::Failed;
                } else {
                    // Click registered but sleep has not started; retry.
                    self.state = BedState::Sleeping;
                }
                None
            }

            BedState::FindingPlaceLocation => {
                match Self::find_place_spot(&*agent) {
                    Some(pos) => {
                        self.bed_pos = Some(pos);
                        self.state = BedState::PlacingBed;
                    }
                    None => self.state = BedState::Failed,
                }
                None
            }

            BedState::PlacingBed => {
                let Some(pos) = self.bed_pos else {
                    self.state = BedState::FindingPlaceLocation;
                    return None;
                };
                if agent
                    .block_at(pos)
                    .is_some_and(|b| b.name.ends_with("_bed"))
                {
                    self.state = BedState::Approaching;
                    return None;
                }
                let Some(item) = Self::held_bed_item(&*agent) else {
                    self.state = BedState::Failed;
                    return None;
                };
                Some(PlaceBlockTask::boxed(pos, &item))
            }
        }
    }

    fn is_finished(&self, _agent: &dyn Agent) -> bool {
        matches!(self.state, BedState::Finished | BedState::Failed)
    }

    fn is_failed(&self) -> bool {
        self.state == BedState::Failed
    }

    fn is_equal(&self, other: &dyn Task) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|o| o.place_if_missing == self.place_if_missing)
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

    #[test]
    fn refuses_to_run_outside_the_overworld() {
        let mut agent = SimAgent::new();
        agent.world_dimension = Dimension::Nether;
        let mut node = TaskNode::new(Box::new(PlaceBedAndSetSpawnTask::new()));
        node.tick(&mut agent);
        assert!(node.is_finished(&agent));
        assert!(node.is_failed());
    }

    #[test]
    fn sleeps_in_an_existing_bed_and_sets_spawn() {
        let mut agent = SimAgent::new();
        let bed = BlockPos::new(2, 64, 0);
        agent.set_block(bed, "red_bed");
        let mut node = TaskNode::new(Box::new(PlaceBedAndSetSpawnTask::new()));

        drive(&mut node, &mut agent, 200);
        assert!(node.is_finished(&agent), "{}", node.task_chain_string());
        assert!(!node.is_failed());
        assert_eq!(agent.spawn_point, Some(bed));
    }

    #[test]
    fn fails_with_no_bed_and_no_item() {
        let mut agent = SimAgent::new();
        let mut node = TaskNode::new(Box::new(PlaceBedAndSetSpawnTask::new()));
        drive(&mut node, &mut agent, 10);
        assert!(node.is_failed());
    }

    #[test]
    fn places_a_held_bed_when_none_is_found() {
        let mut agent = SimAgent::new();
        agent.give("white_bed", 1);
        // Solid floor so a placement spot exists.
        for dx in -5..=5 {
            for dz in -5..=5 {
                agent.set_block(BlockPos::new(dx, 63, dz), "stone");
            }
        }
        let mut node = TaskNode::new(Box::new(
            PlaceBedAndSetSpawnTask::new().placing_if_missing(),
        ));

        drive(&mut node, &mut agent, 300);
        assert!(node.is_finished(&agent), "{}", node.task_chain_string());
        assert!(!node.is_failed());
        assert!(agent.spawn_point.is_some());
        assert_eq!(agent.count("white_bed"), 0);
    }
}
