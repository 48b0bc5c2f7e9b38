//! Primitive movement and block leaves.
//!
//! These are the leaves every higher task bottoms out in: walk toward a
//! block or point, break a block, place a block, right-click a block,
//! wander out of a stuck spot. They steer rather than pathfind (look at
//! the target and hold Forward); adapters that carry a real pathfinder
//! can substitute richer behaviour behind the same agent surface.

use std::any::Any;

use rand::Rng;

use crate::agent::types::{BlockPos, ControlState, Vec3};
use crate::agent::{Agent, AgentError};
use crate::config;
use crate::engine::progress::ProgressChecker;
use crate::engine::task::Task;

// ─── Steering core ───────────────────────────────────────────────────

/// Shared steer-with-recovery state embedded by the walking leaves:
/// look at the target, hold Forward, wander for a bounded window when
/// displacement stalls, fail hard after too many recoveries.
struct Steering {
    checker: ProgressChecker,
    wander_until: Option<u64>,
    retries: u32,
    failed: bool,
}

impl Steering {
    fn new() -> Self {
        Self {
            checker: ProgressChecker::for_movement(),
            wander_until: None,
            retries: 0,
            failed: false,
        }
    }

    fn reset(&mut self, agent: &dyn Agent) {
        self.checker.reset();
        self.checker.update(agent);
    }

    /// One steering tick toward `target`. Returns the recovery subtask
    /// while a stuck-wander window is open.
    fn advance(&mut self, agent: &mut dyn Agent, target: Vec3) -> Option<Box<dyn Task>> {
        // Mid-recovery: keep the wander subtask until its window closes.
        if let Some(until) = self.wander_until {
            if agent.game_ticks() < until {
                return Some(Box::new(TimeoutWanderTask::new(
                    config::WANDER_TICKS,
                    self.retries,
                )));
            }
            self.wander_until = None;
            self.checker.reset();
        }

        agent.look_at(target);
        agent.set_control_state(ControlState::Forward, true);
        self.checker.update(&*agent);

        if self.checker.failed(&*agent) {
            self.retries += 1;
            if self.retries > config::MAX_STUCK_RETRIES {
                self.failed = true;
                agent.clear_control_states();
                return None;
            }
            self.wander_until = Some(agent.game_ticks() + config::WANDER_TICKS);
            self.checker.reset();
            return Some(Box::new(TimeoutWanderTask::new(
                config::WANDER_TICKS,
                self.retries,
            )));
        }
        None
    }
}

// ─── GetToBlockTask ──────────────────────────────────────────────────

/// Walk until within `reach` of a block position.
pub struct GetToBlockTask {
    target: BlockPos,
    reach: f64,
    steering: Steering,
}

impl GetToBlockTask {
    pub fn new(target: BlockPos, reach: f64) -> Self {
        Self {
            target,
            reach,
            steering: Steering::new(),
        }
    }

    pub fn boxed(target: BlockPos, reach: f64) -> Box<dyn Task> {
        Box::new(Self::new(target, reach))
    }

    fn arrived(&self, agent: &dyn Agent) -> bool {
        self.target.distance_to(agent.position()) <= self.reach
    }
}

impl Task for GetToBlockTask {
    fn display_name(&self) -> String {
        format!(
            "get-to-block({},{},{})",
            self.target.x, self.target.y, self.target.z
        )
    }

    fn on_start(&mut self, agent: &mut dyn Agent) {
        self.steering.reset(&*agent);
    }

    fn on_tick(&mut self, agent: &mut dyn Agent) -> Option<Box<dyn Task>> {
        if self.steering.failed {
            return None;
        }
        if self.arrived(&*agent) {
            agent.set_control_state(ControlState::Forward, false);
            return None;
        }
        self.steering.advance(agent, self.target.center())
    }

    fn on_stop(&mut self, agent: &mut dyn Agent, _interrupt: Option<&dyn Task>) {
        agent.clear_control_states();
    }

    fn is_finished(&self, agent: &dyn Agent) -> bool {
        self.steering.failed || self.arrived(agent)
    }

    fn is_failed(&self) -> bool {
        self.steering.failed
    }

    fn is_equal(&self, other: &dyn Task) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|o| o.target == self.target && o.reach == self.reach)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ─── GetWithinRangeTask ──────────────────────────────────────────────

/// Walk until within `range` of a world point. The point variant of
/// [`GetToBlockTask`], used for chasing entities; equality compares the
/// containing block so a drifting target does not restart the walk
/// every tick.
pub struct GetWithinRangeTask {
    target: Vec3,
    range: f64,
    steering: Steering,
}

impl GetWithinRangeTask {
    pub fn new(target: Vec3, range: f64) -> Self {
        Self {
            target,
            range,
            steering: Steering::new(),
        }
    }

    pub fn boxed(target: Vec3, range: f64) -> Box<dyn Task> {
        Box::new(Self::new(target, range))
    }

    fn arrived(&self, agent: &dyn Agent) -> bool {
        self.target.distance_to(agent.position()) <= self.range
    }
}

impl Task for GetWithinRangeTask {
    fn display_name(&self) -> String {
        format!(
            "get-within-range({:.1},{:.1},{:.1})",
            self.target.x, self.target.y, self.target.z
        )
    }

    fn on_start(&mut self, agent: &mut dyn Agent) {
        self.steering.reset(&*agent);
    }

    fn on_tick(&mut self, agent: &mut dyn Agent) -> Option<Box<dyn Task>> {
        if self.steering.failed {
            return None;
        }
        if self.arrived(&*agent) {
            agent.set_control_state(ControlState::Forward, false);
            return None;
        }
        self.steering.advance(agent, self.target)
    }

    fn on_stop(&mut self, agent: &mut dyn Agent, _interrupt: Option<&dyn Task>) {
        agent.clear_control_states();
    }

    fn is_finished(&self, agent: &dyn Agent) -> bool {
        self.steering.failed || self.arrived(agent)
    }

    fn is_failed(&self) -> bool {
        self.steering.failed
    }

    fn is_equal(&self, other: &dyn Task) -> bool {
        other.as_any().downcast_ref::<Self>().is_some_and(|o| {
            BlockPos::containing(o.target) == BlockPos::containing(self.target)
                && o.range == self.range
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ─── TimeoutWanderTask ───────────────────────────────────────────────

/// Walk in a random direction for a fixed number of game ticks. The
/// `attempt` number distinguishes successive recoveries so a parent's
/// fresh wander replaces a finished one instead of being deduplicated.
pub struct TimeoutWanderTask {
    duration_ticks: u64,
    attempt: u32,
    ends_at: Option<u64>,
}

impl TimeoutWanderTask {
    pub fn new(duration_ticks: u64, attempt: u32) -> Self {
        Self {
            duration_ticks,
            attempt,
            ends_at: None,
        }
    }
}

impl Task for TimeoutWanderTask {
    fn display_name(&self) -> String {
        format!("wander({})", self.attempt)
    }

    fn on_start(&mut self, agent: &mut dyn Agent) {
        self.ends_at = Some(agent.game_ticks() + self.duration_ticks);
        let yaw = rand::thread_rng().gen::<f64>() * 360.0 - 180.0;
        agent.look(yaw, 0.0);
        let pos = agent.position();
        let rad = yaw.to_radians();
        // Give the steer integration a concrete point to walk toward.
        agent.look_at(Vec3::new(
            pos.x + rad.cos() * 8.0,
            pos.y,
            pos.z + rad.sin() * 8.0,
        ));
        agent.set_control_state(ControlState::Forward, true);
    }

    fn on_tick(&mut self, _agent: &mut dyn Agent) -> Option<Box<dyn Task>> {
        None
    }

    fn on_stop(&mut self, agent: &mut dyn Agent, _interrupt: Option<&dyn Task>) {
        agent.clear_control_states();
    }

    fn is_finished(&self, agent: &dyn Agent) -> bool {
        self.ends_at
            .is_some_and(|end| agent.game_ticks() >= end)
    }

    fn is_equal(&self, other: &dyn Task) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|o| {
                o.duration_ticks == self.duration_ticks && o.attempt == self.attempt
            })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ─── DestroyBlockTask ────────────────────────────────────────────────

/// Break one block: approach, look, dig until the block reads as air.
/// Transient dig errors are swallowed; the world is re-read next tick.
pub struct DestroyBlockTask {
    pos: BlockPos,
}

impl DestroyBlockTask {
    pub fn new(pos: BlockPos) -> Self {
        Self { pos }
    }

    pub fn boxed(pos: BlockPos) -> Box<dyn Task> {
        Box::new(Self::new(pos))
    }

    fn gone(&self, agent: &dyn Agent) -> bool {
        agent.block_at(self.pos).map_or(true, |b| b.is_air())
    }
}

impl Task for DestroyBlockTask {
    fn display_name(&self) -> String {
        format!("destroy({},{},{})", self.pos.x, self.pos.y, self.pos.z)
    }

    fn on_tick(&mut self, agent: &mut dyn Agent) -> Option<Box<dyn Task>> {
        if self.gone(&*agent) {
            agent.stop_digging();
            return None;
        }
        if self.pos.distance_to(agent.position()) > config::BLOCK_REACH {
            return Some(GetToBlockTask::boxed(self.pos, config::BLOCK_REACH));
        }
        agent.look_at(self.pos.center());
        // A rejected dig just means the world moved under us; re-poll.
        let _ = agent.dig(self.pos);
        None
    }

    fn on_stop(&mut self, agent: &mut dyn Agent, _interrupt: Option<&dyn Task>) {
        agent.stop_digging();
    }

    fn is_finished(&self, agent: &dyn Agent) -> bool {
        self.gone(agent)
    }

    fn is_equal(&self, other: &dyn Task) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|o| o.pos == self.pos)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ─── PlaceBlockTask ──────────────────────────────────────────────────

/// Place one named block at a position. Fails terminally when the item
/// is missing from the inventory (the parent decides what to do about
/// that); other placement errors are re-tried by polling.
pub struct PlaceBlockTask {
    pos: BlockPos,
    item: String,
    failed: bool,
}

impl PlaceBlockTask {
    pub fn new(pos: BlockPos, item: &str) -> Self {
        Self {
            pos,
            item: item.to_string(),
            failed: false,
        }
    }

    pub fn boxed(pos: BlockPos, item: &str) -> Box<dyn Task> {
        Box::new(Self::new(pos, item))
    }

    fn placed(&self, agent: &dyn Agent) -> bool {
        agent
            .block_at(self.pos)
            .is_some_and(|b| b.name == self.item)
    }
}

impl Task for PlaceBlockTask {
    fn display_name(&self) -> String {
        format!(
            "place({} at {},{},{})",
            self.item, self.pos.x, self.pos.y, self.pos.z
        )
    }

    fn on_tick(&mut self, agent: &mut dyn Agent) -> Option<Box<dyn Task>> {
        if self.failed || self.placed(&*agent) {
            return None;
        }
        if self.pos.distance_to(agent.position()) > config::BLOCK_REACH {
            return Some(GetToBlockTask::boxed(self.pos, config::BLOCK_REACH));
        }
        agent.look_at(self.pos.center());
        match agent.place_block(self.pos, &self.item) {
            Ok(()) => {}
            Err(AgentError::NoSuchItem) => self.failed = true,
            Err(_) => {} // transient; re-poll next tick
        }
        None
    }

    fn is_finished(&self, agent: &dyn Agent) -> bool {
        self.failed || self.placed(agent)
    }

    fn is_failed(&self) -> bool {
        self.failed
    }

    fn is_equal(&self, other: &dyn Task) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|o| o.pos == self.pos && o.item == self.item)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ─── InteractBlockTask ───────────────────────────────────────────────

/// Right-click a block once (beds, doors, levers): approach, look,
/// activate. Transient click errors are re-tried by polling; the
/// `attempt` number lets a parent deliberately issue a fresh click after
/// observing that an accepted one had no effect.
pub struct InteractBlockTask {
    pos: BlockPos,
    attempt: u32,
    done: bool,
}

impl InteractBlockTask {
    pub fn new(pos: BlockPos) -> Self {
        Self {
            pos,
            attempt: 0,
            done: false,
        }
    }

    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt;
        self
    }

    pub fn boxed(pos: BlockPos) -> Box<dyn Task> {
        Box::new(Self::new(pos))
    }
}

impl Task for InteractBlockTask {
    fn display_name(&self) -> String {
        format!("interact({},{},{})", self.pos.x, self.pos.y, self.pos.z)
    }

    fn on_tick(&mut self, agent: &mut dyn Agent) -> Option<Box<dyn Task>> {
        if self.done {
            return None;
        }
        if self.pos.distance_to(agent.position()) > config::BLOCK_REACH {
            return Some(GetToBlockTask::boxed(self.pos, config::BLOCK_REACH));
        }
        agent.look_at(self.pos.center());
        // A rejected click is re-tried next tick against fresh state.
        if agent.activate_block(self.pos).is_ok() {
            self.done = true;
        }
        None
    }

    fn is_finished(&self, _agent: &dyn Agent) -> bool {
        self.done
    }

    fn is_equal(&self, other: &dyn Task) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|o| o.pos == self.pos && o.attempt == self.attempt)
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

    #[test]
    fn walks_into_reach_and_finishes() {
        let mut agent = SimAgent::new();
        agent.pos = Vec3::new(0.5, 64.0, 0.5);
        let target = BlockPos::new(6, 64, 0);
        let mut node = TaskNode::new(GetToBlockTask::boxed(target, 2.0));

        drive(&mut node, &mut agent, 200);
        assert!(node.is_finished(&agent));
        assert!(!node.is_failed());
        assert!(target.distance_to(agent.position()) <= 2.0);
    }

    #[test]
    fn immobilized_walk_fails_after_bounded_retries() {
        let mut agent = SimAgent::new();
        // Forward control held but no look target -> the sim never moves.
        let target = BlockPos::new(40, 64, 0);
        let mut node = TaskNode::new(Box::new({
            let mut t = GetToBlockTask::new(target, 1.0);
            // Shrink the windows so the test stays fast.
            t.steering.checker = ProgressChecker::new(0.25, 5);
            t
        }));

        // Freeze the agent by zeroing movement each step.
        for _ in 0..400 {
            node.tick(&mut agent);
            agent.pos = Vec3::new(0.5, 64.0, 0.5);
            agent.step();
            agent.pos = Vec3::new(0.5, 64.0, 0.5);
            if node.is_finished(&agent) {
                break;
            }
        }
        assert!(node.is_finished(&agent));
        assert!(node.is_failed());
    }

    #[test]
    fn walks_within_range_of_a_point() {
        let mut agent = SimAgent::new();
        let target = Vec3::new(7.5, 64.0, 0.5);
        let mut node = TaskNode::new(GetWithinRangeTask::boxed(target, 3.0));

        drive(&mut node, &mut agent, 200);
        assert!(node.is_finished(&agent));
        assert!(!node.is_failed());
        assert!(target.distance_to(agent.position()) <= 3.0);
    }

    #[test]
    fn range_task_equality_tolerates_in_block_drift() {
        let a = GetWithinRangeTask::new(Vec3::new(5.2, 64.0, 5.2), 3.0);
        let b = GetWithinRangeTask::new(Vec3::new(5.8, 64.0, 5.8), 3.0);
        let c = GetWithinRangeTask::new(Vec3::new(9.2, 64.0, 5.2), 3.0);
        assert!(a.is_equal(&b));
        assert!(!a.is_equal(&c));
    }

    #[test]
    fn destroys_a_block_within_reach() {
        let mut agent = SimAgent::new();
        let pos = BlockPos::new(2, 64, 0);
        agent.set_block(pos, "stone");
        let mut node = TaskNode::new(DestroyBlockTask::boxed(pos));

        drive(&mut node, &mut agent, 30);
        assert!(node.is_finished(&agent));
        assert_eq!(agent.block_name(pos), "air");
    }

    #[test]
    fn destroy_walks_to_distant_blocks_first() {
        let mut agent = SimAgent::new();
        let pos = BlockPos::new(12, 64, 0);
        agent.set_block(pos, "stone");
        let mut node = TaskNode::new(DestroyBlockTask::boxed(pos));

        node.tick(&mut agent);
        assert!(node.task_chain_string().contains("get-to-block"));
        drive(&mut node, &mut agent, 200);
        assert_eq!(agent.block_name(pos), "air");
    }

    #[test]
    fn place_fails_without_the_item() {
        let mut agent = SimAgent::new();
        let pos = BlockPos::new(1, 64, 0);
        let mut node = TaskNode::new(PlaceBlockTask::boxed(pos, "dirt"));
        node.tick(&mut agent);
        assert!(node.is_finished(&agent));
        assert!(node.is_failed());
    }

    #[test]
    fn place_succeeds_with_the_item() {
        let mut agent = SimAgent::new();
        agent.give("dirt", 1);
        let pos = BlockPos::new(1, 64, 0);
        let mut node = TaskNode::new(PlaceBlockTask::boxed(pos, "dirt"));
        node.tick(&mut agent);
        assert_eq!(agent.block_name(pos), "dirt");
        assert!(node.is_finished(&agent));
        assert!(!node.is_failed());
    }

    #[test]
    fn interact_approaches_then_activates() {
        let mut agent = SimAgent::new();
        let bed = BlockPos::new(9, 64, 0);
        agent.set_block(bed, "red_bed");
        let mut node = TaskNode::new(InteractBlockTask::boxed(bed));

        node.tick(&mut agent);
        assert!(node.task_chain_string().contains("get-to-block"));
        drive(&mut node, &mut agent, 200);
        assert!(node.is_finished(&agent));
        // The click landed: the sim put us to sleep.
        assert!(agent.sleeping);
    }

    #[test]
    fn interact_attempts_are_distinct_work() {
        let pos = BlockPos::new(1, 64, 0);
        let first = InteractBlockTask::new(pos).with_attempt(1);
        let second = InteractBlockTask::new(pos).with_attempt(2);
        assert!(first.is_equal(&InteractBlockTask::new(pos).with_attempt(1)));
        assert!(!first.is_equal(&second));
    }

    #[test]
    fn equality_is_parameterized() {
        let a = GetToBlockTask::new(BlockPos::new(1, 2, 3), 2.0);
        let b = GetToBlockTask::new(BlockPos::new(1, 2, 3), 2.0);
        let c = GetToBlockTask::new(BlockPos::new(9, 2, 3), 2.0);
        assert!(a.is_equal(&b));
        assert!(!a.is_equal(&c));
        let d = DestroyBlockTask::new(BlockPos::new(1, 2, 3));
        assert!(!a.is_equal(&d));
    }
}
