//! Priority chains: named containers for one main task each.
//!
//! Chains compete for the runner's attention by dynamic priority. The
//! reusable [`TaskChain`] implements the main-task slot with the
//! equality gate and terminal-state handling; [`UserTaskChain`] and
//! [`SingleTaskChain`] are the two stock policies on top of it, and
//! concern chains (food, defense, survival) build their own.

use tracing::debug;

use crate::agent::Agent;

use super::events::{EventBus, RunnerEvent};
use super::task::{Task, TaskNode};

// ─── Priorities ──────────────────────────────────────────────────────

/// Priority 0 never wins the scheduler.
pub const PRIORITY_INACTIVE: u32 = 0;
pub const PRIORITY_USER_TASK: u32 = 50;
pub const PRIORITY_FOOD: u32 = 70;
pub const PRIORITY_DANGER: u32 = 100;
pub const PRIORITY_DEATH: u32 = 120;

// ─── Chain contract ──────────────────────────────────────────────────

/// A named unit competing for the scheduler's attention.
pub trait Chain {
    fn name(&self) -> &str;

    /// Dynamic priority; 0 means "nothing to do this tick".
    fn priority(&self, agent: &dyn Agent) -> u32;

    /// Has a main task and that task is not finished.
    fn is_active(&self, agent: &dyn Agent) -> bool;

    /// Tick the main task. Implementations install or refresh their task
    /// here before driving it.
    fn on_tick(&mut self, agent: &mut dyn Agent, events: &mut EventBus);

    /// A higher-priority chain (`winner`, `None` on unregistration) took
    /// over. Default: retain the task and simply stop ticking, so the
    /// chain resumes where it left off.
    fn on_interrupt(&mut self, _agent: &mut dyn Agent, _winner: Option<&str>) {}

    fn current_task_name(&self) -> Option<String>;
}

// ─── Main-task slot ──────────────────────────────────────────────────

/// The main-task slot shared by all chain implementations.
pub struct TaskChain {
    name: String,
    slot: Option<TaskNode>,
}

impl TaskChain {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            slot: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Install a task. An incoming task equal to the incumbent is
    /// dropped and the incumbent keeps running; otherwise the incumbent
    /// is stopped with `interrupt = new` and the newcomer takes the
    /// slot immediately (it gets its first tick this same turn).
    pub fn set_task(&mut self, agent: &mut dyn Agent, task: Box<dyn Task>) {
        if let Some(node) = &self.slot {
            if !node.is_stopped() && node.task().is_equal(task.as_ref()) {
                return;
            }
        }
        if let Some(mut old) = self.slot.take() {
            old.stop(agent, Some(task.as_ref()));
        }
        debug!(chain = %self.name, task = %task.display_name(), "task installed");
        self.slot = Some(TaskNode::new(task));
    }

    /// Stop and drop the current task, if any.
    pub fn stop_current(&mut self, agent: &mut dyn Agent) {
        if let Some(mut node) = self.slot.take() {
            node.stop(agent, None);
        }
    }

    pub fn current(&self) -> Option<&TaskNode> {
        self.slot.as_ref()
    }

    pub fn current_task_name(&self) -> Option<String> {
        self.slot.as_ref().map(TaskNode::display_name)
    }

    pub fn is_active(&self, agent: &dyn Agent) -> bool {
        self.slot
            .as_ref()
            .is_some_and(|node| !node.is_finished(agent))
    }

    /// Drive the slot for one tick; a task that reaches a terminal state
    /// is stopped and leaves the slot in the same tick.
    pub fn on_tick(&mut self, agent: &mut dyn Agent, events: &mut EventBus) {
        let Some(node) = &mut self.slot else {
            return;
        };
        let fresh = node.is_fresh();
        node.tick(agent);
        if fresh {
            events.emit(&RunnerEvent::TaskStarted {
                chain: self.name.clone(),
                task: node.display_name(),
            });
        }
        if node.is_finished(&*agent) {
            let task = node.display_name();
            let failed = node.is_failed();
            debug!(chain = %self.name, task = %task, failed, "task finished");
            if let Some(mut node) = self.slot.take() {
                node.stop(agent, None);
            }
            events.emit(&RunnerEvent::TaskFinished {
                chain: self.name.clone(),
                task,
                failed,
            });
        }
    }
}

// ─── User chain ──────────────────────────────────────────────────────

pub const USER_CHAIN_NAME: &str = "user-tasks";

/// The distinguished chain the driving application feeds. Keeps its task
/// across interruptions and resumes where it stopped.
pub struct UserTaskChain {
    chain: TaskChain,
}

impl UserTaskChain {
    pub fn new() -> Self {
        Self {
            chain: TaskChain::new(USER_CHAIN_NAME),
        }
    }

    pub fn set_user_task(&mut self, agent: &mut dyn Agent, task: Box<dyn Task>) {
        self.chain.set_task(agent, task);
    }

    pub fn cancel(&mut self, agent: &mut dyn Agent) {
        self.chain.stop_current(agent);
    }

    pub fn current(&self) -> Option<&TaskNode> {
        self.chain.current()
    }
}

impl Default for UserTaskChain {
    fn default() -> Self {
        Self::new()
    }
}

impl Chain for UserTaskChain {
    fn name(&self) -> &str {
        self.chain.name()
    }

    fn priority(&self, agent: &dyn Agent) -> u32 {
        if self.chain.is_active(agent) {
            PRIORITY_USER_TASK
        } else {
            PRIORITY_INACTIVE
        }
    }

    fn is_active(&self, agent: &dyn Agent) -> bool {
        self.chain.is_active(agent)
    }

    fn on_tick(&mut self, agent: &mut dyn Agent, events: &mut EventBus) {
        self.chain.on_tick(agent, events);
    }

    fn current_task_name(&self) -> Option<String> {
        self.chain.current_task_name()
    }
}

// ─── Single-task chain ───────────────────────────────────────────────

/// A chain with a fixed nominal priority that hard-stops its task when
/// something else takes over: when it wins again it starts from scratch
/// rather than resuming a stale plan.
pub struct SingleTaskChain {
    chain: TaskChain,
    nominal_priority: u32,
}

impl SingleTaskChain {
    pub fn new(name: &str, nominal_priority: u32) -> Self {
        Self {
            chain: TaskChain::new(name),
            nominal_priority,
        }
    }

    pub fn set_task(&mut self, agent: &mut dyn Agent, task: Box<dyn Task>) {
        self.chain.set_task(agent, task);
    }
}

impl Chain for SingleTaskChain {
    fn name(&self) -> &str {
        self.chain.name()
    }

    fn priority(&self, agent: &dyn Agent) -> u32 {
        if self.chain.is_active(agent) {
            self.nominal_priority
        } else {
            PRIORITY_INACTIVE
        }
    }

    fn is_active(&self, agent: &dyn Agent) -> bool {
        self.chain.is_active(agent)
    }

    fn on_tick(&mut self, agent: &mut dyn Agent, events: &mut EventBus) {
        self.chain.on_tick(agent, events);
    }

    fn on_interrupt(&mut self, agent: &mut dyn Agent, _winner: Option<&str>) {
        self.chain.stop_current(agent);
    }

    fn current_task_name(&self) -> Option<String> {
        self.chain.current_task_name()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
