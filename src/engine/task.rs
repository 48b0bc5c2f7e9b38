//! Task nodes: the unit of intent in the live tree.
//!
//! A [`Task`] supplies the behaviour hooks; a [`TaskNode`] owns one task
//! plus the lifecycle bookkeeping (one-shot start, subtask slot, stop
//! idempotence) and drives the normative tick algorithm. Parents never
//! hold references to children beyond the slot, and children never call
//! back into parents; status flows upward purely by polling.

use std::any::Any;

use crate::agent::Agent;

// ─── Task contract ───────────────────────────────────────────────────

/// Behaviour of one node in the task tree.
///
/// Hooks receive the shared agent by `&mut dyn Agent`; nothing here may
/// block, and long operations are re-polled every tick. Returning
/// `Some(task)` from [`on_tick`](Task::on_tick) delegates to that
/// subtask for the tick; `None` means the task acted directly.
pub trait Task: Any {
    /// Stable human-readable name for logs and debug dumps.
    fn display_name(&self) -> String;

    /// One-shot initialization, called before the first `on_tick` of an
    /// activation.
    fn on_start(&mut self, _agent: &mut dyn Agent) {}

    /// Decide this tick's work: delegate to the returned subtask, or act
    /// directly and return `None`.
    fn on_tick(&mut self, agent: &mut dyn Agent) -> Option<Box<dyn Task>>;

    /// Cleanup. `interrupt` is the replacing task when being swapped
    /// out, `None` on cancellation or completion. Release any transient
    /// agent state (controls, windows) here.
    fn on_stop(&mut self, _agent: &mut dyn Agent, _interrupt: Option<&dyn Task>) {}

    /// Goal reached, including terminal failure (see
    /// [`is_failed`](Task::is_failed)).
    fn is_finished(&self, agent: &dyn Agent) -> bool;

    /// Distinguishes terminal failure from success; only meaningful once
    /// `is_finished` is true.
    fn is_failed(&self) -> bool {
        false
    }

    /// Whether `other` would do identical work. Parents keep the current
    /// subtask when an incoming one is equal, so equality is what
    /// prevents stop/restart flicker. Implementations compare their own
    /// kind (via [`as_any`](Task::as_any) downcast) and whichever
    /// parameters distinguish distinct work.
    fn is_equal(&self, other: &dyn Task) -> bool;

    /// Refuse replacement this tick. Consulted on the *current* subtask
    /// when the parent wants to install a non-equal candidate; dangerous-
    /// to-interrupt tasks delegate to
    /// [`grounded_force`](super::safety::grounded_force).
    fn should_force(&self, _agent: &dyn Agent, _candidate: Option<&dyn Task>) -> bool {
        false
    }

    /// Declares the task safe to run mid-air, letting it displace a
    /// grounded-protected subtask.
    fn overrides_grounded(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any;
}

// ─── Task node ───────────────────────────────────────────────────────

/// One live node: a task plus lifecycle state and the subtask slot.
pub struct TaskNode {
    task: Box<dyn Task>,
    /// True until after the first `on_start` of this activation.
    first: bool,
    active: bool,
    stopped: bool,
    sub: Option<Box<TaskNode>>,
}

impl TaskNode {
    pub fn new(task: Box<dyn Task>) -> Self {
        Self {
            task,
            first: true,
            active: false,
            stopped: false,
            sub: None,
        }
    }

    pub fn display_name(&self) -> String {
        self.task.display_name()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Whether this node has not yet received its first tick.
    pub fn is_fresh(&self) -> bool {
        self.first
    }

    pub fn is_finished(&self, agent: &dyn Agent) -> bool {
        self.task.is_finished(agent)
    }

    pub fn is_failed(&self) -> bool {
        self.task.is_failed()
    }

    pub fn task(&self) -> &dyn Task {
        self.task.as_ref()
    }

    /// Drive one tick through this node and down to a leaf.
    ///
    /// The normative algorithm: one-shot start, consult the task for a
    /// subtask, swap the slot only past the equality and force gates,
    /// and always give the (possibly fresh) subtask its tick in the same
    /// turn. A `None` return clears the slot with `interrupt = None`.
    pub fn tick(&mut self, agent: &mut dyn Agent) {
        if self.stopped {
            return;
        }
        if self.first {
            self.task.on_start(agent);
            self.first = false;
            self.active = true;
        }

        match self.task.on_tick(agent) {
            Some(new_sub) => {
                let keep_current = match &self.sub {
                    Some(cur) if !cur.stopped => {
                        cur.task.is_equal(new_sub.as_ref())
                            || cur.task.should_force(&*agent, Some(new_sub.as_ref()))
                    }
                    _ => false,
                };
                if !keep_current {
                    if let Some(mut old) = self.sub.take() {
                        old.stop(agent, Some(new_sub.as_ref()));
                    }
                    self.sub = Some(Box::new(TaskNode::new(new_sub)));
                }
                if let Some(sub) = &mut self.sub {
                    sub.tick(agent);
                }
            }
            None => {
                if let Some(mut old) = self.sub.take() {
                    old.stop(agent, None);
                }
            }
        }
    }

    /// Stop this node and its subtree. Idempotent. The subtask is
    /// stopped with the same `interrupt` before this node's own
    /// `on_stop` runs; `on_stop` only fires if `on_start` did.
    pub fn stop(&mut self, agent: &mut dyn Agent, interrupt: Option<&dyn Task>) {
        if self.stopped {
            return;
        }
        if let Some(mut sub) = self.sub.take() {
            sub.stop(agent, interrupt);
        }
        if !self.first {
            self.task.on_stop(agent, interrupt);
        }
        self.stopped = true;
        self.active = false;
    }

    /// Return to the pre-start state for reuse.
    pub fn reset(&mut self) {
        self.first = true;
        self.active = false;
        self.stopped = false;
        self.sub = None;
    }

    /// Debug dump of the live delegation chain: `a > b > c`.
    pub fn task_chain_string(&self) -> String {
        let mut out = self.display_name();
        let mut node = &self.sub;
        while let Some(sub) = node {
            out.push_str(" > ");
            out.push_str(&sub.display_name());
            node = &sub.sub;
        }
        out
    }
}

// ─── Test support ────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod testing {
    use std::any::Any;
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    /// Lifecycle trace shared between a test and the task instances the
    /// tree creates and destroys.
    #[derive(Default)]
    pub struct Trace {
        pub starts: u32,
        pub stops: u32,
        pub ticks: u32,
        /// Display name of the interrupting task per stop, `None` for
        /// cancellation.
        pub stop_interrupts: Vec<Option<String>>,
        pub log: Vec<String>,
    }

    pub type SharedTrace = Rc<RefCell<Trace>>;

    pub fn trace() -> SharedTrace {
        Rc::new(RefCell::new(Trace::default()))
    }

    /// Counts its own ticks and finishes at `max_ticks`. Equality is by
    /// `max_ticks`, so re-created instances with the same bound are the
    /// same work.
    pub struct CounterTask {
        pub max_ticks: u32,
        pub trace: SharedTrace,
    }

    impl CounterTask {
        pub fn boxed(max_ticks: u32, trace: &SharedTrace) -> Box<dyn Task> {
            Box::new(Self {
                max_ticks,
                trace: Rc::clone(trace),
            })
        }
    }

    impl Task for CounterTask {
        fn display_name(&self) -> String {
            format!("counter({})", self.max_ticks)
        }

        fn on_start(&mut self, _agent: &mut dyn Agent) {
            let mut t = self.trace.borrow_mut();
            t.starts += 1;
            t.log.push("counter:start".to_string());
        }

        fn on_tick(&mut self, _agent: &mut dyn Agent) -> Option<Box<dyn Task>> {
            let mut t = self.trace.borrow_mut();
            if t.ticks < self.max_ticks {
                t.ticks += 1;
            }
            None
        }

        fn on_stop(&mut self, _agent: &mut dyn Agent, interrupt: Option<&dyn Task>) {
            let mut t = self.trace.borrow_mut();
            t.stops += 1;
            t.stop_interrupts.push(interrupt.map(Task::display_name));
            t.log.push("counter:stop".to_string());
        }

        fn is_finished(&self, _agent: &dyn Agent) -> bool {
            self.trace.borrow().ticks >= self.max_ticks
        }

        fn is_equal(&self, other: &dyn Task) -> bool {
            other
                .as_any()
                .downcast_ref::<Self>()
                .is_some_and(|o| o.max_ticks == self.max_ticks)
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    /// Parent that re-creates the same child every tick; finished when
    /// the child is.
    pub struct RespawningParent {
        pub child_max: u32,
        pub child_trace: SharedTrace,
    }

    impl Task for RespawningParent {
        fn display_name(&self) -> String {
            "respawning-parent".to_string()
        }

        fn on_tick(&mut self, _agent: &mut dyn Agent) -> Option<Box<dyn Task>> {
            Some(CounterTask::boxed(self.child_max, &self.child_trace))
        }

        fn is_finished(&self, _agent: &dyn Agent) -> bool {
            self.child_trace.borrow().ticks >= self.child_max
        }

        fn is_equal(&self, other: &dyn Task) -> bool {
            other.as_any().downcast_ref::<Self>().is_some()
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::cell::Cell;
    use std::rc::Rc;

    use super::testing::{trace, CounterTask, RespawningParent, SharedTrace};
    use super::*;
    use crate::agent::sim::SimAgent;
    use crate::engine::safety::grounded_force;

    /// Parent driven by a switchable child factory.
    struct SwitchingParent {
        want_second: Rc<Cell<bool>>,
        first: Rc<dyn Fn() -> Box<dyn Task>>,
        second: Rc<dyn Fn() -> Box<dyn Task>>,
    }

    impl Task for SwitchingParent {
        fn display_name(&self) -> String {
            "switching-parent".to_string()
        }

        fn on_tick(&mut self, _agent: &mut dyn Agent) -> Option<Box<dyn Task>> {
            if self.want_second.get() {
                Some((self.second)())
            } else {
                Some((self.first)())
            }
        }

        fn is_finished(&self, _agent: &dyn Agent) -> bool {
            false
        }

        fn is_equal(&self, other: &dyn Task) -> bool {
            other.as_any().downcast_ref::<Self>().is_some()
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    /// Subtask that refuses replacement while the agent is airborne.
    struct GroundedHold {
        trace: SharedTrace,
    }

    impl Task for GroundedHold {
        fn display_name(&self) -> String {
            "grounded-hold".to_string()
        }

        fn on_start(&mut self, _agent: &mut dyn Agent) {
            self.trace.borrow_mut().starts += 1;
        }

        fn on_tick(&mut self, _agent: &mut dyn Agent) -> Option<Box<dyn Task>> {
            None
        }

        fn is_finished(&self, _agent: &dyn Agent) -> bool {
            false
        }

        fn is_equal(&self, other: &dyn Task) -> bool {
            other.as_any().downcast_ref::<Self>().is_some()
        }

        fn should_force(&self, agent: &dyn Agent, candidate: Option<&dyn Task>) -> bool {
            grounded_force(agent, candidate)
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct PlainTask {
        trace: SharedTrace,
        overrides: bool,
    }

    impl Task for PlainTask {
        fn display_name(&self) -> String {
            "plain".to_string()
        }

        fn on_start(&mut self, _agent: &mut dyn Agent) {
            self.trace.borrow_mut().starts += 1;
        }

        fn on_tick(&mut self, _agent: &mut dyn Agent) -> Option<Box<dyn Task>> {
            None
        }

        fn is_finished(&self, _agent: &dyn Agent) -> bool {
            false
        }

        fn is_equal(&self, other: &dyn Task) -> bool {
            other
                .as_any()
                .downcast_ref::<Self>()
                .is_some_and(|o| o.overrides == self.overrides)
        }

        fn overrides_grounded(&self) -> bool {
            self.overrides
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    /// Parent with a child slot it fills once, then abandons (returns
    /// None), to observe interrupt=None propagation.
    struct OneShotDelegator {
        child_trace: SharedTrace,
        delegated: bool,
        parent_trace: SharedTrace,
    }

    impl Task for OneShotDelegator {
        fn display_name(&self) -> String {
            "one-shot".to_string()
        }

        fn on_tick(&mut self, _agent: &mut dyn Agent) -> Option<Box<dyn Task>> {
            if self.delegated {
                None
            } else {
                self.delegated = true;
                Some(CounterTask::boxed(100, &self.child_trace))
            }
        }

        fn on_stop(&mut self, _agent: &mut dyn Agent, interrupt: Option<&dyn Task>) {
            let mut t = self.parent_trace.borrow_mut();
            t.stops += 1;
            t.stop_interrupts.push(interrupt.map(Task::display_name));
            t.log.push("parent:stop".to_string());
        }

        fn is_finished(&self, _agent: &dyn Agent) -> bool {
            false
        }

        fn is_equal(&self, other: &dyn Task) -> bool {
            other.as_any().downcast_ref::<Self>().is_some()
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    // ─── Lifecycle invariants ──────────────────────────────────────

    #[test]
    fn on_start_fires_exactly_once_across_ticks() {
        let mut agent = SimAgent::new();
        let t = trace();
        let mut node = TaskNode::new(CounterTask::boxed(100, &t));
        for _ in 0..10 {
            node.tick(&mut agent);
        }
        assert_eq!(t.borrow().starts, 1);
        assert_eq!(t.borrow().ticks, 10);
    }

    #[test]
    fn stop_is_idempotent_and_skips_unstarted_tasks() {
        let mut agent = SimAgent::new();
        let t = trace();
        let mut node = TaskNode::new(CounterTask::boxed(100, &t));

        // Never started: stop must not call on_stop.
        node.stop(&mut agent, None);
        assert_eq!(t.borrow().stops, 0);
        assert!(node.is_stopped());

        // Started: exactly one on_stop, repeat calls are no-ops.
        let t2 = trace();
        let mut node = TaskNode::new(CounterTask::boxed(100, &t2));
        node.tick(&mut agent);
        node.stop(&mut agent, None);
        node.stop(&mut agent, None);
        assert_eq!(t2.borrow().stops, 1);
    }

    #[test]
    fn stop_reaches_subtask_first_with_same_interrupt() {
        let mut agent = SimAgent::new();
        let child = trace();
        let parent = trace();
        let mut node = TaskNode::new(Box::new(OneShotDelegator {
            child_trace: Rc::clone(&child),
            delegated: false,
            parent_trace: Rc::clone(&parent),
        }));
        node.tick(&mut agent);

        let replacement = CounterTask { max_ticks: 7, trace: trace() };
        node.stop(&mut agent, Some(&replacement));

        // Child saw the same interrupt, and stopped before the parent.
        assert_eq!(
            child.borrow().stop_interrupts,
            vec![Some("counter(7)".to_string())]
        );
        assert_eq!(
            parent.borrow().stop_interrupts,
            vec![Some("counter(7)".to_string())]
        );
        assert_eq!(child.borrow().log.last().unwrap(), "counter:stop");
        assert_eq!(parent.borrow().log, vec!["parent:stop"]);
    }

    #[test]
    fn returning_none_cancels_the_subtask() {
        let mut agent = SimAgent::new();
        let child = trace();
        let mut node = TaskNode::new(Box::new(OneShotDelegator {
            child_trace: Rc::clone(&child),
            delegated: false,
            parent_trace: trace(),
        }));
        node.tick(&mut agent); // delegates
        assert_eq!(child.borrow().starts, 1);
        node.tick(&mut agent); // returns None
        assert_eq!(child.borrow().stops, 1);
        assert_eq!(child.borrow().stop_interrupts, vec![None]);
        assert_eq!(node.task_chain_string(), "one-shot");
    }

    #[test]
    fn reset_returns_to_pre_start_state() {
        let mut agent = SimAgent::new();
        let t = trace();
        let mut node = TaskNode::new(CounterTask::boxed(100, &t));
        node.tick(&mut agent);
        node.stop(&mut agent, None);
        node.reset();
        assert!(node.is_fresh());
        assert!(!node.is_stopped());
        node.tick(&mut agent);
        assert_eq!(t.borrow().starts, 2);
    }

    // ─── Swap rule (scenario S2) ───────────────────────────────────

    #[test]
    fn equal_subtask_is_retained_without_restart() {
        let mut agent = SimAgent::new();
        let child = trace();
        let mut node = TaskNode::new(Box::new(RespawningParent {
            child_max: 5,
            child_trace: Rc::clone(&child),
        }));
        for _ in 0..5 {
            node.tick(&mut agent);
        }
        assert_eq!(child.borrow().starts, 1);
        assert_eq!(child.borrow().ticks, 5);
        assert!(node.is_finished(&agent));
    }

    #[test]
    fn non_equal_subtask_replaces_with_interrupt() {
        let mut agent = SimAgent::new();
        let a = trace();
        let b = trace();
        let want_second = Rc::new(Cell::new(false));
        let ta = Rc::clone(&a);
        let tb = Rc::clone(&b);
        let mut node = TaskNode::new(Box::new(SwitchingParent {
            want_second: Rc::clone(&want_second),
            first: Rc::new(move || CounterTask::boxed(3, &ta)),
            second: Rc::new(move || CounterTask::boxed(9, &tb)),
        }));
        node.tick(&mut agent);
        assert_eq!(a.borrow().starts, 1);

        want_second.set(true);
        node.tick(&mut agent);
        // Old child stopped with the newcomer as interrupt, newcomer
        // started and ticked in the same turn.
        assert_eq!(a.borrow().stops, 1);
        assert_eq!(
            a.borrow().stop_interrupts,
            vec![Some("counter(9)".to_string())]
        );
        assert_eq!(b.borrow().starts, 1);
        assert_eq!(b.borrow().ticks, 1);
    }

    // ─── Force rule and grounded safety (scenario S3) ──────────────

    #[test]
    fn airborne_grounded_subtask_refuses_replacement() {
        let mut agent = SimAgent::new();
        agent.grounded = false;
        agent.water = false;
        agent.climbable = false;

        let hold = trace();
        let cand = trace();
        let want_second = Rc::new(Cell::new(false));
        let th = Rc::clone(&hold);
        let tc = Rc::clone(&cand);
        let mut node = TaskNode::new(Box::new(SwitchingParent {
            want_second: Rc::clone(&want_second),
            first: Rc::new(move || -> Box<dyn Task> {
                Box::new(GroundedHold { trace: Rc::clone(&th) })
            }),
            second: Rc::new(move || -> Box<dyn Task> {
                Box::new(PlainTask {
                    trace: Rc::clone(&tc),
                    overrides: false,
                })
            }),
        }));
        node.tick(&mut agent);
        want_second.set(true);
        node.tick(&mut agent);

        // Candidate never started, holder survived.
        assert_eq!(cand.borrow().starts, 0);
        assert_eq!(hold.borrow().stops, 0);
        assert_eq!(node.task_chain_string(), "switching-parent > grounded-hold");

        // Back on the ground the candidate gets through.
        agent.grounded = true;
        node.tick(&mut agent);
        assert_eq!(cand.borrow().starts, 1);
        assert_eq!(hold.borrow().stops, 1);
    }

    #[test]
    fn overriding_candidate_displaces_grounded_subtask_mid_air() {
        let mut agent = SimAgent::new();
        agent.grounded = false;

        let hold = trace();
        let cand = trace();
        let want_second = Rc::new(Cell::new(false));
        let th = Rc::clone(&hold);
        let tc = Rc::clone(&cand);
        let mut node = TaskNode::new(Box::new(SwitchingParent {
            want_second: Rc::clone(&want_second),
            first: Rc::new(move || -> Box<dyn Task> {
                Box::new(GroundedHold { trace: Rc::clone(&th) })
            }),
            second: Rc::new(move || -> Box<dyn Task> {
                Box::new(PlainTask {
                    trace: Rc::clone(&tc),
                    overrides: true,
                })
            }),
        }));
        node.tick(&mut agent);
        want_second.set(true);
        node.tick(&mut agent);

        assert_eq!(cand.borrow().starts, 1);
        assert_eq!(hold.borrow().stops, 1);
    }

    #[test]
    fn task_chain_string_walks_the_tree() {
        let mut agent = SimAgent::new();
        let child = trace();
        let mut node = TaskNode::new(Box::new(RespawningParent {
            child_max: 50,
            child_trace: Rc::clone(&child),
        }));
        node.tick(&mut agent);
        assert_eq!(node.task_chain_string(), "respawning-parent > counter(50)");
    }
}
