//! Grounded-safety predicates for the force protocol.
//!
//! Some tasks are dangerous to interrupt mid-air (parkour, pillaring).
//! They implement [`Task::should_force`](super::task::Task::should_force)
//! by delegating to [`grounded_force`]; emergency tasks that are safe to
//! run mid-air (water-bucket landing) declare
//! [`overrides_grounded`](super::task::Task::overrides_grounded) and cut
//! through.

use crate::agent::Agent;

use super::task::Task;

/// On the ground, in water, or standing on a climbable block. Evaluated
/// fresh each tick from the agent's transient state; climbable detection
/// is the agent's predicate, not a block-name check here.
pub fn grounded_or_safe(agent: &dyn Agent) -> bool {
    agent.on_ground() || agent.in_water() || agent.is_on_climbable()
}

/// Default force rule for grounded-protected tasks: refuse replacement
/// iff the agent is not grounded-or-safe and the candidate does not
/// override grounded protection. No candidate counts as not overriding.
pub fn grounded_force(agent: &dyn Agent, candidate: Option<&dyn Task>) -> bool {
    if grounded_or_safe(agent) {
        return false;
    }
    !candidate.is_some_and(|c| c.overrides_grounded())
}

// ─── Tests ───────────────────────────────────────────────────────────
