//! Foreman: a reactive, hierarchical task engine for driving a
//! Minecraft-style game agent.
//!
//! Each physics tick the [`engine::runner::Runner`] picks the
//! highest-priority chain (user goal, eating, defense, hazard escape),
//! which drives a tree of [`engine::task::Task`] nodes down to a leaf
//! that acts on the [`agent::Agent`]. The
//! [`catalogue::TaskCatalogue`] maps item names to the subtree that
//! obtains them (custom provider, craft, smelt, or mine).
//!
//! The engine is single-threaded and cooperative: nothing blocks, long
//! operations are re-polled against agent state every tick, and errors
//! surface as task status rather than propagated failures.

pub mod agent;
pub mod catalogue;
pub mod chains;
pub mod config;
pub mod engine;
pub mod tasks;

pub use agent::Agent;
pub use catalogue::TaskCatalogue;
pub use engine::chain::{Chain, SingleTaskChain, TaskChain, UserTaskChain};
pub use engine::events::{EventBus, RunnerEvent};
pub use engine::runner::Runner;
pub use engine::task::{Task, TaskNode};
