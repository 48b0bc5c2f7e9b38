//! The per-tick scheduler over registered chains.
//!
//! Owns the user chain plus any registered concern chains, picks the
//! highest-priority active chain each tick, and hands it the tick.
//! Everything is synchronous: the caller invokes [`Runner::tick`] from
//! its own tick source (the demo driver uses a 20 Hz interval).

use tracing::info;

use crate::agent::Agent;

use super::chain::{Chain, UserTaskChain, PRIORITY_INACTIVE};
use super::events::{EventBus, RunnerEvent};
use super::task::Task;

pub struct Runner {
    user: UserTaskChain,
    chains: Vec<Box<dyn Chain>>,
    /// Index into the logical chain list: 0 = user, i+1 = chains[i].
    active: Option<usize>,
    events: EventBus,
    running: bool,
}

impl Runner {
    pub fn new() -> Self {
        Self {
            user: UserTaskChain::new(),
            chains: Vec::new(),
            active: None,
            events: EventBus::new(),
            running: false,
        }
    }

    // ── Lifecycle ──

    /// Enable ticking. Idempotent.
    pub fn start(&mut self) {
        self.running = true;
    }

    /// Disable ticking; the next `start` resumes where things stand.
    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    // ── Chains ──

    pub fn register_chain(&mut self, chain: Box<dyn Chain>) {
        self.chains.push(chain);
    }

    /// Remove a chain by name. Removing the active chain interrupts it
    /// with no winner and clears the active slot.
    pub fn unregister_chain(&mut self, agent: &mut dyn Agent, name: &str) -> bool {
        let Some(idx) = self.chains.iter().position(|c| c.name() == name) else {
            return false;
        };
        let logical = idx + 1;
        match self.active {
            Some(active) if active == logical => {
                self.chains[idx].on_interrupt(agent, None);
                self.active = None;
            }
            Some(active) if active > logical => self.active = Some(active - 1),
            _ => {}
        }
        self.chains.remove(idx);
        true
    }

    pub fn user_chain(&mut self) -> &mut UserTaskChain {
        &mut self.user
    }

    pub fn set_user_task(&mut self, agent: &mut dyn Agent, task: Box<dyn Task>) {
        self.user.set_user_task(agent, task);
    }

    pub fn cancel_user_task(&mut self, agent: &mut dyn Agent) {
        self.user.cancel(agent);
    }

    pub fn active_chain_name(&self) -> Option<String> {
        self.active.map(|i| self.chain_ref(i).name().to_string())
    }

    pub fn subscribe(&mut self, callback: Box<dyn FnMut(&RunnerEvent)>) {
        self.events.subscribe(callback);
    }

    // ── Tick ──

    /// Run one scheduler step: emit `tick`, pick the highest-priority
    /// active chain (ties to the earliest registration, the user chain
    /// first), interrupt the previous chain if the winner changed, and
    /// tick the winner. No active chain means nothing to do.
    pub fn tick(&mut self, agent: &mut dyn Agent) {
        if !self.running {
            return;
        }
        self.events.emit(&RunnerEvent::Tick);

        let count = self.chains.len() + 1;
        let mut winner: Option<(usize, u32)> = None;
        for i in 0..count {
            let p = self.chain_ref(i).priority(&*agent);
            if p > PRIORITY_INACTIVE && winner.map_or(true, |(_, best)| p > best) {
                winner = Some((i, p));
            }
        }
        let Some((w, _)) = winner else {
            return;
        };

        if self.active != Some(w) {
            let new_name = self.chain_ref(w).name().to_string();
            let old_name = self.active.map(|i| self.chain_ref(i).name().to_string());
            if let Some(old) = self.active {
                self.chain_mut(old).on_interrupt(agent, Some(&new_name));
            }
            info!(old = ?old_name, new = %new_name, "active chain changed");
            self.events.emit(&RunnerEvent::ChainChanged {
                old: old_name,
                new: new_name,
            });
            self.active = Some(w);
        }

        let Self {
            user,
            chains,
            events,
            ..
        } = self;
        let chain: &mut dyn Chain = if w == 0 { user } else { chains[w - 1].as_mut() };
        chain.on_tick(agent, events);
    }

    fn chain_ref(&self, i: usize) -> &dyn Chain {
        if i == 0 {
            &self.user
        } else {
            self.chains[i - 1].as_ref()
        }
    }

    fn chain_mut(&mut self, i: usize) -> &mut dyn Chain {
        if i == 0 {
            &mut self.user
        } else {
            self.chains[i - 1].as_mut()
        }
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
