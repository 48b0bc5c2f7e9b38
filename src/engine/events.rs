//! Typed runner event surface.
//!
//! Four events, one callback registry. Consumers that want to surface
//! progress to a human subscribe here; the engine itself only emits.

use serde::Serialize;

/// An observable scheduler event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum RunnerEvent {
    /// One scheduler step ran.
    Tick,
    /// The active chain switched.
    ChainChanged {
        old: Option<String>,
        new: String,
    },
    /// A chain's main task received its first tick.
    TaskStarted { chain: String, task: String },
    /// A chain's main task reached a terminal state and left the slot.
    TaskFinished {
        chain: String,
        task: String,
        failed: bool,
    },
}

type EventCallback = Box<dyn FnMut(&RunnerEvent)>;

/// Callback registry the runner and chains emit through.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<EventCallback>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, callback: EventCallback) {
        self.subscribers.push(callback);
    }

    pub fn emit(&mut self, event: &RunnerEvent) {
        for subscriber in &mut self.subscribers {
            subscriber(event);
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn all_subscribers_see_each_event() {
        let seen: Rc<RefCell<Vec<RunnerEvent>>> = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        for _ in 0..2 {
            let sink = Rc::clone(&seen);
            bus.subscribe(Box::new(move |e| sink.borrow_mut().push(e.clone())));
        }
        bus.emit(&RunnerEvent::Tick);
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn events_serialize_with_tags() {
        let json = serde_json::to_string(&RunnerEvent::TaskStarted {
            chain: "user-tasks".to_string(),
            task: "counter(5)".to_string(),
        })
        .unwrap();
        assert!(json.contains("\"event\":\"task_started\""));
    }
}
