//! Counter-driven periodic actions.
//!
//! A [`Schedule`] maps "every N requests" to an action. The control loop asks
//! which actions are due for the current request counter and runs them in
//! registration order.

use serde::Serialize;

/// Actions the control loop runs periodically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodicAction {
    Optimize,
    Explore,
}

#[derive(Debug, Clone)]
pub struct Schedule<A> {
    entries: Vec<(u64, A)>,
}

impl<A: Copy> Schedule<A> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Run `action` whenever the counter is a positive multiple of `every`.
    /// `every == 0` registers nothing.
    pub fn on_every(mut self, every: u64, action: A) -> Self {
        if every > 0 {
            self.entries.push((every, action));
        }
        self
    }

    /// Actions due at `counter`, in registration order.
    pub fn due(&self, counter: u64) -> impl Iterator<Item = A> + '_ {
        self.entries
            .iter()
            .filter(move |(every, _)| counter > 0 && counter % every == 0)
            .map(|(_, action)| *action)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
