use std::collections::VecDeque;

use crate::constants::MAX_SAVED_STATES;
use crate::machine::Machine;

/// # History
/// Past machine states, most recent first, for rewinding.
///
/// Once `capacity` states are saved the oldest one is dropped for every new one.
// TODO explore time/memory efficiency of more compact representations of past states (e.g. diffs)
pub struct History {
    states: VecDeque<Machine>,
    capacity: usize,
}

impl History {
    pub fn new() -> Self {
        Self::with_capacity(MAX_SAVED_STATES)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        History {
            states: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Puts a copy of `machine` in the history
    pub fn record(&mut self, machine: &Machine) {
        if self.capacity == 0 {
            return;
        }
        if self.states.len() == self.capacity {
            self.states.pop_back();
        }
        self.states.push_front(machine.clone());
    }

    /// Restores the most recently recorded state if there is one
    pub fn rewind(&mut self, machine: &mut Machine) -> bool {
        match self.states.pop_front() {
            Some(state) => {
                machine.restore(state);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
