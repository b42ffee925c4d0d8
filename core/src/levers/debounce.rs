use std::collections::HashMap;
use std::hash::Hash;
use std::time::Instant;

use crate::options::CheckOptions;

/// What prompted a lever check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    ValueChanged,
    ScriptEdited,
}

/// Schedules interactive checks so that only the latest request per key runs.
///
/// Scheduling a key that is already pending replaces its deadline; the
/// earlier request is dropped, not queued. Time is passed in by the caller.
#[derive(Debug)]
pub struct Debouncer<K> {
    options: CheckOptions,
    pending: HashMap<K, Instant>,
}

impl<K: Eq + Hash + Clone> Debouncer<K> {
    pub fn new(options: CheckOptions) -> Self {
        Self {
            options,
            pending: HashMap::new(),
        }
    }

    /// Schedule a check for `key`, returning when it becomes due.
    pub fn schedule(&mut self, key: K, trigger: Trigger, now: Instant) -> Instant {
        let delay = match trigger {
            Trigger::ValueChanged => self.options.value_delay,
            Trigger::ScriptEdited => self.options.script_delay,
        };
        let deadline = now + delay;
        self.pending.insert(key, deadline);
        deadline
    }

    pub fn cancel(&mut self, key: &K) -> bool {
        self.pending.remove(key).is_some()
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().min().copied()
    }

    /// Remove and return every key due at `now`, earliest deadline first.
    pub fn take_due(&mut self, now: Instant) -> Vec<K> {
        let mut due: Vec<(Instant, K)> = self
            .pending
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, deadline)| (*deadline, key.clone()))
            .collect();
        due.sort_by_key(|(deadline, _)| *deadline);
        for (_, key) in &due {
            self.pending.remove(key);
        }
        due.into_iter().map(|(_, key)| key).collect()
    }
}

impl<K: Eq + Hash + Clone> Default for Debouncer<K> {
    fn default() -> Self {
        Self::new(CheckOptions::default())
    }
}
