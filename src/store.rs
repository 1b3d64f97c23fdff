//! The policy store: the set of currently hidden paths.
//!
//! This is the only mutable state in the agent. Callers must already hold
//! the dispatcher's exclusive lock; the store itself carries no locking.

use std::collections::HashSet;

use crate::error::AgentError;

/// Set of hidden paths plus the terminated marker set by uninstall.
#[derive(Debug, Default)]
pub struct PolicyStore {
    hidden: HashSet<String>,
    terminated: bool,
}

impl PolicyStore {
    /// Create an empty, active store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a path to the hidden set. Idempotent; returns whether the path
    /// was newly inserted.
    pub fn insert(&mut self, path: impl Into<String>) -> bool {
        self.hidden.insert(path.into())
    }

    /// Remove a path from the hidden set.
    pub fn remove(&mut self, path: &str) -> Result<(), AgentError> {
        if self.hidden.remove(path) {
            Ok(())
        } else {
            Err(AgentError::PathNotFound(path.to_owned()))
        }
    }

    /// Empty the set and mark the store terminated. Returns the number of
    /// entries cleared. Used only by uninstall.
    pub fn clear(&mut self) -> usize {
        let cleared = self.hidden.len();
        self.hidden.clear();
        self.terminated = true;
        cleared
    }

    /// Whether `path` is currently hidden.
    pub fn contains(&self, path: &str) -> bool {
        self.hidden.contains(path)
    }

    /// Number of hidden paths.
    pub fn len(&self) -> usize {
        self.hidden.len()
    }

    /// Whether the hidden set is empty.
    pub fn is_empty(&self) -> bool {
        self.hidden.is_empty()
    }

    /// Sorted snapshot of the hidden set.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.hidden.iter().cloned().collect();
        paths.sort();
        paths
    }

    /// Whether a successful uninstall has already run.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }
}
