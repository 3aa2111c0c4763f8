//! Worker registry
//!
//! Maps a worker identity (`peer_ip:preempt_port`) to the size of the last
//! graph the coordinator knows that worker has. Entries are added on every
//! sync and removed when a preemption push to the worker fails.

use crate::distributed::protocol::WorkerEntry;
use crate::util::persist::{load_state, save_state};
use crate::Result;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{PoisonError, RwLock};

/// What [`Registry::record`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    New,
    Updated { previous: usize },
}

#[derive(Debug, Default)]
pub struct Registry {
    entries: RwLock<HashMap<String, usize>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a persisted registry; a missing file gives an empty one.
    pub fn load(path: &Path) -> Result<Self> {
        let entries: HashMap<String, usize> = load_state(path)?.unwrap_or_default();
        Ok(Self {
            entries: RwLock::new(entries),
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        save_state(path, &*entries)
    }

    /// Insert or overwrite the size recorded for `identity`.
    pub fn record(&self, identity: &str, size: usize) -> Registration {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.insert(identity.to_string(), size) {
            Some(previous) => Registration::Updated { previous },
            None => Registration::New,
        }
    }

    /// Update an entry only if it is still registered.
    pub fn update_existing(&self, identity: &str, size: usize) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.get_mut(identity) {
            Some(entry) => {
                *entry = size;
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, identity: &str) -> Option<usize> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(identity)
    }

    pub fn get(&self, identity: &str) -> Option<usize> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(identity)
            .copied()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries sorted by identity.
    pub fn snapshot(&self) -> Vec<WorkerEntry> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut snapshot: Vec<WorkerEntry> = entries
            .iter()
            .map(|(identity, &size)| WorkerEntry {
                identity: identity.clone(),
                size,
            })
            .collect();
        snapshot.sort_by(|a, b| a.identity.cmp(&b.identity));
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_update() {
        let registry = Registry::new();
        assert_eq!(registry.record("10.0.0.1:5555", 37), Registration::New);
        assert_eq!(
            registry.record("10.0.0.1:5555", 41),
            Registration::Updated { previous: 37 }
        );
        // Sizes can go down: the latest report wins.
        assert_eq!(
            registry.record("10.0.0.1:5555", 0),
            Registration::Updated { previous: 41 }
        );
        assert_eq!(registry.get("10.0.0.1:5555"), Some(0));
    }

    #[test]
    fn test_identity_includes_port() {
        let registry = Registry::new();
        registry.record("10.0.0.1:5555", 37);
        registry.record("10.0.0.1:5556", 41);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_update_existing_does_not_resurrect() {
        let registry = Registry::new();
        registry.record("a:1", 10);
        assert!(registry.update_existing("a:1", 11));
        assert_eq!(registry.remove("a:1"), Some(11));
        assert!(!registry.update_existing("a:1", 12));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_snapshot_is_sorted() {
        let registry = Registry::new();
        registry.record("b:1", 2);
        registry.record("a:1", 1);
        let ids: Vec<_> = registry.snapshot().into_iter().map(|e| e.identity).collect();
        assert_eq!(ids, vec!["a:1", "b:1"]);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.state");
        assert!(Registry::load(&path).unwrap().is_empty());

        let registry = Registry::new();
        registry.record("10.0.0.1:5555", 37);
        registry.save(&path).unwrap();

        let loaded = Registry::load(&path).unwrap();
        assert_eq!(loaded.get("10.0.0.1:5555"), Some(37));
    }
}
