//! Largest known counterexample
//!
//! The coordinator's single source of truth. Updates are monotone in size:
//! a graph replaces the stored one only if it is at least as large.

use crate::graph::Graph;
use crate::util::persist::{load_state, save_state};
use crate::Result;
use anyhow::Context;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

#[derive(Debug)]
struct Latest {
    graph: Graph,
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct LatestStore {
    inner: RwLock<Latest>,
    path: PathBuf,
}

impl LatestStore {
    /// Load the stored graph from `path`, or start empty if there is none.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let graph: Graph = load_state(&path)?.unwrap_or_default();
        graph
            .validate()
            .with_context(|| format!("Stored graph is malformed: {}", path.display()))?;
        Ok(Self {
            inner: RwLock::new(Latest {
                graph,
                updated_at: None,
            }),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).graph.size()
    }

    pub fn get(&self) -> Graph {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .graph
            .clone()
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).updated_at
    }

    /// Replace the stored graph if `graph` is at least as large. Returns
    /// whether it was replaced.
    pub fn update(&self, graph: Graph) -> bool {
        let mut latest = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if graph.size() < latest.graph.size() {
            return false;
        }
        latest.graph = graph;
        latest.updated_at = Some(Utc::now());
        true
    }

    /// Write the stored graph to disk. Holds the write lock so concurrent
    /// saves cannot interleave.
    pub fn save(&self) -> Result<()> {
        let latest = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        save_state(&self.path, &latest.graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::paley17;
    use proptest::prelude::*;

    #[test]
    fn test_open_missing_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LatestStore::open(dir.path().join("ce.state")).unwrap();
        assert_eq!(store.size(), 0);
        assert!(store.get().is_empty());
        assert!(store.updated_at().is_none());
    }

    #[test]
    fn test_update_is_monotone() {
        let dir = tempfile::tempdir().unwrap();
        let store = LatestStore::open(dir.path().join("ce.state")).unwrap();

        assert!(store.update(paley17()));
        assert!(store.updated_at().is_some());
        assert!(!store.update(Graph::zeroed(16)));
        assert_eq!(store.get(), paley17());

        // Equal size overwrites.
        assert!(store.update(Graph::zeroed(17)));
        assert_eq!(store.get(), Graph::zeroed(17));
    }

    proptest! {
        #[test]
        fn test_size_is_max_of_updates(sizes in proptest::collection::vec(0usize..24, 1..12)) {
            let dir = tempfile::tempdir().unwrap();
            let store = LatestStore::open(dir.path().join("ce.state")).unwrap();
            for (i, &size) in sizes.iter().enumerate() {
                let before = store.size();
                let replaced = store.update(Graph::zeroed(size));
                prop_assert_eq!(replaced, size >= before);
                prop_assert_eq!(store.size(), *sizes[..=i].iter().max().unwrap());
            }
        }
    }

    #[test]
    fn test_save_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ce.state");
        let store = LatestStore::open(&path).unwrap();
        store.update(paley17());
        store.save().unwrap();

        let reopened = LatestStore::open(&path).unwrap();
        assert_eq!(reopened.get(), paley17());
    }

    #[test]
    fn test_corrupt_state_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ce.state");
        std::fs::write(&path, b"not bincode").unwrap();
        assert!(LatestStore::open(&path).is_err());
    }
}
