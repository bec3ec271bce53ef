//! In-memory knowledge graph store.
//!
//! Thread-safe via `RwLock`. Contents are lost when the store is dropped,
//! so this is mainly used by tests and the `memory` backend setting.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use super::data::GraphData;
use super::traits::{ConceptNode, KnowledgeGraphStore};
use crate::error::{Result, TutorError};

/// In-memory concept graph.
#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    graph: RwLock<GraphData>,
}

impl MemoryGraphStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with `from -> to` edges.
    pub fn with_edges<'a>(edges: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<Self> {
        let store = Self::new();
        for (from, to) in edges {
            store.add_prerequisite(from, to)?;
        }
        Ok(store)
    }

    /// Number of concepts in the store.
    pub fn len(&self) -> usize {
        self.read().map(|g| g.concepts.len()).unwrap_or(0)
    }

    /// Check if the store has no concepts.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the current graph.
    pub fn snapshot(&self) -> Result<GraphData> {
        Ok(self.read()?.clone())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, GraphData>> {
        self.graph
            .read()
            .map_err(|_| TutorError::store_unavailable("memory graph lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, GraphData>> {
        self.graph
            .write()
            .map_err(|_| TutorError::store_unavailable("memory graph lock poisoned"))
    }
}

impl KnowledgeGraphStore for MemoryGraphStore {
    fn prerequisites_of(&self, concept: &str) -> Result<Vec<String>> {
        Ok(self.read()?.prerequisites_of(concept))
    }

    fn next_concepts_of(&self, concept: &str) -> Result<Vec<String>> {
        Ok(self.read()?.next_concepts_of(concept))
    }

    fn record_interaction(
        &self,
        concept: &str,
        mastery: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        self.write()?.record_interaction(concept, mastery, timestamp)
    }

    fn concept(&self, name: &str) -> Result<Option<ConceptNode>> {
        Ok(self.read()?.concepts.get(name).cloned())
    }

    fn add_prerequisite(&self, from: &str, to: &str) -> Result<()> {
        self.write()?.add_prerequisite(from, to).map(|_| ())
    }

    fn ping(&self) -> bool {
        !self.graph.is_poisoned()
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
