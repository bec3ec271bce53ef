//! Degraded-mode wrapper for graph stores.
//!
//! Wraps a primary store and, when degraded reads are enabled, answers
//! prerequisite and next-concept lookups with an empty list if the primary
//! is unreachable. Writes and node lookups always propagate errors.

use chrono::{DateTime, Utc};
use tracing::warn;

use super::traits::{ConceptNode, KnowledgeGraphStore};
use crate::error::Result;

/// A store wrapper that can degrade relationship reads to empty results.
pub struct FallbackGraphStore {
    primary: Box<dyn KnowledgeGraphStore>,
    degrade_reads: bool,
}

impl FallbackGraphStore {
    /// Wrap `primary`. With `degrade_reads == false` this is a passthrough.
    pub fn new(primary: Box<dyn KnowledgeGraphStore>, degrade_reads: bool) -> Self {
        Self {
            primary,
            degrade_reads,
        }
    }

    /// Get the primary backend name.
    pub fn primary_name(&self) -> &'static str {
        self.primary.name()
    }

    /// Whether availability failures on reads are swallowed.
    pub fn degrades_reads(&self) -> bool {
        self.degrade_reads
    }

    fn degraded_read(
        &self,
        kind: &str,
        concept: &str,
        result: Result<Vec<String>>,
    ) -> Result<Vec<String>> {
        match result {
            Err(err) if self.degrade_reads && err.is_store_failure() => {
                warn!(
                    backend = self.primary.name(),
                    concept,
                    error = %err,
                    "graph store unavailable, using empty {} list",
                    kind
                );
                Ok(Vec::new())
            }
            other => other,
        }
    }
}

impl KnowledgeGraphStore for FallbackGraphStore {
    fn prerequisites_of(&self, concept: &str) -> Result<Vec<String>> {
        let result = self.primary.prerequisites_of(concept);
        self.degraded_read("prerequisite", concept, result)
    }

    fn next_concepts_of(&self, concept: &str) -> Result<Vec<String>> {
        let result = self.primary.next_concepts_of(concept);
        self.degraded_read("next-concept", concept, result)
    }

    fn record_interaction(
        &self,
        concept: &str,
        mastery: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        self.primary.record_interaction(concept, mastery, timestamp)
    }

    fn concept(&self, name: &str) -> Result<Option<ConceptNode>> {
        self.primary.concept(name)
    }

    fn add_prerequisite(&self, from: &str, to: &str) -> Result<()> {
        self.primary.add_prerequisite(from, to)
    }

    fn ping(&self) -> bool {
        self.primary.ping()
    }

    fn name(&self) -> &'static str {
        self.primary.name()
    }
}
