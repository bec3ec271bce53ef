//! Knowledge graph store trait.
//!
//! A store holds `Concept` nodes and directed `PREREQUISITE_OF` edges
//! (`from -> to` meaning `from` must be learned before `to`), plus a cached
//! mastery and last-interaction timestamp per concept.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A concept with its cached interaction data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptNode {
    /// Unique concept id.
    pub name: String,
    /// Mastery recorded at the last interaction.
    #[serde(default)]
    pub last_mastery: Option<f64>,
    /// When the last interaction was recorded.
    #[serde(default)]
    pub last_interaction: Option<DateTime<Utc>>,
}

impl ConceptNode {
    /// A node with no recorded interaction.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            last_mastery: None,
            last_interaction: None,
        }
    }
}

/// Trait for concept graph backends.
///
/// Implementations may be in-process (memory, file) or remote (Neo4j). All
/// must be thread-safe; remote failures surface as
/// [`crate::TutorError::StoreUnavailable`] or
/// [`crate::TutorError::StoreTimeout`], never as an empty result.
pub trait KnowledgeGraphStore: Send + Sync {
    /// Concepts with an edge into `concept`, sorted by name.
    ///
    /// Returns an empty list for unknown concepts or concepts without
    /// prerequisites.
    fn prerequisites_of(&self, concept: &str) -> Result<Vec<String>>;

    /// Concepts `concept` has an edge to, sorted by name.
    fn next_concepts_of(&self, concept: &str) -> Result<Vec<String>>;

    /// Overwrite the cached mastery and timestamp of a concept.
    ///
    /// Creates the node if it does not exist. Repeating the call with the
    /// same values has no further effect.
    fn record_interaction(
        &self,
        concept: &str,
        mastery: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<()>;

    /// Look up a concept node.
    fn concept(&self, name: &str) -> Result<Option<ConceptNode>>;

    /// Add a `from -> to` prerequisite edge, creating missing nodes.
    ///
    /// Fails with [`crate::TutorError::CyclicPrerequisite`] if the edge is a
    /// self-loop or would close a cycle. Adding an existing edge is a no-op.
    fn add_prerequisite(&self, from: &str, to: &str) -> Result<()>;

    /// Health check for the backing service.
    fn ping(&self) -> bool;

    /// Backend name for logging.
    fn name(&self) -> &'static str;
}

impl<T: KnowledgeGraphStore + ?Sized> KnowledgeGraphStore for Arc<T> {
    fn prerequisites_of(&self, concept: &str) -> Result<Vec<String>> {
        (**self).prerequisites_of(concept)
    }

    fn next_concepts_of(&self, concept: &str) -> Result<Vec<String>> {
        (**self).next_concepts_of(concept)
    }

    fn record_interaction(
        &self,
        concept: &str,
        mastery: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        (**self).record_interaction(concept, mastery, timestamp)
    }

    fn concept(&self, name: &str) -> Result<Option<ConceptNode>> {
        (**self).concept(name)
    }

    fn add_prerequisite(&self, from: &str, to: &str) -> Result<()> {
        (**self).add_prerequisite(from, to)
    }

    fn ping(&self) -> bool {
        (**self).ping()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Blanket implementation for boxed trait objects.
impl KnowledgeGraphStore for Box<dyn KnowledgeGraphStore> {
    fn prerequisites_of(&self, concept: &str) -> Result<Vec<String>> {
        (**self).prerequisites_of(concept)
    }

    fn next_concepts_of(&self, concept: &str) -> Result<Vec<String>> {
        (**self).next_concepts_of(concept)
    }

    fn record_interaction(
        &self,
        concept: &str,
        mastery: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        (**self).record_interaction(concept, mastery, timestamp)
    }

    fn concept(&self, name: &str) -> Result<Option<ConceptNode>> {
        (**self).concept(name)
    }

    fn add_prerequisite(&self, from: &str, to: &str) -> Result<()> {
        (**self).add_prerequisite(from, to)
    }

    fn ping(&self) -> bool {
        (**self).ping()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Test utilities for KnowledgeGraphStore implementations.
#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::error::TutorError;

    /// Verify the behaviour every in-process store must share.
    pub fn test_graph_store_contract<S: KnowledgeGraphStore>(store: &S) {
        // Isolated concept: both directions empty
        assert!(store.prerequisites_of("isolated").unwrap().is_empty());
        assert!(store.next_concepts_of("isolated").unwrap().is_empty());
        assert!(store.concept("isolated").unwrap().is_none());

        // Edges in both directions, sorted by name
        store.add_prerequisite("squares", "pythagorean_theorem").unwrap();
        store
            .add_prerequisite("right_triangles", "pythagorean_theorem")
            .unwrap();
        store.add_prerequisite("pythagorean_theorem", "distance_formula").unwrap();

        assert_eq!(
            store.prerequisites_of("pythagorean_theorem").unwrap(),
            vec!["right_triangles", "squares"]
        );
        assert_eq!(
            store.next_concepts_of("pythagorean_theorem").unwrap(),
            vec!["distance_formula"]
        );
        assert!(store.prerequisites_of("squares").unwrap().is_empty());

        // Duplicate edge is a no-op
        store.add_prerequisite("squares", "pythagorean_theorem").unwrap();
        assert_eq!(store.prerequisites_of("pythagorean_theorem").unwrap().len(), 2);

        // Cycles rejected at write time
        let err = store
            .add_prerequisite("distance_formula", "squares")
            .unwrap_err();
        assert!(matches!(err, TutorError::CyclicPrerequisite { .. }));
        let err = store.add_prerequisite("squares", "squares").unwrap_err();
        assert!(matches!(err, TutorError::CyclicPrerequisite { .. }));

        // Record then read back
        let ts = Utc::now();
        store
            .record_interaction("pythagorean_theorem", 0.75, ts)
            .unwrap();
        let node = store.concept("pythagorean_theorem").unwrap().unwrap();
        assert_eq!(node.last_mastery, Some(0.75));
        assert_eq!(node.last_interaction, Some(ts));

        // Idempotent overwrite
        store
            .record_interaction("pythagorean_theorem", 0.75, ts)
            .unwrap();
        let again = store.concept("pythagorean_theorem").unwrap().unwrap();
        assert_eq!(node, again);

        // Unknown concepts are created on record
        store.record_interaction("new_concept", 0.1, ts).unwrap();
        assert_eq!(
            store.concept("new_concept").unwrap().unwrap().last_mastery,
            Some(0.1)
        );

        // Out-of-range mastery rejected
        assert!(matches!(
            store.record_interaction("squares", 1.2, ts),
            Err(TutorError::InvalidInput { .. })
        ));

        assert!(store.ping());
    }
}
