//! In-process graph document shared by the memory and file stores.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::traits::ConceptNode;
use crate::core::is_valid_mastery;
use crate::error::{Result, TutorError};

/// Schema version for the persisted graph document.
pub const GRAPH_SCHEMA_VERSION: u8 = 1;

/// Directed `PREREQUISITE_OF` relation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PrerequisiteEdge {
    /// Concept learned first.
    pub from: String,
    /// Concept that depends on `from`.
    pub to: String,
}

/// Nodes and edges of a concept graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    pub schema_version: u8,
    #[serde(default)]
    pub concepts: BTreeMap<String, ConceptNode>,
    #[serde(default)]
    pub edges: BTreeSet<PrerequisiteEdge>,
}

impl Default for GraphData {
    fn default() -> Self {
        Self {
            schema_version: GRAPH_SCHEMA_VERSION,
            concepts: BTreeMap::new(),
            edges: BTreeSet::new(),
        }
    }
}

impl GraphData {
    pub fn prerequisites_of(&self, concept: &str) -> Vec<String> {
        // BTreeSet order is (from, to), so collect then sort by name.
        let mut result: Vec<String> = self
            .edges
            .iter()
            .filter(|e| e.to == concept)
            .map(|e| e.from.clone())
            .collect();
        result.sort();
        result
    }

    pub fn next_concepts_of(&self, concept: &str) -> Vec<String> {
        self.edges
            .iter()
            .filter(|e| e.from == concept)
            .map(|e| e.to.clone())
            .collect()
    }

    pub fn record_interaction(
        &mut self,
        concept: &str,
        mastery: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        if !is_valid_mastery(mastery) {
            return Err(TutorError::invalid_input(format!(
                "mastery for '{}' must be in [0, 1], got {}",
                concept, mastery
            )));
        }
        let node = self
            .concepts
            .entry(concept.to_string())
            .or_insert_with(|| ConceptNode::new(concept));
        node.last_mastery = Some(mastery);
        node.last_interaction = Some(timestamp);
        Ok(())
    }

    /// Add an edge. Returns `true` if the graph changed.
    pub fn add_prerequisite(&mut self, from: &str, to: &str) -> Result<bool> {
        if from == to || self.reaches(to, from) {
            return Err(TutorError::cyclic_prerequisite(from, to));
        }
        for name in [from, to] {
            self.concepts
                .entry(name.to_string())
                .or_insert_with(|| ConceptNode::new(name));
        }
        Ok(self.edges.insert(PrerequisiteEdge {
            from: from.to_string(),
            to: to.to_string(),
        }))
    }

    /// Whether `target` is reachable from `start` along edges.
    fn reaches(&self, start: &str, target: &str) -> bool {
        let mut stack = vec![start.to_string()];
        let mut seen = BTreeSet::new();
        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            if !seen.insert(current.clone()) {
                continue;
            }
            stack.extend(self.next_concepts_of(&current));
        }
        false
    }
}
