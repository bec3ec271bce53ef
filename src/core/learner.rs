//! Learner state snapshots.
//!
//! A `LearnerState` is supplied by the dialogue layer for one decision cycle
//! and discarded afterwards. Mastery is kept in a `BTreeMap` so iteration is
//! always lexicographic by concept id, which the state encoder relies on.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TutorError};

/// Snapshot of what a learner currently knows.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LearnerState {
    /// Mastery per concept id, each in [0, 1].
    pub concept_mastery: BTreeMap<String, f64>,
    /// The concept the dialogue is currently about.
    pub current_concept: String,
    /// Previously visited concepts, oldest first.
    #[serde(default)]
    pub learning_history: Vec<String>,
    /// Concepts the learner holds a misconception about.
    #[serde(default)]
    pub misconceptions: Vec<String>,
}

impl LearnerState {
    /// Create a state focused on `current_concept` with no mastery entries.
    pub fn new(current_concept: impl Into<String>) -> Self {
        Self {
            current_concept: current_concept.into(),
            ..Default::default()
        }
    }

    /// Set the mastery for a concept.
    pub fn with_mastery(mut self, concept: impl Into<String>, mastery: f64) -> Self {
        self.concept_mastery.insert(concept.into(), mastery);
        self
    }

    /// Append a concept to the learning history.
    pub fn with_history(mut self, concept: impl Into<String>) -> Self {
        self.learning_history.push(concept.into());
        self
    }

    /// Mark a concept as misunderstood.
    pub fn with_misconception(mut self, concept: impl Into<String>) -> Self {
        self.misconceptions.push(concept.into());
        self
    }

    /// Mastery of a concept, if recorded.
    pub fn mastery(&self, concept: &str) -> Option<f64> {
        self.concept_mastery.get(concept).copied()
    }

    /// Mastery of the current concept, `0.0` when not recorded.
    pub fn current_mastery(&self) -> f64 {
        self.mastery(&self.current_concept).unwrap_or(0.0)
    }

    /// Whether the current concept has a mastery entry.
    ///
    /// An empty current concept counts as consistent. This is not enforced
    /// on construction; only graph updates require it.
    pub fn is_consistent(&self) -> bool {
        self.current_concept.is_empty() || self.concept_mastery.contains_key(&self.current_concept)
    }

    /// Check that every mastery value is finite and within [0, 1].
    pub fn validate(&self) -> Result<()> {
        for (concept, mastery) in &self.concept_mastery {
            if !is_valid_mastery(*mastery) {
                return Err(TutorError::invalid_input(format!(
                    "mastery for '{}' must be in [0, 1], got {}",
                    concept, mastery
                )));
            }
        }
        Ok(())
    }

    /// Parse a state from JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let state: LearnerState = serde_json::from_str(json)?;
        state.validate()?;
        Ok(state)
    }
}

/// Check if a mastery value is valid (finite and in [0, 1]).
pub fn is_valid_mastery(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}
