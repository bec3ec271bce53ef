//! Teaching actions.
//!
//! The engine recommends one of four action types. Declaration order is
//! significant: it is the network output order and the tie-break order for
//! greedy selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TutorError;

/// Number of action types (network output size).
pub const ACTION_COUNT: usize = 4;

/// Kind of pedagogical move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Ask the learner a question.
    Question,
    /// Explain the concept.
    Explanation,
    /// Show a worked example.
    Example,
    /// Assign a practice exercise.
    Practice,
}

impl ActionType {
    /// All action types in declaration order.
    pub fn all() -> &'static [ActionType; ACTION_COUNT] {
        &[
            ActionType::Question,
            ActionType::Explanation,
            ActionType::Example,
            ActionType::Practice,
        ]
    }

    /// Position in the network output vector.
    pub fn index(self) -> usize {
        match self {
            ActionType::Question => 0,
            ActionType::Explanation => 1,
            ActionType::Example => 2,
            ActionType::Practice => 3,
        }
    }

    /// Inverse of [`ActionType::index`].
    pub fn from_index(index: usize) -> Option<ActionType> {
        Self::all().get(index).copied()
    }

    /// Lower-case tag used in JSON and CLI output.
    pub fn as_str(self) -> &'static str {
        match self {
            ActionType::Question => "question",
            ActionType::Explanation => "explanation",
            ActionType::Example => "example",
            ActionType::Practice => "practice",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = TutorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionType::all()
            .iter()
            .copied()
            .find(|a| a.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| TutorError::invalid_input(format!("unknown action type '{}'", s)))
    }
}

/// A recommended teaching move for one dialogue turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// What kind of move to make.
    pub action_type: ActionType,
    /// Concept the move targets.
    pub concept: String,
    /// Difficulty in [0, 1].
    pub difficulty: f64,
    /// Concepts that should be known before this one.
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

impl Action {
    /// Create an action with no prerequisites.
    pub fn new(action_type: ActionType, concept: impl Into<String>, difficulty: f64) -> Self {
        Self {
            action_type,
            concept: concept.into(),
            difficulty,
            prerequisites: Vec::new(),
        }
    }

    /// Set the prerequisite list.
    pub fn with_prerequisites(mut self, prerequisites: Vec<String>) -> Self {
        self.prerequisites = prerequisites;
        self
    }
}
