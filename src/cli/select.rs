//! Select command for Pythagore.
//!
//! Reads a learner state and prints the recommended next action.

use serde::{Deserialize, Serialize};

use crate::core::{Action, LearnerState};
use crate::engine::ReasoningEngine;
use crate::error::Result;

/// Options for the select command.
#[derive(Debug, Clone, Default)]
pub struct SelectOptions {
    /// Learner state as JSON.
    pub input: String,
    /// Exploration rate. Uses the configured rate when absent.
    pub epsilon: Option<f64>,
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the select command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectOutput {
    /// Whether the command was successful.
    pub success: bool,
    /// The recommended action.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    /// Estimated value per action type.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub q_values: Vec<f32>,
    /// Error message if command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SelectOutput {
    /// Create a successful output.
    pub fn success(action: Action, q_values: Vec<f32>) -> Self {
        Self {
            success: true,
            action: Some(action),
            q_values,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            action: None,
            q_values: Vec::new(),
            error: Some(error.into()),
        }
    }

    /// Format as human-readable text.
    pub fn format_text(&self) -> String {
        let action = match (&self.action, self.success) {
            (Some(action), true) => action,
            _ => {
                return format!(
                    "Select failed: {}",
                    self.error.as_deref().unwrap_or("unknown error")
                )
            }
        };

        let mut lines = vec![format!(
            "{} on '{}' at difficulty {:.2}",
            action.action_type, action.concept, action.difficulty
        )];
        if action.prerequisites.is_empty() {
            lines.push("Prerequisites: none".to_string());
        } else {
            lines.push(format!(
                "Prerequisites: {}",
                action.prerequisites.join(", ")
            ));
        }
        if !self.q_values.is_empty() {
            let values: Vec<String> = self.q_values.iter().map(|v| format!("{:.4}", v)).collect();
            lines.push(format!("Values: [{}]", values.join(", ")));
        }
        lines.join("\n")
    }
}

/// The select command implementation.
pub struct SelectCommand<'a> {
    engine: &'a ReasoningEngine,
}

impl<'a> SelectCommand<'a> {
    /// Create a new select command.
    pub fn new(engine: &'a ReasoningEngine) -> Self {
        Self { engine }
    }

    /// Run the select command.
    pub fn run(&self, options: &SelectOptions) -> SelectOutput {
        match self.select(options) {
            Ok((action, values)) => SelectOutput::success(action, values),
            Err(e) => SelectOutput::failure(e.to_string()),
        }
    }

    fn select(&self, options: &SelectOptions) -> Result<(Action, Vec<f32>)> {
        let state = LearnerState::from_json(&options.input)?;
        let action = match options.epsilon {
            Some(epsilon) => self.engine.select_action(&state, epsilon)?,
            None => self.engine.select_default(&state)?,
        };
        let values = self.engine.q_values(&state)?;
        Ok((action, values))
    }
}
