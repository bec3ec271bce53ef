//! Record command for Pythagore.
//!
//! Writes the learner's mastery of an action's concept to the knowledge
//! graph without training the model.

use serde::{Deserialize, Serialize};

use crate::core::Interaction;
use crate::engine::ReasoningEngine;
use crate::error::Result;

/// Options for the record command.
#[derive(Debug, Clone, Default)]
pub struct RecordOptions {
    /// Interaction (`state`, `action`, `reward`) as JSON.
    pub input: String,
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the record command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordOutput {
    /// Whether the command was successful.
    pub success: bool,
    /// Concept that was updated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concept: Option<String>,
    /// Mastery that was stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mastery: Option<f64>,
    /// Error message if command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecordOutput {
    /// Create a successful output.
    pub fn success(concept: impl Into<String>, mastery: f64) -> Self {
        Self {
            success: true,
            concept: Some(concept.into()),
            mastery: Some(mastery),
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            concept: None,
            mastery: None,
            error: Some(error.into()),
        }
    }

    /// Format as human-readable text.
    pub fn format_text(&self) -> String {
        match (&self.concept, self.mastery, self.success) {
            (Some(concept), Some(mastery), true) => {
                format!("Recorded mastery {:.2} for '{}'", mastery, concept)
            }
            _ => format!(
                "Record failed: {}",
                self.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
}

/// The record command implementation.
pub struct RecordCommand<'a> {
    engine: &'a ReasoningEngine,
}

impl<'a> RecordCommand<'a> {
    /// Create a new record command.
    pub fn new(engine: &'a ReasoningEngine) -> Self {
        Self { engine }
    }

    /// Run the record command.
    pub fn run(&self, options: &RecordOptions) -> RecordOutput {
        match self.record(options) {
            Ok((concept, mastery)) => RecordOutput::success(concept, mastery),
            Err(e) => RecordOutput::failure(e.to_string()),
        }
    }

    fn record(&self, options: &RecordOptions) -> Result<(String, f64)> {
        let interaction = Interaction::from_json(&options.input)?;
        self.engine.update_knowledge_graph(
            &interaction.state,
            &interaction.action,
            interaction.reward,
        )?;
        let concept = interaction.action.concept;
        let mastery = interaction.state.mastery(&concept).unwrap_or_default();
        Ok((concept, mastery))
    }
}
