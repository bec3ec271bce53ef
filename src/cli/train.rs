//! Train command for Pythagore.
//!
//! Applies one temporal-difference update from an observed transition,
//! optionally records the learner's mastery in the knowledge graph, and
//! saves the updated model.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::Transition;
use crate::engine::ReasoningEngine;
use crate::error::Result;
use crate::trainer::TrainReport;

/// Options for the train command.
#[derive(Debug, Clone, Default)]
pub struct TrainOptions {
    /// Transition as JSON.
    pub input: String,
    /// Also record the state's mastery of the action concept in the graph.
    pub record: bool,
    /// Where to save the model afterwards. Nothing is saved when absent.
    pub checkpoint: Option<PathBuf>,
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the train command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainOutput {
    /// Whether the command was successful.
    pub success: bool,
    /// Result of the training step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<TrainReport>,
    /// Whether mastery was written to the graph.
    pub recorded: bool,
    /// Checkpoint written, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<PathBuf>,
    /// Error message if command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TrainOutput {
    /// Create a successful output.
    pub fn success(report: TrainReport, recorded: bool, checkpoint: Option<PathBuf>) -> Self {
        Self {
            success: true,
            report: Some(report),
            recorded,
            checkpoint,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            report: None,
            recorded: false,
            checkpoint: None,
            error: Some(error.into()),
        }
    }

    /// Format as human-readable text.
    pub fn format_text(&self) -> String {
        let report = match (&self.report, self.success) {
            (Some(report), true) => report,
            _ => {
                return format!(
                    "Train failed: {}",
                    self.error.as_deref().unwrap_or("unknown error")
                )
            }
        };

        let mut lines = vec![format!(
            "Step {}: td_target {:.4}, loss {:.6}",
            report.step, report.td_target, report.loss
        )];
        if report.target_synced {
            lines.push("Target network refreshed".to_string());
        }
        if self.recorded {
            lines.push("Mastery recorded in knowledge graph".to_string());
        }
        if let Some(path) = &self.checkpoint {
            lines.push(format!("Saved model to {}", path.display()));
        }
        lines.join("\n")
    }
}

/// The train command implementation.
pub struct TrainCommand<'a> {
    engine: &'a ReasoningEngine,
}

impl<'a> TrainCommand<'a> {
    /// Create a new train command.
    pub fn new(engine: &'a ReasoningEngine) -> Self {
        Self { engine }
    }

    /// Run the train command.
    pub fn run(&self, options: &TrainOptions) -> TrainOutput {
        match self.train(options) {
            Ok((report, Ok(()))) => {
                TrainOutput::success(report, options.record, options.checkpoint.clone())
            }
            Ok((report, Err(e))) => {
                let kept = match &options.checkpoint {
                    Some(path) => format!("saved to {}", path.display()),
                    None => "kept in memory only".to_string(),
                };
                let error = format!(
                    "training step {} applied and {}, but recording mastery failed: {}",
                    report.step, kept, e
                );
                TrainOutput {
                    success: false,
                    report: Some(report),
                    recorded: false,
                    checkpoint: options.checkpoint.clone(),
                    error: Some(error),
                }
            }
            Err(e) => TrainOutput::failure(e.to_string()),
        }
    }

    /// Train, save, then record. The model is saved before the graph
    /// write so a graph failure never discards an applied update; the
    /// recording outcome is returned separately.
    fn train(&self, options: &TrainOptions) -> Result<(TrainReport, Result<()>)> {
        let transition = Transition::from_json(&options.input)?;

        let report = self.engine.train(
            &transition.state,
            &transition.action,
            transition.reward,
            &transition.next_state,
        )?;

        if let Some(path) = &options.checkpoint {
            self.engine.save_checkpoint(path)?;
        }

        let recorded = if options.record {
            self.engine.update_knowledge_graph(
                &transition.state,
                &transition.action,
                transition.reward,
            )
        } else {
            Ok(())
        };

        Ok((report, recorded))
    }
}
