//! Graph command for Pythagore.
//!
//! Inspect and edit the knowledge graph: list prerequisites or follow-up
//! concepts, show a concept's recorded mastery, and add prerequisite edges.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::graph::{ConceptNode, KnowledgeGraphStore};

/// What the graph command should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphAction {
    /// Concepts that must be learned before `concept`.
    Prerequisites { concept: String },
    /// Concepts that build on `concept`.
    Next { concept: String },
    /// Recorded data for `concept`.
    Show { concept: String },
    /// Add a `from -> to` prerequisite edge.
    Link { from: String, to: String },
}

/// Options for the graph command.
#[derive(Debug, Clone)]
pub struct GraphOptions {
    pub action: GraphAction,
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the graph command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphOutput {
    /// Whether the command was successful.
    pub success: bool,
    /// Which action ran.
    pub action: String,
    /// Related concepts for list actions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concepts: Option<Vec<String>>,
    /// Concept node for `show`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<ConceptNode>,
    /// Human-readable summary of the action.
    pub message: String,
    /// Error message if command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GraphOutput {
    fn ok(action: &str, message: String) -> Self {
        Self {
            success: true,
            action: action.to_string(),
            concepts: None,
            node: None,
            message,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(action: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            action: action.to_string(),
            concepts: None,
            node: None,
            message: String::new(),
            error: Some(error.into()),
        }
    }

    /// Format as human-readable text.
    pub fn format_text(&self) -> String {
        if !self.success {
            return format!(
                "Graph {} failed: {}",
                self.action,
                self.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut lines = vec![self.message.clone()];
        if let Some(concepts) = &self.concepts {
            for concept in concepts {
                lines.push(format!("  {}", concept));
            }
        }
        if let Some(node) = &self.node {
            let mastery = node
                .last_mastery
                .map(|m| format!("{:.2}", m))
                .unwrap_or_else(|| "-".to_string());
            let when = node
                .last_interaction
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "-".to_string());
            lines.push(format!("  last mastery:     {}", mastery));
            lines.push(format!("  last interaction: {}", when));
        }
        lines.join("\n")
    }
}

/// The graph command implementation.
pub struct GraphCommand<S: KnowledgeGraphStore> {
    store: S,
}

impl<S: KnowledgeGraphStore> GraphCommand<S> {
    /// Create a new graph command.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Run the graph command.
    pub fn run(&self, options: &GraphOptions) -> GraphOutput {
        let name = action_name(&options.action);
        match self.execute(&options.action) {
            Ok(output) => output,
            Err(e) => GraphOutput::failure(name, e.to_string()),
        }
    }

    fn execute(&self, action: &GraphAction) -> Result<GraphOutput> {
        let name = action_name(action);
        match action {
            GraphAction::Prerequisites { concept } => {
                let concepts = self.store.prerequisites_of(concept)?;
                let mut output = GraphOutput::ok(
                    name,
                    format!("Prerequisites of '{}' ({}):", concept, concepts.len()),
                );
                output.concepts = Some(concepts);
                Ok(output)
            }
            GraphAction::Next { concept } => {
                let concepts = self.store.next_concepts_of(concept)?;
                let mut output = GraphOutput::ok(
                    name,
                    format!("Concepts after '{}' ({}):", concept, concepts.len()),
                );
                output.concepts = Some(concepts);
                Ok(output)
            }
            GraphAction::Show { concept } => match self.store.concept(concept)? {
                Some(node) => {
                    let mut output = GraphOutput::ok(name, format!("Concept '{}':", concept));
                    output.node = Some(node);
                    Ok(output)
                }
                None => Ok(GraphOutput::failure(
                    name,
                    format!("concept '{}' not found", concept),
                )),
            },
            GraphAction::Link { from, to } => {
                self.store.add_prerequisite(from, to)?;
                Ok(GraphOutput::ok(
                    name,
                    format!("'{}' is now a prerequisite of '{}'", from, to),
                ))
            }
        }
    }
}

fn action_name(action: &GraphAction) -> &'static str {
    match action {
        GraphAction::Prerequisites { .. } => "prereqs",
        GraphAction::Next { .. } => "next",
        GraphAction::Show { .. } => "show",
        GraphAction::Link { .. } => "link",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MemoryGraphStore;
    use chrono::Utc;
    use std::sync::Arc;

    fn options(action: GraphAction) -> GraphOptions {
        GraphOptions {
            action,
            json: false,
            quiet: false,
        }
    }

    fn create_test_store() -> Arc<MemoryGraphStore> {
        Arc::new(
            MemoryGraphStore::with_edges([
                ("squares", "pythagorean_theorem"),
                ("right_triangles", "pythagorean_theorem"),
                ("pythagorean_theorem", "distance_formula"),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn test_prerequisites() {
        let cmd = GraphCommand::new(create_test_store());
        let output = cmd.run(&options(GraphAction::Prerequisites {
            concept: "pythagorean_theorem".to_string(),
        }));
        assert!(output.success);
        assert_eq!(
            output.concepts,
            Some(vec!["right_triangles".to_string(), "squares".to_string()])
        );
        assert!(output.format_text().contains("  squares"));
    }

    #[test]
    fn test_next_for_isolated_concept() {
        let cmd = GraphCommand::new(create_test_store());
        let output = cmd.run(&options(GraphAction::Next {
            concept: "calculus".to_string(),
        }));
        assert!(output.success);
        assert_eq!(output.concepts, Some(vec![]));
    }

    #[test]
    fn test_show() {
        let store = create_test_store();
        store
            .record_interaction("pythagorean_theorem", 0.75, Utc::now())
            .unwrap();
        let cmd = GraphCommand::new(store);

        let output = cmd.run(&options(GraphAction::Show {
            concept: "pythagorean_theorem".to_string(),
        }));
        assert!(output.success);
        assert_eq!(output.node.as_ref().unwrap().last_mastery, Some(0.75));
        assert!(output.format_text().contains("0.75"));

        let missing = cmd.run(&options(GraphAction::Show {
            concept: "topology".to_string(),
        }));
        assert!(!missing.success);
    }

    #[test]
    fn test_link_and_cycle() {
        let store = create_test_store();
        let cmd = GraphCommand::new(store.clone());

        let output = cmd.run(&options(GraphAction::Link {
            from: "distance_formula".to_string(),
            to: "circles".to_string(),
        }));
        assert!(output.success);
        assert_eq!(
            store.prerequisites_of("circles").unwrap(),
            vec!["distance_formula"]
        );

        let output = cmd.run(&options(GraphAction::Link {
            from: "circles".to_string(),
            to: "squares".to_string(),
        }));
        assert!(!output.success);
        assert!(output.format_text().starts_with("Graph link failed"));
    }
}
