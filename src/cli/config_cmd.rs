//! Config command for Pythagore.
//!
//! Shows the effective configuration after the precedence chain has been
//! applied, along with the resolved file locations.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::{project_config_path, pythagore_home, Config, GraphBackend};

/// Options for the config command.
#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the config command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigOutput {
    /// Whether the command was successful.
    pub success: bool,
    /// Effective configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<Config>,
    /// Whether the effective configuration passes validation.
    pub valid: bool,
    /// Validation problem, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,
    /// Resolved paths.
    pub paths: ConfigPaths,
    /// Error message if command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Files the engine reads and writes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigPaths {
    pub home: Option<String>,
    pub project_config: String,
    pub graph: Option<String>,
    pub checkpoint: Option<String>,
}

impl ConfigOutput {
    /// Format as human-readable text.
    pub fn format_text(&self) -> String {
        let config = match (&self.config, self.success) {
            (Some(config), true) => config,
            _ => {
                return format!(
                    "Config failed: {}",
                    self.error.as_deref().unwrap_or("unknown error")
                )
            }
        };

        let mut lines = Vec::new();
        let show = |p: &Option<String>| p.clone().unwrap_or_else(|| "-".to_string());
        lines.push(format!("Home:           {}", show(&self.paths.home)));
        lines.push(format!("Project config: {}", self.paths.project_config));
        lines.push(format!("Graph file:     {}", show(&self.paths.graph)));
        lines.push(format!("Checkpoint:     {}", show(&self.paths.checkpoint)));
        lines.push(String::new());
        match config.to_toml() {
            Ok(toml) => lines.push(toml.trim_end().to_string()),
            Err(e) => lines.push(format!("(could not render config: {})", e)),
        }
        if let Some(problem) = &self.problem {
            lines.push(String::new());
            lines.push(format!("Invalid: {}", problem));
        }
        lines.join("\n")
    }
}

/// The config command implementation.
pub struct ConfigCommand;

impl ConfigCommand {
    /// Load the effective configuration for `cwd` and describe it.
    pub fn run(cwd: &Path, _options: &ConfigOptions) -> ConfigOutput {
        let paths = ConfigPaths {
            home: pythagore_home().map(|p| p.display().to_string()),
            project_config: project_config_path(cwd).display().to_string(),
            ..Default::default()
        };

        match Config::load_from_cwd(cwd) {
            Ok(config) => Self::describe(config, paths),
            Err(e) => ConfigOutput {
                success: false,
                config: None,
                valid: false,
                problem: None,
                paths,
                error: Some(e.to_string()),
            },
        }
    }

    fn describe(config: Config, mut paths: ConfigPaths) -> ConfigOutput {
        paths.graph = match config.graph.backend {
            GraphBackend::File => config.graph.file_path().map(|p| p.display().to_string()),
            GraphBackend::Memory | GraphBackend::Neo4j => None,
        };
        paths.checkpoint = config.checkpoint_path().map(|p| p.display().to_string());
        let problem = config.validate().err().map(|e| e.to_string());

        ConfigOutput {
            success: true,
            valid: problem.is_none(),
            problem,
            config: Some(config),
            paths,
            error: None,
        }
    }
}
