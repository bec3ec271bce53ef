//! Pythagore - adaptive tutoring decision engine
//!
//! CLI entry point with global panic handler.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use pythagore::config::{pythagore_home, Config};
use pythagore::engine::{build_store, ReasoningEngine};
use pythagore::error::exit_codes;

// =============================================================================
// CLI Definition
// =============================================================================

/// Pythagore - pick the next tutoring action and learn from the outcome
#[derive(Parser)]
#[command(name = "pythagore")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Choose the next tutoring action for a learner state (JSON)
    Select {
        /// Learner state file. Reads stdin when absent or "-"
        input: Option<PathBuf>,
        /// Exploration rate, overriding engine.epsilon
        #[arg(long, short)]
        epsilon: Option<f64>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Apply one training step from a transition (JSON)
    Train {
        /// Transition file. Reads stdin when absent or "-"
        input: Option<PathBuf>,
        /// Also record mastery in the knowledge graph
        #[arg(long, short)]
        record: bool,
        /// Do not write the model checkpoint
        #[arg(long)]
        no_save: bool,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Record a learner's mastery in the knowledge graph (JSON)
    Record {
        /// Interaction file. Reads stdin when absent or "-"
        input: Option<PathBuf>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Inspect or edit the knowledge graph
    Graph {
        #[command(subcommand)]
        action: GraphSubcommand,
        /// Output as JSON
        #[arg(long, short, global = true)]
        json: bool,
        /// Suppress output
        #[arg(long, short, global = true)]
        quiet: bool,
    },

    /// Show the effective configuration
    Config {
        #[command(subcommand)]
        action: ConfigSubcommand,
        /// Output as JSON
        #[arg(long, short, global = true)]
        json: bool,
        /// Suppress output
        #[arg(long, short, global = true)]
        quiet: bool,
    },
}

#[derive(Subcommand)]
enum GraphSubcommand {
    /// List prerequisites of a concept
    Prereqs { concept: String },
    /// List concepts that build on a concept
    Next { concept: String },
    /// Show a concept's last recorded mastery
    Show { concept: String },
    /// Make FROM a prerequisite of TO
    Link { from: String, to: String },
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// Print the merged configuration and file locations
    Show,
}

impl From<GraphSubcommand> for pythagore::cli::GraphAction {
    fn from(action: GraphSubcommand) -> Self {
        use pythagore::cli::GraphAction;
        match action {
            GraphSubcommand::Prereqs { concept } => GraphAction::Prerequisites { concept },
            GraphSubcommand::Next { concept } => GraphAction::Next { concept },
            GraphSubcommand::Show { concept } => GraphAction::Show { concept },
            GraphSubcommand::Link { from, to } => GraphAction::Link { from, to },
        }
    }
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    setup_panic_handler();
    init_logging();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("pythagore error: {}", e);
            ExitCode::from(exit_codes::ERROR as u8)
        }
    }
}

/// Send diagnostics to stderr so stdout stays machine-readable.
///
/// Filter comes from `PYTHAGORE_LOG` (e.g. `pythagore=debug`), default `warn`.
fn init_logging() {
    let filter =
        EnvFilter::try_from_env("PYTHAGORE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init();
}

/// Set up the global panic handler.
///
/// On panic, logs to ~/.pythagore/crash.log and exits with code 3.
fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("pythagore panic: {}", info);

        if let Some(home) = pythagore_home() {
            let _ = std::fs::create_dir_all(&home);
            let crash_log = home.join("crash.log");
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&crash_log)
            {
                let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
                let _ = writeln!(file, "[{}] {}", timestamp, info);
            }
        }

        std::process::exit(exit_codes::CRASH);
    }));
}

/// Run the CLI and return the exit code.
fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Select {
            input,
            epsilon,
            json,
            quiet,
        } => run_select(input.as_deref(), epsilon, json, quiet, &cwd),
        Commands::Train {
            input,
            record,
            no_save,
            json,
            quiet,
        } => run_train(input.as_deref(), record, no_save, json, quiet, &cwd),
        Commands::Record { input, json, quiet } => run_record(input.as_deref(), json, quiet, &cwd),
        Commands::Graph {
            action,
            json,
            quiet,
        } => run_graph(action, json, quiet, &cwd),
        Commands::Config {
            action: ConfigSubcommand::Show,
            json,
            quiet,
        } => run_config(json, quiet, &cwd),
    }
}

/// Convert a success boolean to an exit code.
fn success_to_exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::from(exit_codes::SUCCESS as u8)
    } else {
        ExitCode::from(exit_codes::ERROR as u8)
    }
}

/// Read command input from a file, or stdin for `None` and `-`.
fn read_input(path: Option<&Path>) -> std::io::Result<String> {
    match path {
        Some(p) if p != Path::new("-") => std::fs::read_to_string(p),
        _ => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

fn print_output<T: Serialize>(
    output: &T,
    text: impl FnOnce() -> String,
    json: bool,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !quiet {
        if json {
            println!("{}", serde_json::to_string_pretty(output)?);
        } else {
            println!("{}", text());
        }
    }
    Ok(())
}

fn run_select(
    input: Option<&Path>,
    epsilon: Option<f64>,
    json: bool,
    quiet: bool,
    cwd: &Path,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use pythagore::cli::select::{SelectCommand, SelectOptions};

    let config = Config::load_from_cwd(cwd)?;
    let engine = ReasoningEngine::from_config(&config)?;

    let cmd = SelectCommand::new(&engine);
    let options = SelectOptions {
        input: read_input(input)?,
        epsilon,
        json,
        quiet,
    };

    let output = cmd.run(&options);
    print_output(&output, || output.format_text(), json, quiet)?;

    Ok(success_to_exit_code(output.success))
}

fn run_train(
    input: Option<&Path>,
    record: bool,
    no_save: bool,
    json: bool,
    quiet: bool,
    cwd: &Path,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use pythagore::cli::train::{TrainCommand, TrainOptions};

    let config = Config::load_from_cwd(cwd)?;
    let engine = ReasoningEngine::from_config(&config)?;

    let cmd = TrainCommand::new(&engine);
    let options = TrainOptions {
        input: read_input(input)?,
        record,
        checkpoint: if no_save {
            None
        } else {
            config.checkpoint_path()
        },
        json,
        quiet,
    };

    let output = cmd.run(&options);
    print_output(&output, || output.format_text(), json, quiet)?;

    Ok(success_to_exit_code(output.success))
}

fn run_record(
    input: Option<&Path>,
    json: bool,
    quiet: bool,
    cwd: &Path,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use pythagore::cli::record::{RecordCommand, RecordOptions};

    let config = Config::load_from_cwd(cwd)?;
    let engine = ReasoningEngine::from_config(&config)?;

    let cmd = RecordCommand::new(&engine);
    let options = RecordOptions {
        input: read_input(input)?,
        json,
        quiet,
    };

    let output = cmd.run(&options);
    print_output(&output, || output.format_text(), json, quiet)?;

    Ok(success_to_exit_code(output.success))
}

fn run_graph(
    action: GraphSubcommand,
    json: bool,
    quiet: bool,
    cwd: &Path,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use pythagore::cli::graph::{GraphCommand, GraphOptions};

    let config = Config::load_from_cwd(cwd)?;
    config.validate()?;
    let store = build_store(&config.graph)?;

    let cmd = GraphCommand::new(store);
    let options = GraphOptions {
        action: action.into(),
        json,
        quiet,
    };

    let output = cmd.run(&options);
    print_output(&output, || output.format_text(), json, quiet)?;

    Ok(success_to_exit_code(output.success))
}

fn run_config(json: bool, quiet: bool, cwd: &Path) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use pythagore::cli::config_cmd::{ConfigCommand, ConfigOptions};

    let options = ConfigOptions { json, quiet };
    let output = ConfigCommand::run(cwd, &options);
    print_output(&output, || output.format_text(), json, quiet)?;

    Ok(success_to_exit_code(output.success))
}

// =============================================================================
// Tests
// =============================================================================
