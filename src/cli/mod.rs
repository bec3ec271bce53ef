//! CLI commands for Pythagore.
//!
//! Each command takes an options struct and returns an output struct that
//! can be printed as text or JSON:
//! - **Engine commands**: select, train, record
//! - **Graph commands**: graph prereqs/next/show/link
//! - **Utility commands**: config

// Engine commands
pub mod record;
pub mod select;
pub mod train;

// Graph commands
pub mod graph;

// Utility commands
pub mod config_cmd;

pub use config_cmd::ConfigCommand;
pub use graph::{GraphAction, GraphCommand};
pub use record::RecordCommand;
pub use select::SelectCommand;
pub use train::TrainCommand;
