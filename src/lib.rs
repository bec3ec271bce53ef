//! Pythagore - adaptive tutoring decision engine
//!
//! Pythagore picks the next tutoring action (question, explanation, example,
//! practice) for a learner. A Q-value network scores the learner's encoded
//! state, an epsilon-greedy policy chooses between exploring and exploiting,
//! and a knowledge graph of concept prerequisites supplies the context
//! attached to each action. Observed transitions train the network with
//! temporal-difference updates.

pub mod cli;
pub mod config;
pub mod core;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod graph;
pub mod network;
pub mod policy;
pub mod trainer;

pub use config::{Config, TutorProfile};
pub use core::{Action, ActionType, Interaction, LearnerState, Transition, ACTION_COUNT};
pub use encoder::StateEncoder;
pub use engine::ReasoningEngine;
pub use error::{Result, TutorError};
pub use graph::{
    ConceptNode, FallbackGraphStore, FileGraphStore, KnowledgeGraphStore, MemoryGraphStore,
    Neo4jGraphStore,
};
pub use network::QNetworks;
pub use policy::PolicySelector;
pub use trainer::{TrainReport, Trainer};

// CLI commands
pub use cli::{ConfigCommand, GraphCommand, RecordCommand, SelectCommand, TrainCommand};
