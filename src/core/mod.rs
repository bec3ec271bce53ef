//! Core types for Pythagore.
//!
//! Learner state snapshots, the teaching actions chosen for them, and the
//! observed transitions used for training.

pub mod action;
pub mod learner;
pub mod transition;

pub use action::{Action, ActionType, ACTION_COUNT};
pub use learner::{is_valid_mastery, LearnerState};
pub use transition::{Interaction, Transition};
