//! Observed outcomes of a teaching action.

use serde::{Deserialize, Serialize};

use super::{Action, LearnerState};
use crate::error::{Result, TutorError};

/// One step of experience: the state before, the action taken, the reward
/// observed and the state after.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub state: LearnerState,
    pub action: Action,
    pub reward: f64,
    pub next_state: LearnerState,
}

impl Transition {
    /// Parse a transition from JSON and validate both states and the reward.
    pub fn from_json(json: &str) -> Result<Self> {
        let transition: Transition = serde_json::from_str(json)?;
        transition.validate()?;
        Ok(transition)
    }

    pub fn validate(&self) -> Result<()> {
        check_reward(self.reward)?;
        self.state.validate()?;
        self.next_state.validate()
    }
}

/// An action and its outcome without the follow-up state, as needed for
/// recording mastery in the knowledge graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub state: LearnerState,
    pub action: Action,
    #[serde(default)]
    pub reward: f64,
}

impl Interaction {
    /// Parse an interaction from JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let interaction: Interaction = serde_json::from_str(json)?;
        check_reward(interaction.reward)?;
        interaction.state.validate()?;
        Ok(interaction)
    }
}

impl From<Transition> for Interaction {
    fn from(t: Transition) -> Self {
        Self {
            state: t.state,
            action: t.action,
            reward: t.reward,
        }
    }
}

fn check_reward(reward: f64) -> Result<()> {
    if reward.is_finite() {
        Ok(())
    } else {
        Err(TutorError::invalid_input(format!(
            "reward must be finite, got {}",
            reward
        )))
    }
}
