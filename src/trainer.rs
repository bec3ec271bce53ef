//! One-step temporal-difference updates.
//!
//! For a transition `(state, action, reward, next_state)`:
//!
//! ```text
//! td_target = reward + gamma * max(target_net(next_state))
//! target    = online_net(state) with [action] replaced by td_target
//! ```
//!
//! followed by a single optimiser step on the online network against the
//! mean-squared error between its output and `target`. There is no replay
//! buffer and no batching. The target network is refreshed from the online
//! network every `target_sync_interval` steps.

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::{ActionType, LearnerState};
use crate::encoder::StateEncoder;
use crate::error::{Result, TutorError};
use crate::network::{ForwardPass, QNetworks};

/// Default discount factor.
pub const DEFAULT_GAMMA: f64 = 0.99;

/// Default number of training steps between target refreshes.
pub const DEFAULT_TARGET_SYNC_INTERVAL: u64 = 100;

/// Outcome of a single training step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainReport {
    /// Temporal-difference target for the taken action.
    pub td_target: f64,
    /// MSE loss before the update.
    pub loss: f32,
    /// Total training steps after this one.
    pub step: u64,
    /// Whether the target network was refreshed by this step.
    pub target_synced: bool,
}

/// Applies TD updates to a [`QNetworks`] pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trainer {
    gamma: f64,
    target_sync_interval: u64,
}

impl Default for Trainer {
    fn default() -> Self {
        Self {
            gamma: DEFAULT_GAMMA,
            target_sync_interval: DEFAULT_TARGET_SYNC_INTERVAL,
        }
    }
}

impl Trainer {
    /// Create a trainer. `target_sync_interval == 0` disables automatic
    /// target refreshes.
    pub fn new(gamma: f64, target_sync_interval: u64) -> Result<Self> {
        if !gamma.is_finite() || !(0.0..=1.0).contains(&gamma) {
            return Err(TutorError::config(format!(
                "gamma must be in [0, 1], got {}",
                gamma
            )));
        }
        Ok(Self {
            gamma,
            target_sync_interval,
        })
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn target_sync_interval(&self) -> u64 {
        self.target_sync_interval
    }

    /// `reward + gamma * max(next_values)`.
    pub fn td_target(&self, reward: f64, next_values: &Array1<f32>) -> f64 {
        let best = next_values
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);
        reward + self.gamma * best as f64
    }

    /// Online output and regression target for a transition, without
    /// updating anything.
    pub fn target_values(
        &self,
        networks: &QNetworks,
        encoder: &StateEncoder,
        state: &LearnerState,
        action_type: ActionType,
        reward: f64,
        next_state: &LearnerState,
    ) -> Result<(Array1<f32>, Array1<f32>, f64)> {
        let (pass, target, td_target) =
            self.prepare(networks, encoder, state, action_type, reward, next_state)?;
        Ok((pass.output, target, td_target))
    }

    /// Apply one update to the online network.
    pub fn train(
        &self,
        networks: &mut QNetworks,
        encoder: &StateEncoder,
        state: &LearnerState,
        action_type: ActionType,
        reward: f64,
        next_state: &LearnerState,
    ) -> Result<TrainReport> {
        let (pass, target, td_target) =
            self.prepare(networks, encoder, state, action_type, reward, next_state)?;

        let (loss, grads) = networks.online.loss_gradients(&pass, &target)?;
        if !loss.is_finite() {
            return Err(TutorError::numeric(format!(
                "training loss is {}, update skipped",
                loss
            )));
        }
        networks.optimizer.step(&mut networks.online, &grads)?;
        networks.steps += 1;

        let target_synced = self.target_sync_interval > 0
            && networks.steps_since_sync() >= self.target_sync_interval;
        if target_synced {
            networks.sync_target();
            info!(step = networks.steps, "refreshed target network");
        }

        debug!(
            step = networks.steps,
            action = %action_type,
            reward,
            td_target,
            loss,
            "training step"
        );

        Ok(TrainReport {
            td_target,
            loss,
            step: networks.steps,
            target_synced,
        })
    }

    fn prepare(
        &self,
        networks: &QNetworks,
        encoder: &StateEncoder,
        state: &LearnerState,
        action_type: ActionType,
        reward: f64,
        next_state: &LearnerState,
    ) -> Result<(ForwardPass, Array1<f32>, f64)> {
        if !reward.is_finite() || !(reward as f32).is_finite() {
            return Err(TutorError::invalid_input(format!(
                "reward must be finite, got {}",
                reward
            )));
        }
        state.validate()?;
        next_state.validate()?;

        let pass = networks.online.forward(&encoder.encode(state))?;
        let next_values = networks.target.evaluate(&encoder.encode(next_state))?;
        let td_target = self.td_target(reward, &next_values);
        let narrowed = td_target as f32;
        if !narrowed.is_finite() {
            return Err(TutorError::numeric(format!(
                "td target {} is not representable",
                td_target
            )));
        }
        let target = build_target(&pass.output, action_type, narrowed);

        Ok((pass, target, td_target))
    }
}

/// Copy of `online_values` with the entry for `action_type` replaced.
pub fn build_target(
    online_values: &Array1<f32>,
    action_type: ActionType,
    td_target: f32,
) -> Array1<f32> {
    let mut target = online_values.clone();
    if let Some(slot) = target.get_mut(action_type.index()) {
        *slot = td_target;
    }
    target
}
