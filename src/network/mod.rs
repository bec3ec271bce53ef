//! Action-value estimation.
//!
//! This module provides the feed-forward value network, its optimiser, and
//! [`QNetworks`], the online/target pair shared by every learner session.

pub mod mlp;
pub mod optimizer;

pub use mlp::{DenseLayer, ForwardPass, ValueNetwork, HIDDEN_1, HIDDEN_2};
pub use optimizer::Adam;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TutorError};

/// Schema version for checkpoint serialization.
pub const CHECKPOINT_SCHEMA_VERSION: u8 = 1;

/// Online and target estimators plus optimiser state.
///
/// `online` is updated by every training step. `target` starts as an exact
/// copy and only changes through [`QNetworks::sync_target`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QNetworks {
    pub schema_version: u8,
    pub online: ValueNetwork,
    pub target: ValueNetwork,
    pub optimizer: Adam,
    /// Training steps applied to `online`.
    pub steps: u64,
    /// Value of `steps` at the last target refresh.
    pub last_sync_step: u64,
}

impl QNetworks {
    /// Create a fresh pair with random online weights.
    pub fn new<R: Rng + ?Sized>(input_dim: usize, learning_rate: f32, rng: &mut R) -> Self {
        Self::from_online(ValueNetwork::new(input_dim, rng), learning_rate)
    }

    /// Create a pair from an existing online network.
    pub fn from_online(online: ValueNetwork, learning_rate: f32) -> Self {
        let optimizer = Adam::new(&online, learning_rate);
        Self {
            schema_version: CHECKPOINT_SCHEMA_VERSION,
            target: online.clone(),
            online,
            optimizer,
            steps: 0,
            last_sync_step: 0,
        }
    }

    /// Input dimension both networks expect.
    pub fn input_dim(&self) -> usize {
        self.online.input_dim()
    }

    /// Check both networks are well formed and agree on input size.
    pub fn validate(&self) -> Result<()> {
        self.online.validate()?;
        self.target.validate()?;
        if self.online.input_dim() != self.target.input_dim() {
            return Err(TutorError::dimension_mismatch(
                self.online.input_dim(),
                self.target.input_dim(),
            ));
        }
        if self.last_sync_step > self.steps {
            return Err(TutorError::invalid_input(format!(
                "last target sync at step {} is after step count {}",
                self.last_sync_step, self.steps
            )));
        }
        self.optimizer.validate(&self.online)
    }

    /// Copy online parameters into the target network.
    pub fn sync_target(&mut self) {
        self.target = self.online.clone();
        self.last_sync_step = self.steps;
    }

    /// Steps since the last target refresh.
    pub fn steps_since_sync(&self) -> u64 {
        self.steps.saturating_sub(self.last_sync_step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_target_starts_as_copy() {
        let mut rng = StdRng::seed_from_u64(42);
        let nets = QNetworks::new(20, 0.001, &mut rng);
        assert_eq!(nets.online, nets.target);
        assert_eq!(nets.steps, 0);
        assert_eq!(nets.input_dim(), 20);
    }

    #[test]
    fn test_sync_target() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut nets = QNetworks::new(4, 0.001, &mut rng);

        nets.online = ValueNetwork::new(4, &mut rng);
        nets.steps = 7;
        assert_ne!(nets.online, nets.target);
        assert_eq!(nets.steps_since_sync(), 7);

        nets.sync_target();
        assert_eq!(nets.online, nets.target);
        assert_eq!(nets.steps_since_sync(), 0);
    }

    #[test]
    fn test_validate_rejects_inconsistent_state() {
        let mut rng = StdRng::seed_from_u64(8);
        let nets = QNetworks::new(5, 0.001, &mut rng);
        assert!(nets.validate().is_ok());

        let mut ahead = nets.clone();
        ahead.last_sync_step = 3;
        assert!(matches!(ahead.validate(), Err(TutorError::InvalidInput { .. })));
        assert_eq!(ahead.steps_since_sync(), 0);

        let mut mismatched = nets;
        mismatched.optimizer = Adam::new(&ValueNetwork::new(9, &mut rng), 0.001);
        assert!(matches!(
            mismatched.validate(),
            Err(TutorError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_checkpoint_json_roundtrip() {
        let mut rng = StdRng::seed_from_u64(1);
        let nets = QNetworks::new(6, 0.001, &mut rng);
        let json = serde_json::to_string(&nets).unwrap();
        let restored: QNetworks = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.steps, nets.steps);
        assert_eq!(restored.input_dim(), 6);

        let input = ndarray::Array1::from_elem(6, 0.25);
        let a = nets.online.evaluate(&input).unwrap();
        let b = restored.online.evaluate(&input).unwrap();
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-5);
        }
    }
}
