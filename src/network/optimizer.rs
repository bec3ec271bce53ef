//! Adam optimiser for [`ValueNetwork`] parameters.

use serde::{Deserialize, Serialize};

use super::mlp::{DenseLayer, ValueNetwork};
use crate::error::{Result, TutorError};

pub const DEFAULT_BETA1: f32 = 0.9;
pub const DEFAULT_BETA2: f32 = 0.999;
pub const DEFAULT_EPSILON: f32 = 1e-8;

/// Adam with bias-corrected first and second moment estimates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    /// Number of steps taken.
    t: u64,
    m: Vec<DenseLayer>,
    v: Vec<DenseLayer>,
}

impl Adam {
    /// Create an optimiser for `network` with the given learning rate.
    pub fn new(network: &ValueNetwork, learning_rate: f32) -> Self {
        let zeros: Vec<DenseLayer> = network.layers().iter().map(DenseLayer::zeros_like).collect();
        Self {
            learning_rate,
            beta1: DEFAULT_BETA1,
            beta2: DEFAULT_BETA2,
            epsilon: DEFAULT_EPSILON,
            t: 0,
            m: zeros.clone(),
            v: zeros,
        }
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    pub fn steps(&self) -> u64 {
        self.t
    }

    /// Check the moment estimates match `network` layer for layer.
    pub fn validate(&self, network: &ValueNetwork) -> Result<()> {
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(TutorError::invalid_input(format!(
                "optimiser learning rate must be positive, got {}",
                self.learning_rate
            )));
        }
        let layers = network.layers();
        for moments in [&self.m, &self.v] {
            if moments.len() != layers.len() {
                return Err(TutorError::dimension_mismatch(layers.len(), moments.len()));
            }
            for (layer, moment) in layers.iter().zip(moments) {
                if moment.weights.dim() != layer.weights.dim()
                    || moment.bias.len() != layer.bias.len()
                {
                    return Err(TutorError::dimension_mismatch(
                        layer.weights.len(),
                        moment.weights.len(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Apply one update to `network` from `grads`.
    pub fn step(&mut self, network: &mut ValueNetwork, grads: &[DenseLayer]) -> Result<()> {
        self.validate(network)?;
        if grads.len() != self.m.len() {
            return Err(TutorError::dimension_mismatch(self.m.len(), grads.len()));
        }
        for (layer, g) in network.layers().iter().zip(grads) {
            if g.weights.dim() != layer.weights.dim() || g.bias.len() != layer.bias.len() {
                return Err(TutorError::dimension_mismatch(
                    layer.weights.len(),
                    g.weights.len(),
                ));
            }
        }

        self.t += 1;
        let t = self.t as i32;
        let bc1 = 1.0 - self.beta1.powi(t);
        let bc2 = 1.0 - self.beta2.powi(t);
        let (b1, b2, lr, eps) = (self.beta1, self.beta2, self.learning_rate, self.epsilon);

        for (((layer, g), m), v) in network
            .layers_mut()
            .iter_mut()
            .zip(grads)
            .zip(self.m.iter_mut())
            .zip(self.v.iter_mut())
        {
            m.weights.zip_mut_with(&g.weights, |m, g| *m = b1 * *m + (1.0 - b1) * g);
            v.weights.zip_mut_with(&g.weights, |v, g| *v = b2 * *v + (1.0 - b2) * g * g);
            m.bias.zip_mut_with(&g.bias, |m, g| *m = b1 * *m + (1.0 - b1) * g);
            v.bias.zip_mut_with(&g.bias, |v, g| *v = b2 * *v + (1.0 - b2) * g * g);

            ndarray::Zip::from(&mut layer.weights)
                .and(&m.weights)
                .and(&v.weights)
                .for_each(|w, m, v| *w -= lr * (m / bc1) / ((v / bc2).sqrt() + eps));
            ndarray::Zip::from(&mut layer.bias)
                .and(&m.bias)
                .and(&v.bias)
                .for_each(|b, m, v| *b -= lr * (m / bc1) / ((v / bc2).sqrt() + eps));
        }

        Ok(())
    }
}
