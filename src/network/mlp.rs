//! Feed-forward action-value network.
//!
//! Architecture: `D -> 64 -> 32 -> 4`, ReLU after each hidden layer and a
//! linear output, so values are unbounded reals. Backpropagation is written
//! out by hand for the mean-squared-error loss used by the trainer.

use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::ACTION_COUNT;
use crate::error::{Result, TutorError};

/// Width of the first hidden layer.
pub const HIDDEN_1: usize = 64;
/// Width of the second hidden layer.
pub const HIDDEN_2: usize = 32;

/// One affine layer: `y = W x + b`, with `W` shaped `[out, in]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub weights: Array2<f32>,
    pub bias: Array1<f32>,
}

impl DenseLayer {
    /// Uniform init in `[-1/sqrt(in), 1/sqrt(in)]`.
    pub fn random<R: Rng + ?Sized>(inputs: usize, outputs: usize, rng: &mut R) -> Self {
        let bound = 1.0 / (inputs as f32).sqrt();
        Self {
            weights: Array2::from_shape_fn((outputs, inputs), |_| rng.gen_range(-bound..bound)),
            bias: Array1::from_shape_fn(outputs, |_| rng.gen_range(-bound..bound)),
        }
    }

    /// A layer with every parameter zero.
    pub fn zeros(inputs: usize, outputs: usize) -> Self {
        Self {
            weights: Array2::zeros((outputs, inputs)),
            bias: Array1::zeros(outputs),
        }
    }

    /// Zeroed layer with the same shape as `self`.
    pub fn zeros_like(&self) -> Self {
        Self::zeros(self.inputs(), self.outputs())
    }

    pub fn inputs(&self) -> usize {
        self.weights.ncols()
    }

    pub fn outputs(&self) -> usize {
        self.weights.nrows()
    }

    fn affine(&self, x: &Array1<f32>) -> Array1<f32> {
        self.weights.dot(x) + &self.bias
    }
}

/// Intermediate activations kept for backpropagation.
#[derive(Debug, Clone)]
pub struct ForwardPass {
    input: Array1<f32>,
    z1: Array1<f32>,
    h1: Array1<f32>,
    z2: Array1<f32>,
    h2: Array1<f32>,
    /// Network output, one value per action type.
    pub output: Array1<f32>,
}

/// The action-value function approximator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueNetwork {
    layers: Vec<DenseLayer>,
}

impl ValueNetwork {
    /// Create a randomly initialised network for inputs of length `input_dim`.
    pub fn new<R: Rng + ?Sized>(input_dim: usize, rng: &mut R) -> Self {
        Self {
            layers: vec![
                DenseLayer::random(input_dim, HIDDEN_1, rng),
                DenseLayer::random(HIDDEN_1, HIDDEN_2, rng),
                DenseLayer::random(HIDDEN_2, ACTION_COUNT, rng),
            ],
        }
    }

    /// Build a network from explicit layers, checking the shapes chain up.
    pub fn from_layers(layers: Vec<DenseLayer>) -> Result<Self> {
        check_shapes(&layers)?;
        Ok(Self { layers })
    }

    /// Re-check layer shapes, e.g. after deserializing a checkpoint.
    pub fn validate(&self) -> Result<()> {
        check_shapes(&self.layers)
    }

    /// Expected input length.
    pub fn input_dim(&self) -> usize {
        self.layers[0].inputs()
    }

    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    pub(crate) fn layers_mut(&mut self) -> &mut [DenseLayer] {
        &mut self.layers
    }

    /// Estimate one value per action type.
    pub fn evaluate(&self, input: &Array1<f32>) -> Result<Array1<f32>> {
        Ok(self.forward(input)?.output)
    }

    /// Run the network and keep activations for a backward pass.
    pub fn forward(&self, input: &Array1<f32>) -> Result<ForwardPass> {
        if input.len() != self.input_dim() {
            return Err(TutorError::dimension_mismatch(
                self.input_dim(),
                input.len(),
            ));
        }

        let z1 = self.layers[0].affine(input);
        let h1 = z1.mapv(relu);
        let z2 = self.layers[1].affine(&h1);
        let h2 = z2.mapv(relu);
        let output = self.layers[2].affine(&h2);

        Ok(ForwardPass {
            input: input.clone(),
            z1,
            h1,
            z2,
            h2,
            output,
        })
    }

    /// Mean-squared-error loss and its parameter gradients.
    ///
    /// Gradients are returned as layers with the same shapes as the network.
    pub fn loss_gradients(
        &self,
        pass: &ForwardPass,
        target: &Array1<f32>,
    ) -> Result<(f32, Vec<DenseLayer>)> {
        if target.len() != pass.output.len() {
            return Err(TutorError::dimension_mismatch(
                pass.output.len(),
                target.len(),
            ));
        }

        let n = target.len() as f32;
        let diff = &pass.output - target;
        let loss = diff.mapv(|d| d * d).sum() / n;

        let d_out = diff.mapv(|d| 2.0 * d / n);
        let g3 = DenseLayer {
            weights: outer(&d_out, &pass.h2),
            bias: d_out.clone(),
        };

        let d_h2 = self.layers[2].weights.t().dot(&d_out);
        let d_z2 = &d_h2 * &pass.z2.mapv(relu_grad);
        let g2 = DenseLayer {
            weights: outer(&d_z2, &pass.h1),
            bias: d_z2.clone(),
        };

        let d_h1 = self.layers[1].weights.t().dot(&d_z2);
        let d_z1 = &d_h1 * &pass.z1.mapv(relu_grad);
        let g1 = DenseLayer {
            weights: outer(&d_z1, &pass.input),
            bias: d_z1,
        };

        Ok((loss, vec![g1, g2, g3]))
    }

    /// Total number of trainable parameters.
    pub fn num_parameters(&self) -> usize {
        self.layers
            .iter()
            .map(|l| l.weights.len() + l.bias.len())
            .sum()
    }
}

fn check_shapes(layers: &[DenseLayer]) -> Result<()> {
    if layers.len() != 3 {
        return Err(TutorError::invalid_input(format!(
            "value network needs 3 layers, got {}",
            layers.len()
        )));
    }
    if layers[0].inputs() == 0 {
        return Err(TutorError::invalid_input("value network input is empty"));
    }
    let expected = [HIDDEN_1, HIDDEN_2, ACTION_COUNT];
    for (i, layer) in layers.iter().enumerate() {
        if layer.outputs() != expected[i] || layer.bias.len() != expected[i] {
            return Err(TutorError::dimension_mismatch(expected[i], layer.outputs()));
        }
        if i > 0 && layer.inputs() != layers[i - 1].outputs() {
            return Err(TutorError::dimension_mismatch(
                layers[i - 1].outputs(),
                layer.inputs(),
            ));
        }
    }
    Ok(())
}

fn relu(x: f32) -> f32 {
    x.max(0.0)
}

fn relu_grad(x: f32) -> f32 {
    if x > 0.0 {
        1.0
    } else {
        0.0
    }
}

fn outer(a: &Array1<f32>, b: &Array1<f32>) -> Array2<f32> {
    a.view()
        .insert_axis(Axis(1))
        .dot(&b.view().insert_axis(Axis(0)))
}
