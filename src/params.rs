use ndarray::prelude::*;
use ndarray::Zip;
use rand::prelude::*;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::error::{NetworkError, Result};

pub const SEED: u64 = 42;

/// Multiplier applied to standard-normal weight draws. Keeps the first
/// pre-activations near zero, away from the flat tails of tanh and sigmoid,
/// while leaving hidden units different enough to break the symmetric saddle
/// that tiny draws (0.01) stall in on XOR-like data.
pub const INIT_SCALE: f64 = 0.1;

/// Weight matrix `(n_l, n_{l-1})` and bias column `(n_l, 1)` of one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerParams {
    pub weights: Array2<f64>,
    pub bias: Array2<f64>,
}

impl LayerParams {
    pub fn inputs(&self) -> usize {
        self.weights.ncols()
    }

    pub fn outputs(&self) -> usize {
        self.weights.nrows()
    }
}

/// Gradient of the cost with respect to one layer's parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerGradients {
    pub d_weights: Array2<f64>,
    pub d_bias: Array2<f64>,
}

/// Per-layer gradients produced by one backward pass, index-aligned with
/// [`Parameters::layers`].
#[derive(Debug, Clone, PartialEq)]
pub struct Gradients {
    layers: Vec<LayerGradients>,
}

impl Gradients {
    pub fn new(layers: Vec<LayerGradients>) -> Self {
        Self { layers }
    }

    pub fn layers(&self) -> &[LayerGradients] {
        &self.layers
    }

    /// Every gradient must have the shape of the parameter it belongs to.
    pub fn check_against(&self, parameters: &Parameters) -> Result<()> {
        if self.layers.len() != parameters.depth() {
            return Err(NetworkError::shape(
                "gradient layer count",
                parameters.depth(),
                self.layers.len(),
            ));
        }
        for (layer, grad) in parameters.layers().iter().zip(&self.layers) {
            if grad.d_weights.dim() != layer.weights.dim() {
                return Err(NetworkError::shape(
                    "weight gradient",
                    layer.weights.dim(),
                    grad.d_weights.dim(),
                ));
            }
            if grad.d_bias.dim() != layer.bias.dim() {
                return Err(NetworkError::shape(
                    "bias gradient",
                    layer.bias.dim(),
                    grad.d_bias.dim(),
                ));
            }
        }
        Ok(())
    }
}

/// The only state that survives from one training iteration to the next:
/// one `(W_l, b_l)` pair per layer, `l = 1..L`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<LayerParams>", into = "Vec<LayerParams>")]
pub struct Parameters {
    layers: Vec<LayerParams>,
}

fn check_layer_sizes(layer_sizes: &[usize]) -> Result<()> {
    if layer_sizes.len() < 2 {
        return Err(NetworkError::shape_expecting(
            "layer sizes (need input and output layer)",
            "at least 2 entries",
            layer_sizes,
        ));
    }
    if layer_sizes.iter().any(|&n| n == 0) {
        return Err(NetworkError::shape_expecting(
            "layer sizes",
            "all entries positive",
            layer_sizes,
        ));
    }
    Ok(())
}

impl Parameters {
    /// Seeded initialization with the default weight scale.
    pub fn initialize(layer_sizes: &[usize]) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(SEED);
        Self::initialize_with(layer_sizes, INIT_SCALE, &mut rng)
    }

    /// Draws `W_l ~ scale * N(0, 1)` and sets `b_l = 0` for every layer.
    pub fn initialize_with<R: Rng>(
        layer_sizes: &[usize],
        scale: f64,
        rng: &mut R,
    ) -> Result<Self> {
        check_layer_sizes(layer_sizes)?;
        let layers = layer_sizes
            .windows(2)
            .map(|pair| {
                let (n_prev, n) = (pair[0], pair[1]);
                let weights = Array::from_shape_simple_fn((n, n_prev), || {
                    scale * rng.sample::<f64, _>(StandardNormal)
                });
                LayerParams {
                    weights,
                    bias: Array::zeros((n, 1)),
                }
            })
            .collect();
        Ok(Self { layers })
    }

    /// Builds a parameter set from explicit matrices, checking that
    /// consecutive layers chain and that every bias is a `(n_l, 1)` column.
    pub fn from_layers(layers: Vec<LayerParams>) -> Result<Self> {
        if layers.is_empty() {
            return Err(NetworkError::shape_expecting("parameter layers", "at least 1", 0));
        }
        for (l, layer) in layers.iter().enumerate() {
            if layer.inputs() == 0 || layer.outputs() == 0 {
                return Err(NetworkError::shape_expecting(
                    "weight matrix",
                    "non-empty",
                    layer.weights.dim(),
                ));
            }
            if layer.bias.dim() != (layer.outputs(), 1) {
                return Err(NetworkError::shape(
                    "bias vector",
                    (layer.outputs(), 1),
                    layer.bias.dim(),
                ));
            }
            if l > 0 && layers[l - 1].outputs() != layer.inputs() {
                return Err(NetworkError::shape(
                    "weight matrix columns",
                    layers[l - 1].outputs(),
                    layer.inputs(),
                ));
            }
        }
        Ok(Self { layers })
    }

    pub fn layers(&self) -> &[LayerParams] {
        &self.layers
    }

    /// Number of weight layers `L`.
    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    /// `[n_0, n_1, .., n_L]`.
    pub fn layer_sizes(&self) -> Vec<usize> {
        let mut sizes = Vec::with_capacity(self.layers.len() + 1);
        if let Some(first) = self.layers.first() {
            sizes.push(first.inputs());
        }
        sizes.extend(self.layers.iter().map(LayerParams::outputs));
        sizes
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, LayerParams::inputs)
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map_or(0, LayerParams::outputs)
    }

    /// One gradient-descent step: `W_l -= lr * dW_l`, `b_l -= lr * db_l`.
    ///
    /// Consumes the previous parameter set and hands back the updated one, so
    /// a caller can never observe a half-updated or stale set. The gradients
    /// are only read.
    pub fn update(mut self, gradients: &Gradients, learning_rate: f64) -> Result<Self> {
        gradients.check_against(&self)?;
        self.descend(gradients, learning_rate);
        Ok(self)
    }

    /// In-place step for an owner that already holds gradients checked
    /// against this very set.
    pub(crate) fn descend(&mut self, gradients: &Gradients, learning_rate: f64) {
        for (layer, grad) in self.layers.iter_mut().zip(gradients.layers()) {
            Zip::from(&mut layer.weights)
                .and(&grad.d_weights)
                .par_for_each(|w, &dw| *w -= learning_rate * dw);
            Zip::from(&mut layer.bias)
                .and(&grad.d_bias)
                .par_for_each(|b, &db| *b -= learning_rate * db);
        }
    }
}

impl TryFrom<Vec<LayerParams>> for Parameters {
    type Error = NetworkError;

    fn try_from(layers: Vec<LayerParams>) -> Result<Self> {
        Self::from_layers(layers)
    }
}

impl From<Parameters> for Vec<LayerParams> {
    fn from(parameters: Parameters) -> Self {
        parameters.layers
    }
}
