use ndarray::prelude::*;

use crate::error::{NetworkError, Result};
use crate::params::{Gradients, LayerGradients, Parameters};

/// Activations are clamped into `[EPSILON, 1 - EPSILON]` before the logarithm
/// in [`cost`], so a saturated sigmoid still yields a finite cost.
pub const EPSILON: f64 = 1e-15;

pub fn sigmoid(z: &ArrayView2<f64>) -> Array2<f64> {
    z.mapv(|x| 1.0 / (1.0 + (-x).exp()))
}

pub fn tanh(z: &ArrayView2<f64>) -> Array2<f64> {
    z.mapv(f64::tanh)
}

/// `1 - tanh(z)^2`, taken from the already computed activation `a = tanh(z)`.
fn tanh_prime_from_activation(a: &Array2<f64>) -> Array2<f64> {
    a.mapv(|a| 1.0 - a * a)
}

struct LayerCache {
    z: Array2<f64>,
    a: Array2<f64>,
}

/// Intermediates of one forward pass.
///
/// The cache borrows the parameters and the input it was computed from, and
/// [`backward`] takes it by value: a cache feeds exactly one backward pass, and
/// the parameters cannot be updated while it is alive.
pub struct Cache<'a> {
    parameters: &'a Parameters,
    input: ArrayView2<'a, f64>,
    layers: Vec<LayerCache>,
}

impl<'a> Cache<'a> {
    /// `A_L`, shape `(n_y, m)`.
    pub fn output(&self) -> &Array2<f64> {
        &self.layers[self.layers.len() - 1].a
    }

    pub fn into_output(mut self) -> Array2<f64> {
        let last = self.layers.len() - 1;
        self.layers.swap_remove(last).a
    }

    pub fn examples(&self) -> usize {
        self.input.ncols()
    }

    /// `Z_l` for layer `l` in `1..=L`.
    pub fn pre_activation(&self, l: usize) -> Option<&Array2<f64>> {
        l.checked_sub(1)
            .and_then(|i| self.layers.get(i))
            .map(|c| &c.z)
    }

    /// `A_l` for layer `l` in `1..=L`; `A_0` is the input itself.
    pub fn activation(&self, l: usize) -> Option<ArrayView2<'_, f64>> {
        match l {
            0 => Some(self.input.view()),
            _ => self.layers.get(l - 1).map(|c| c.a.view()),
        }
    }
}

/// Runs `X` through every layer: tanh on hidden layers, sigmoid on the output.
///
/// The input may outlive the parameters; the cache only keeps both for the
/// shorter of the two borrows.
pub fn forward<'a, 'x: 'a>(x: ArrayView2<'x, f64>, parameters: &'a Parameters) -> Result<Cache<'a>> {
    let x: ArrayView2<'a, f64> = x.reborrow();
    let depth = parameters.depth();
    if x.nrows() != parameters.input_size() {
        return Err(NetworkError::shape(
            "forward input rows (n_x)",
            parameters.input_size(),
            x.nrows(),
        ));
    }
    let m = x.ncols();
    if m == 0 {
        return Err(NetworkError::shape_expecting("forward examples", ">= 1", m));
    }

    let mut layers: Vec<LayerCache> = Vec::with_capacity(depth);
    for (l, layer) in parameters.layers().iter().enumerate() {
        let a_prev = match layers.last() {
            Some(cache) => cache.a.view(),
            None => x.view(),
        };
        let z = layer.weights.dot(&a_prev) + &layer.bias;
        let a = if l + 1 == depth {
            sigmoid(&z.view())
        } else {
            tanh(&z.view())
        };
        layers.push(LayerCache { z, a });
    }

    let cache = Cache {
        parameters,
        input: x,
        layers,
    };
    let expected = (parameters.output_size(), m);
    if cache.output().dim() != expected {
        return Err(NetworkError::shape(
            "forward output",
            expected,
            cache.output().dim(),
        ));
    }
    Ok(cache)
}

/// Average binary cross-entropy; `m` is the number of columns of `y`.
pub fn cost(a_l: ArrayView2<f64>, y: ArrayView2<f64>) -> Result<f64> {
    if a_l.dim() != y.dim() {
        return Err(NetworkError::shape("cost labels", a_l.dim(), y.dim()));
    }
    let m = y.ncols();
    if m == 0 {
        return Err(NetworkError::shape_expecting("cost examples", ">= 1", m));
    }
    let p = a_l.mapv(|v| v.clamp(EPSILON, 1.0 - EPSILON));
    let log_probs = &y * &p.mapv(f64::ln) + &(1.0 - &y) * &p.mapv(|v| (1.0 - v).ln());
    Ok(-log_probs.sum() / m as f64)
}

/// Reverse-mode pass over the cache of the matching forward pass.
///
/// Starts from `dZ_L = A_L - Y` and walks back to layer 1; every returned
/// gradient has the shape of its parameter.
pub fn backward(cache: Cache<'_>, y: ArrayView2<f64>) -> Result<Gradients> {
    let Cache {
        parameters,
        input,
        layers,
    } = cache;
    let depth = layers.len();
    let output = &layers[depth - 1].a;
    if y.dim() != output.dim() {
        return Err(NetworkError::shape("backward labels", output.dim(), y.dim()));
    }
    let m = y.ncols() as f64;

    let mut grads = Vec::with_capacity(depth);
    let mut d_z = output - &y;
    for l in (0..depth).rev() {
        let a_prev = if l == 0 {
            input.view()
        } else {
            layers[l - 1].a.view()
        };
        let d_weights = d_z.dot(&a_prev.t()) / m;
        let d_bias = d_z.sum_axis(Axis(1)).insert_axis(Axis(1)) / m;
        if l > 0 {
            let weights = &parameters.layers()[l].weights;
            d_z = weights.t().dot(&d_z) * &tanh_prime_from_activation(&layers[l - 1].a);
        }
        grads.push(LayerGradients { d_weights, d_bias });
    }
    grads.reverse();

    let grads = Gradients::new(grads);
    grads.check_against(parameters)?;
    Ok(grads)
}
