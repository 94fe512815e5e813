use ndarray::prelude::*;

use crate::error::{NetworkError, Result};
use crate::network::forward;
use crate::params::Parameters;

pub const THRESHOLD: f64 = 0.5;

/// Output-layer probabilities `A_L` for every column of `x`.
pub fn predict_proba(parameters: &Parameters, x: ArrayView2<f64>) -> Result<Array2<f64>> {
    Ok(forward(x, parameters)?.into_output())
}

/// `1.0` where `A_L > 0.5`, `0.0` elsewhere; same shape as `A_L`.
pub fn predict(parameters: &Parameters, x: ArrayView2<f64>) -> Result<Array2<f64>> {
    let probabilities = predict_proba(parameters, x)?;
    Ok(probabilities.mapv(|p| if p > THRESHOLD { 1.0 } else { 0.0 }))
}

/// Percentage of entries where the prediction equals the label.
pub fn accuracy(predictions: ArrayView2<f64>, y: ArrayView2<f64>) -> Result<f64> {
    if predictions.dim() != y.dim() {
        return Err(NetworkError::shape("accuracy labels", predictions.dim(), y.dim()));
    }
    if y.is_empty() {
        return Err(NetworkError::shape_expecting("accuracy examples", ">= 1", 0));
    }
    let hits = predictions.iter().zip(y.iter()).filter(|(p, t)| p == t).count();
    Ok(hits as f64 / y.len() as f64 * 100.0)
}
