use ndarray::prelude::*;
use rayon::prelude::*;
use tracing::info;

use crate::error::Result;
use crate::predict::{accuracy, predict};
use crate::train::{layer_sizes_for, train, TrainConfig};

#[derive(Debug, Clone, PartialEq)]
pub struct SweepOutcome {
    pub hidden_size: usize,
    /// Training-set accuracy in percent.
    pub accuracy: f64,
}

/// Trains one `[n_x, n_h, n_y]` network per entry of `hidden_sizes` and scores
/// it on the training data. The runs share nothing, so they go to the rayon
/// pool; each run is still a sequential loop. Outcomes keep the input order.
pub fn sweep_hidden_sizes<'d>(
    x: ArrayView2<'d, f64>,
    y: ArrayView2<'d, f64>,
    hidden_sizes: &[usize],
    base: &TrainConfig,
) -> Result<Vec<SweepOutcome>> {
    hidden_sizes
        .par_iter()
        .map(|&hidden_size| {
            let config = TrainConfig {
                layer_sizes: layer_sizes_for(x, y, &[hidden_size]),
                ..base.clone()
            };
            let parameters = train(x, y, &config)?;
            let predictions = predict(&parameters, x)?;
            let accuracy = accuracy(predictions.view(), y)?;
            info!(hidden_size, accuracy, "sweep run finished");
            Ok(SweepOutcome {
                hidden_size,
                accuracy,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset;

    #[test]
    fn one_outcome_per_size_in_order() {
        let (x, y) = dataset::xor();
        let base = TrainConfig::default().with_iterations(200);
        let outcomes = sweep_hidden_sizes(x.view(), y.view(), &[1, 3, 2], &base).unwrap();
        let sizes: Vec<usize> = outcomes.iter().map(|o| o.hidden_size).collect();
        assert_eq!(sizes, vec![1, 3, 2]);
        assert!(outcomes.iter().all(|o| (0.0..=100.0).contains(&o.accuracy)));
    }

    #[test]
    fn zero_hidden_units_is_a_configuration_error() {
        let (x, y) = dataset::xor();
        let base = TrainConfig::default().with_iterations(10);
        let err = sweep_hidden_sizes(x.view(), y.view(), &[2, 0], &base).unwrap_err();
        assert!(err.is_configuration());
    }
}
