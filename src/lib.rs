//! Dense feedforward binary classifier trained by full-batch gradient descent.
//!
//! Hidden layers use tanh, the output layer a sigmoid, and the loss is the
//! average binary cross-entropy. Inputs are `(n_x, m)` matrices whose columns
//! are examples; labels are `(n_y, m)` matrices of zeros and ones.
//!
//! ```no_run
//! use ff_classifier::{dataset, predict, train, TrainConfig};
//!
//! let (x, y) = dataset::xor();
//! let config = TrainConfig::new(vec![2, 4, 1]);
//! let parameters = train(x.view(), y.view(), &config)?;
//! let predictions = predict(&parameters, x.view())?;
//! # Ok::<(), ff_classifier::NetworkError>(())
//! ```

#[cfg(feature = "blas")]
extern crate blas_src;

pub mod dataset;
pub mod error;
pub mod network;
pub mod params;
pub mod predict;
pub mod sweep;
pub mod train;

#[cfg(feature = "python")]
mod python;


pub use error::{NetworkError, Result};
pub use network::{backward, cost, forward, Cache};
pub use params::{Gradients, LayerGradients, LayerParams, Parameters};
pub use predict::{accuracy, predict, predict_proba};
pub use sweep::{sweep_hidden_sizes, SweepOutcome};
pub use train::{layer_sizes_for, train, TrainConfig, Trainer, TrainingState};
