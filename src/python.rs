use ndarray::Axis;
use numpy::{IntoPyArray, PyArray1, PyArray2, PyReadonlyArray1, PyReadonlyArray2};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use rand::prelude::*;

use crate::error::NetworkError;
use crate::network::{cost, forward};
use crate::params::{LayerParams, Parameters, INIT_SCALE, SEED};
use crate::predict::{accuracy, predict, predict_proba};
use crate::train::{TrainConfig, Trainer, DEFAULT_ITERATIONS, DEFAULT_LEARNING_RATE};

impl From<NetworkError> for PyErr {
    fn from(err: NetworkError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

#[pyclass]
struct Network {
    parameters: Parameters,
}

#[pymethods]
impl Network {
    #[new]
    #[pyo3(signature = (sizes, seed = SEED, init_scale = INIT_SCALE))]
    fn py_new(sizes: Vec<usize>, seed: u64, init_scale: f64) -> PyResult<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        Ok(Self {
            parameters: Parameters::initialize_with(&sizes, init_scale, &mut rng)?,
        })
    }

    fn layer_sizes(&self) -> Vec<usize> {
        self.parameters.layer_sizes()
    }

    fn set_weights(&mut self, ws: Vec<PyReadonlyArray2<f64>>) -> PyResult<()> {
        let current = self.parameters.layers();
        if ws.len() != current.len() {
            return Err(NetworkError::shape("set_weights layer count", current.len(), ws.len()).into());
        }
        let layers = current
            .iter()
            .zip(&ws)
            .map(|(layer, w)| {
                let weights = w.as_array().to_owned();
                if weights.dim() != layer.weights.dim() {
                    return Err(NetworkError::shape("set_weights", layer.weights.dim(), weights.dim()));
                }
                Ok(LayerParams {
                    weights,
                    bias: layer.bias.clone(),
                })
            })
            .collect::<Result<Vec<_>, NetworkError>>()?;
        self.parameters = Parameters::from_layers(layers)?;
        Ok(())
    }

    fn set_biases(&mut self, bs: Vec<PyReadonlyArray1<f64>>) -> PyResult<()> {
        let current = self.parameters.layers();
        if bs.len() != current.len() {
            return Err(NetworkError::shape("set_biases layer count", current.len(), bs.len()).into());
        }
        let layers = current
            .iter()
            .zip(&bs)
            .map(|(layer, b)| {
                let bias = b.as_array().to_owned().insert_axis(Axis(1));
                if bias.dim() != layer.bias.dim() {
                    return Err(NetworkError::shape("set_biases", layer.bias.dim(), bias.dim()));
                }
                Ok(LayerParams {
                    weights: layer.weights.clone(),
                    bias,
                })
            })
            .collect::<Result<Vec<_>, NetworkError>>()?;
        self.parameters = Parameters::from_layers(layers)?;
        Ok(())
    }

    fn weights<'py>(&self, py: Python<'py>) -> Vec<&'py PyArray2<f64>> {
        self.parameters
            .layers()
            .iter()
            .map(|layer| layer.weights.clone().into_pyarray(py))
            .collect()
    }

    fn biases<'py>(&self, py: Python<'py>) -> Vec<&'py PyArray1<f64>> {
        self.parameters
            .layers()
            .iter()
            .map(|layer| layer.bias.column(0).to_owned().into_pyarray(py))
            .collect()
    }

    /// Continues gradient descent from the current weights.
    #[pyo3(signature = (x, y, learning_rate = DEFAULT_LEARNING_RATE, num_iterations = DEFAULT_ITERATIONS, print_cost = false))]
    fn train(
        &mut self,
        x: PyReadonlyArray2<f64>,
        y: PyReadonlyArray2<f64>,
        learning_rate: f64,
        num_iterations: usize,
        print_cost: bool,
    ) -> PyResult<()> {
        let config = TrainConfig::default()
            .with_learning_rate(learning_rate)
            .with_iterations(num_iterations)
            .with_print_cost(print_cost);
        let trainer = Trainer::resume(config, x.as_array(), y.as_array(), self.parameters.clone())?;
        self.parameters = trainer.run()?;
        Ok(())
    }

    fn cost(&self, x: PyReadonlyArray2<f64>, y: PyReadonlyArray2<f64>) -> PyResult<f64> {
        let cache = forward(x.as_array(), &self.parameters)?;
        Ok(cost(cache.output().view(), y.as_array())?)
    }

    fn evaluate(&self, x: PyReadonlyArray2<f64>, y: PyReadonlyArray2<f64>) -> PyResult<f64> {
        let predictions = predict(&self.parameters, x.as_array())?;
        Ok(accuracy(predictions.view(), y.as_array())?)
    }

    fn predict<'py>(&self, x: PyReadonlyArray2<f64>, py: Python<'py>) -> PyResult<&'py PyArray2<f64>> {
        Ok(predict(&self.parameters, x.as_array())?.into_pyarray(py))
    }

    fn predict_proba<'py>(&self, x: PyReadonlyArray2<f64>, py: Python<'py>) -> PyResult<&'py PyArray2<f64>> {
        Ok(predict_proba(&self.parameters, x.as_array())?.into_pyarray(py))
    }
}

#[pymodule]
fn ff_classifier(_: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<Network>()?;
    Ok(())
}
