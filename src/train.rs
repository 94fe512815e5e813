use ndarray::prelude::*;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{NetworkError, Result};
use crate::network::{backward, cost, forward};
use crate::params::{Parameters, INIT_SCALE, SEED};

/// Cost is reported on every iteration index divisible by this.
pub const REPORT_EVERY: usize = 1000;

pub const DEFAULT_LEARNING_RATE: f64 = 1.2;
pub const DEFAULT_ITERATIONS: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// `[n_x, hidden.., n_y]`
    pub layer_sizes: Vec<usize>,
    pub learning_rate: f64,
    pub num_iterations: usize,
    pub print_cost: bool,
    pub init_scale: f64,
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            layer_sizes: Vec::new(),
            learning_rate: DEFAULT_LEARNING_RATE,
            num_iterations: DEFAULT_ITERATIONS,
            print_cost: false,
            init_scale: INIT_SCALE,
            seed: SEED,
        }
    }
}

impl TrainConfig {
    pub fn new(layer_sizes: Vec<usize>) -> Self {
        Self {
            layer_sizes,
            ..Self::default()
        }
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_iterations(mut self, num_iterations: usize) -> Self {
        self.num_iterations = num_iterations;
        self
    }

    pub fn with_print_cost(mut self, print_cost: bool) -> Self {
        self.print_cost = print_cost;
        self
    }

    pub fn with_init_scale(mut self, init_scale: f64) -> Self {
        self.init_scale = init_scale;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.layer_sizes.len() < 2 {
            return Err(NetworkError::Configuration(format!(
                "layer_sizes needs an input and an output layer, got {:?}",
                self.layer_sizes
            )));
        }
        if let Some(l) = self.layer_sizes.iter().position(|&n| n == 0) {
            return Err(NetworkError::Configuration(format!(
                "layer_sizes[{}] must be positive, got {:?}",
                l, self.layer_sizes
            )));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(NetworkError::Configuration(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.num_iterations == 0 {
            return Err(NetworkError::Configuration(
                "num_iterations must be positive".to_string(),
            ));
        }
        if !(self.init_scale.is_finite() && self.init_scale > 0.0) {
            return Err(NetworkError::Configuration(format!(
                "init_scale must be positive, got {}",
                self.init_scale
            )));
        }
        Ok(())
    }
}

/// `[n_x, hidden.., n_y]`, with `n_x` and `n_y` read off the data.
pub fn layer_sizes_for(x: ArrayView2<f64>, y: ArrayView2<f64>, hidden: &[usize]) -> Vec<usize> {
    let mut sizes = Vec::with_capacity(hidden.len() + 2);
    sizes.push(x.nrows());
    sizes.extend_from_slice(hidden);
    sizes.push(y.nrows());
    sizes
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingState {
    Initialized,
    Iterating { completed: usize },
    Exhausted,
}

/// Drives forward, cost, backward and update for a fixed number of
/// iterations over the whole batch. There is no early stopping.
pub struct Trainer<'d> {
    config: TrainConfig,
    x: ArrayView2<'d, f64>,
    y: ArrayView2<'d, f64>,
    parameters: Parameters,
    completed: usize,
}

fn check_data(layer_sizes: &[usize], x: &ArrayView2<f64>, y: &ArrayView2<f64>) -> Result<()> {
    if x.ncols() != y.ncols() {
        return Err(NetworkError::shape("label columns", x.ncols(), y.ncols()));
    }
    if x.ncols() == 0 {
        return Err(NetworkError::shape_expecting("training examples", ">= 1", 0));
    }
    if layer_sizes.first() != Some(&x.nrows()) {
        return Err(NetworkError::shape("input layer size (n_x)", x.nrows(), layer_sizes));
    }
    if layer_sizes.last() != Some(&y.nrows()) {
        return Err(NetworkError::shape("output layer size (n_y)", y.nrows(), layer_sizes));
    }
    Ok(())
}

impl<'d> Trainer<'d> {
    /// Validates the configuration against the data and draws fresh parameters.
    pub fn new(config: TrainConfig, x: ArrayView2<'d, f64>, y: ArrayView2<'d, f64>) -> Result<Self> {
        config.validate()?;
        check_data(&config.layer_sizes, &x, &y)?;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let parameters = Parameters::initialize_with(&config.layer_sizes, config.init_scale, &mut rng)?;
        debug!(
            layer_sizes = ?config.layer_sizes,
            learning_rate = config.learning_rate,
            num_iterations = config.num_iterations,
            examples = x.ncols(),
            "parameters initialized"
        );
        Ok(Self {
            config,
            x,
            y,
            parameters,
            completed: 0,
        })
    }

    /// Continues from existing parameters instead of a random draw.
    /// `layer_sizes` in the configuration is replaced by the parameters' own.
    pub fn resume(
        mut config: TrainConfig,
        x: ArrayView2<'d, f64>,
        y: ArrayView2<'d, f64>,
        parameters: Parameters,
    ) -> Result<Self> {
        config.layer_sizes = parameters.layer_sizes();
        config.validate()?;
        check_data(&config.layer_sizes, &x, &y)?;
        Ok(Self {
            config,
            x,
            y,
            parameters,
            completed: 0,
        })
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn state(&self) -> TrainingState {
        match self.completed {
            0 => TrainingState::Initialized,
            n if n >= self.config.num_iterations => TrainingState::Exhausted,
            completed => TrainingState::Iterating { completed },
        }
    }

    /// One full iteration. Returns the cost measured before the update, or
    /// `None` once all `num_iterations` have run.
    pub fn step(&mut self) -> Result<Option<f64>> {
        if self.state() == TrainingState::Exhausted {
            return Ok(None);
        }
        let (cost, grads) = {
            let cache = forward(self.x, &self.parameters)?;
            let cost = cost(cache.output().view(), self.y)?;
            (cost, backward(cache, self.y)?)
        };
        // backward checked the gradient shapes against these same parameters
        self.parameters.descend(&grads, self.config.learning_rate);

        let iteration = self.completed;
        self.completed += 1;
        if self.config.print_cost && iteration % REPORT_EVERY == 0 {
            info!(iteration, cost, "cost after iteration");
        }
        Ok(Some(cost))
    }

    pub fn run(self) -> Result<Parameters> {
        self.run_with(|_, _| {})
    }

    /// Runs the remaining iterations, handing `(iteration, cost)` to `observe`
    /// every [`REPORT_EVERY`] iterations.
    pub fn run_with<F>(mut self, mut observe: F) -> Result<Parameters>
    where
        F: FnMut(usize, f64),
    {
        let mut last_cost = None;
        while let Some(cost) = self.step()? {
            let iteration = self.completed - 1;
            if iteration % REPORT_EVERY == 0 {
                observe(iteration, cost);
            }
            last_cost = Some(cost);
        }
        debug!(iterations = self.completed, cost = ?last_cost, "training exhausted");
        Ok(self.parameters)
    }

    pub fn into_parameters(self) -> Parameters {
        self.parameters
    }
}

/// Initializes, trains for `config.num_iterations` and returns the learnt
/// parameters.
pub fn train<'d>(
    x: ArrayView2<'d, f64>,
    y: ArrayView2<'d, f64>,
    config: &TrainConfig,
) -> Result<Parameters> {
    Trainer::new(config.clone(), x, y)?.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn logged_training(print_cost: bool) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let (x, y) = dataset::xor();
        let config = TrainConfig::new(vec![2, 3, 1])
            .with_iterations(2500)
            .with_print_cost(print_cost);
        tracing::subscriber::with_default(subscriber, || {
            train(x.view(), y.view(), &config).unwrap();
        });
        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn defaults_follow_the_shallow_network() {
        let config = TrainConfig::default();
        assert_eq!(config.learning_rate, 1.2);
        assert_eq!(config.num_iterations, 10_000);
        assert!(!config.print_cost);
        assert_eq!(config.init_scale, 0.1);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: TrainConfig =
            serde_json::from_str(r#"{"layer_sizes": [2, 4, 1], "print_cost": true}"#).unwrap();
        assert_eq!(config.layer_sizes, vec![2, 4, 1]);
        assert!(config.print_cost);
        assert_eq!(config.num_iterations, DEFAULT_ITERATIONS);
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_bad_values() {
        let ok = TrainConfig::new(vec![2, 4, 1]);
        ok.validate().unwrap();
        assert!(TrainConfig::new(vec![2]).validate().unwrap_err().is_configuration());
        assert!(TrainConfig::new(vec![2, 0, 1]).validate().unwrap_err().is_configuration());
        for lr in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = ok.clone().with_learning_rate(lr).validate().unwrap_err();
            assert!(err.is_configuration());
        }
        assert!(ok.clone().with_iterations(0).validate().unwrap_err().is_configuration());
        assert!(ok.with_init_scale(0.0).validate().unwrap_err().is_configuration());
    }

    #[test]
    fn layer_sizes_come_from_data() {
        let (x, y) = dataset::xor();
        assert_eq!(layer_sizes_for(x.view(), y.view(), &[4]), vec![2, 4, 1]);
        assert_eq!(layer_sizes_for(x.view(), y.view(), &[]), vec![2, 1]);
    }

    #[test]
    fn trainer_rejects_mismatched_data() {
        let (x, y) = dataset::xor();
        let config = TrainConfig::new(vec![3, 4, 1]);
        assert!(Trainer::new(config, x.view(), y.view()).err().unwrap().is_shape());

        let config = TrainConfig::new(vec![2, 4, 2]);
        assert!(Trainer::new(config, x.view(), y.view()).err().unwrap().is_shape());

        let short_y = array![[0.0, 1.0, 1.0]];
        let config = TrainConfig::new(vec![2, 4, 1]);
        assert!(Trainer::new(config, x.view(), short_y.view()).err().unwrap().is_shape());

        let config = TrainConfig::new(vec![2, 4, 1]).with_iterations(0);
        assert!(Trainer::new(config, x.view(), y.view()).err().unwrap().is_configuration());
    }

    #[test]
    fn state_moves_from_initialized_to_exhausted() {
        let (x, y) = dataset::xor();
        let config = TrainConfig::new(vec![2, 3, 1]).with_iterations(3);
        let mut trainer = Trainer::new(config, x.view(), y.view()).unwrap();
        assert_eq!(trainer.state(), TrainingState::Initialized);
        assert!(trainer.step().unwrap().is_some());
        assert_eq!(trainer.state(), TrainingState::Iterating { completed: 1 });
        trainer.step().unwrap();
        trainer.step().unwrap();
        assert_eq!(trainer.state(), TrainingState::Exhausted);
        assert_eq!(trainer.step().unwrap(), None);
        assert_eq!(trainer.completed(), 3);
    }

    #[test]
    fn observer_sees_every_thousandth_iteration() {
        let (x, y) = dataset::xor();
        let config = TrainConfig::new(vec![2, 3, 1]).with_iterations(2500);
        let mut seen = Vec::new();
        Trainer::new(config, x.view(), y.view())
            .unwrap()
            .run_with(|iteration, cost| seen.push((iteration, cost)))
            .unwrap();
        let iterations: Vec<usize> = seen.iter().map(|&(i, _)| i).collect();
        assert_eq!(iterations, vec![0, 1000, 2000]);
        assert!(seen.iter().all(|&(_, c)| c.is_finite()));
    }

    #[test]
    fn print_cost_logs_every_thousandth_iteration() {
        let logs = logged_training(true);
        assert_eq!(logs.matches("cost after iteration").count(), 3, "{}", logs);
        for iteration in ["iteration=0 ", "iteration=1000 ", "iteration=2000 "] {
            assert!(logs.contains(iteration), "{}", logs);
        }
        assert!(logs.contains("cost=0."), "{}", logs);
    }

    #[test]
    fn silent_without_print_cost() {
        let logs = logged_training(false);
        assert!(!logs.contains("cost after iteration"), "{}", logs);
    }

    #[test]
    fn step_applies_exactly_one_gradient_update() {
        let (x, y) = dataset::xor();
        let config = TrainConfig::new(vec![2, 3, 1]).with_iterations(5);
        let mut trainer = Trainer::new(config.clone(), x.view(), y.view()).unwrap();
        let before = trainer.parameters().clone();
        let expected = {
            let cache = forward(x.view(), &before).unwrap();
            let grads = backward(cache, y.view()).unwrap();
            before.clone().update(&grads, config.learning_rate).unwrap()
        };
        trainer.step().unwrap();
        assert_eq!(trainer.parameters(), &expected);
        assert_eq!(trainer.parameters().layer_sizes(), vec![2, 3, 1]);
    }

    #[test]
    fn same_seed_same_result() {
        let (x, y) = dataset::xor();
        let config = TrainConfig::new(vec![2, 4, 1]).with_iterations(50);
        let a = train(x.view(), y.view(), &config).unwrap();
        let b = train(x.view(), y.view(), &config).unwrap();
        assert_eq!(a, b);
        let c = train(x.view(), y.view(), &config.with_seed(1)).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn resume_continues_from_given_parameters() {
        let (x, y) = dataset::xor();
        let config = TrainConfig::new(vec![2, 4, 1]).with_iterations(20);
        let full = train(x.view(), y.view(), &config.clone().with_iterations(40)).unwrap();
        let half = train(x.view(), y.view(), &config).unwrap();
        let resumed = Trainer::resume(config, x.view(), y.view(), half)
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(resumed, full);
    }
}
