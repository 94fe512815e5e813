//! Train a feedforward binary classifier from the command line
//!
//! Usage: cargo run --bin ff-train -- --dataset planar --hidden 4 --print-cost

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use clap::{Parser, ValueEnum};
use ff_classifier::{
    accuracy, dataset, layer_sizes_for, predict, sweep_hidden_sizes, train, TrainConfig,
};
use ndarray::Array2;
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Builtin {
    Xor,
    Planar,
}

#[derive(Parser, Debug)]
#[command(name = "ff-train", about = "Train a feedforward binary classifier by gradient descent")]
struct Args {
    /// JSON training configuration; flags below override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON file with `x` (n_x rows) and `y` (n_y rows), one column per example
    #[arg(long)]
    data: Option<PathBuf>,

    /// Built-in dataset used when no data file is given
    #[arg(long, value_enum, default_value_t = Builtin::Planar)]
    dataset: Builtin,

    /// Example count for the planar dataset
    #[arg(long, default_value_t = 400)]
    samples: usize,

    /// Hidden layer sizes, comma separated
    #[arg(long, value_delimiter = ',')]
    hidden: Option<Vec<usize>>,

    #[arg(long)]
    learning_rate: Option<f64>,

    #[arg(long)]
    iterations: Option<usize>,

    /// Log the cost every 1000 iterations
    #[arg(long)]
    print_cost: bool,

    #[arg(long)]
    seed: Option<u64>,

    /// Write the trained parameters as JSON
    #[arg(long)]
    save: Option<PathBuf>,

    /// Train one shallow network per hidden size instead of a single run
    #[arg(long, value_delimiter = ',')]
    sweep: Vec<usize>,
}

#[derive(Deserialize)]
struct DataFile {
    x: Vec<Vec<f64>>,
    y: Vec<Vec<f64>>,
}

fn rows_to_array(rows: Vec<Vec<f64>>, name: &str) -> Result<Array2<f64>> {
    let n_rows = rows.len();
    let n_cols = rows.first().map_or(0, Vec::len);
    ensure!(
        rows.iter().all(|row| row.len() == n_cols),
        "rows of `{}` have different lengths",
        name
    );
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Ok(Array2::from_shape_vec((n_rows, n_cols), flat)?)
}

fn load_data(path: &Path) -> Result<(Array2<f64>, Array2<f64>)> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let data: DataFile = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok((rows_to_array(data.x, "x")?, rows_to_array(data.y, "y")?))
}

fn load_config(path: &Path) -> Result<TrainConfig> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file)).with_context(|| format!("parsing {}", path.display()))
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => TrainConfig::default(),
    };
    if let Some(learning_rate) = args.learning_rate {
        config.learning_rate = learning_rate;
    }
    if let Some(iterations) = args.iterations {
        config.num_iterations = iterations;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    config.print_cost |= args.print_cost;

    let (x, y) = match &args.data {
        Some(path) => load_data(path)?,
        None => match args.dataset {
            Builtin::Xor => dataset::xor(),
            Builtin::Planar => dataset::planar(args.samples, config.seed),
        },
    };
    info!(features = x.nrows(), examples = x.ncols(), "data loaded");

    if !args.sweep.is_empty() {
        for outcome in sweep_hidden_sizes(x.view(), y.view(), &args.sweep, &config)? {
            println!(
                "Accuracy for {} hidden units: {} %",
                outcome.hidden_size, outcome.accuracy
            );
        }
        return Ok(());
    }

    if let Some(hidden) = &args.hidden {
        config.layer_sizes = layer_sizes_for(x.view(), y.view(), hidden);
    } else if config.layer_sizes.is_empty() {
        config.layer_sizes = layer_sizes_for(x.view(), y.view(), &[4]);
    }

    let parameters = train(x.view(), y.view(), &config)?;
    let predictions = predict(&parameters, x.view())?;
    println!("Accuracy: {:.0}%", accuracy(predictions.view(), y.view())?);

    if let Some(path) = &args.save {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &parameters)?;
        info!(path = %path.display(), "parameters saved");
    }
    Ok(())
}
