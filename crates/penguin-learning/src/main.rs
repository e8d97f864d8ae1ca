//! CLI entry point for the penguin species classifier.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use dotenv::dotenv;
use penguin_learning::config::DEFAULT_DATA_PATH;
use penguin_learning::{LearningError, PipelineConfig, run_eval, run_infer, run_train};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

/// Pipeline step to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Fit the preprocessor and the model, then persist both
    Train,
    /// Score the persisted model on the held-out partition
    Eval,
    /// Predict species for every row of --input
    Infer,
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Penguin species classification pipeline",
    long_about = "Train, evaluate and run a random forest that predicts penguin species \
                  from island, sex and body measurements.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  DATA_PATH    Labeled CSV used by train and eval\n               \
                  (default: data/raw/penguins_cleaned.csv)\n  \
                  RUST_LOG     Overrides --log-level\n\n\
                  EXAMPLES:\n  \
                  penguin --mode train\n  \
                  penguin --mode eval --report-dir reports/metrics\n  \
                  penguin --mode infer --input data/new_penguins.csv"
)]
struct Args {
    /// Pipeline step to run
    #[arg(short, long, value_enum)]
    mode: Mode,

    /// CSV to predict (required for infer)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Labeled CSV for train and eval
    ///
    /// Falls back to $DATA_PATH, then to data/raw/penguins_cleaned.csv
    #[arg(long)]
    data: Option<PathBuf>,

    /// Fitted model artifact
    #[arg(long, default_value = "models/model.json")]
    model_path: PathBuf,

    /// Fitted preprocessor artifact
    #[arg(long, default_value = "models/preprocessor.json")]
    preprocessor_path: PathBuf,

    /// Directory for the classification report and confusion matrix
    #[arg(long, default_value = "reports/metrics")]
    report_dir: PathBuf,

    /// Predictions CSV written by infer
    #[arg(short, long, default_value = "data/processed/inference_output.csv")]
    output: PathBuf,

    /// Fraction of each species held out for validation
    #[arg(long, default_value = "0.2")]
    test_size: f64,

    /// Random seed for the split and the forest
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Number of trees in the forest
    #[arg(long, default_value = "100")]
    n_trees: usize,

    /// Maximum tree depth (unlimited if not set)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Also write the first rows of the loaded data here (train and eval)
    #[arg(long)]
    sample_path: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Only show warnings and errors
    #[arg(short, long)]
    quiet: bool,

    /// Print the run result, or the failure as `{code, message}`, as JSON on stdout
    #[arg(long)]
    json: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// `RUST_LOG` wins over `--log-level`. With `--json` only errors are logged, so
/// stdout carries nothing but the result.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    use tracing_subscriber::EnvFilter;

    let effective_level = if json_output {
        "error"
    } else if quiet {
        "warn"
    } else {
        level
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(args: &Args) -> Result<PipelineConfig, LearningError> {
    let data_path = args
        .data
        .clone()
        .or_else(|| env::var("DATA_PATH").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH));

    let mut builder = PipelineConfig::builder()
        .data_path(data_path)
        .model_path(&args.model_path)
        .preprocessor_path(&args.preprocessor_path)
        .report_dir(&args.report_dir)
        .predictions_path(&args.output)
        .test_size(args.test_size)
        .random_seed(args.seed)
        .n_trees(args.n_trees);

    if let Some(depth) = args.max_depth {
        builder = builder.max_depth(depth);
    }
    if let Some(path) = &args.sample_path {
        builder = builder.sample_path(path);
    }

    Ok(builder.build()?)
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(args: &Args) -> Result<()> {
    let config = build_config(args)?;
    info!("Mode: {:?}", args.mode);

    match args.mode {
        Mode::Train => {
            let outcome = run_train(&config)?;
            if args.json {
                print_json(&outcome)?;
            }
        }
        Mode::Eval => {
            let report = run_eval(&config)?;
            if args.json {
                print_json(&report)?;
            }
        }
        Mode::Infer => {
            let input = args
                .input
                .as_ref()
                .ok_or_else(|| {
                    LearningError::InvalidConfig("--input is required for inference mode".into())
                })?;
            let outcome = run_infer(&config, input)?;
            if args.json {
                print_json(&outcome)?;
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    // Parse command line arguments
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    // Load environment variables from .env file
    dotenv().ok();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Pipeline failed: {e:#}");
            if args.json
                && let Some(err) = e.downcast_ref::<LearningError>()
            {
                print_json(err).ok();
            }
            ExitCode::FAILURE
        }
    }
}
