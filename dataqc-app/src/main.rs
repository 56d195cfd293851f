//! CLI entry point for DataQC.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dataqc_app::{AppContext, AppError, commands};
use dotenv::dotenv;
use serde::Serialize;
use tracing::{debug, error};

#[derive(Parser, Debug)]
#[command(
    name = "dataqc",
    version,
    about = "Data-quality profiling, model training and prediction for CSV datasets",
    after_help = "ENVIRONMENT VARIABLES:\n  \
                  DATAQC_DATA_DIR       Root directory for uploads, models and history\n  \
                  RUST_LOG              Overrides --log-level\n\n\
                  EXAMPLES:\n  \
                  # Profile an upload and detect its target\n  \
                  dataqc analyze ads.csv\n\n  \
                  # Train on the saved upload\n  \
                  dataqc train data/uploads/1a2b3c4d_ads.csv\n\n  \
                  # Predict with the trained model\n  \
                  dataqc predict 9f8e7d6c new_rows.csv"
)]
struct Args {
    /// Root directory for uploads, models and prediction history
    #[arg(long, env = "DATAQC_DATA_DIR", default_value = "./data", global = true)]
    data_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Save and profile a CSV file, and detect its target column
    Analyze {
        /// CSV file to upload
        file: PathBuf,
    },
    /// Train a model on a previously analyzed upload
    Train {
        /// `saved_path` returned by `analyze`
        saved_path: PathBuf,
    },
    /// Predict every row of a CSV file with a trained model
    Predict {
        model_id: String,
        /// CSV file with the rows to predict
        file: PathBuf,
    },
    /// Show the stored prediction history of a model
    History { model_id: String },
    /// Print the HTML data-quality report of a CSV file
    Report { file: PathBuf },
}

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr so stdout only carries command output.
fn init_logging(level: &str, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_file(path: &Path) -> std::result::Result<Vec<u8>, AppError> {
    std::fs::read(path).map_err(|e| {
        AppError::DatasetRead(format!("Failed to read CSV file: {}: {}", path.display(), e))
    })
}

fn run(args: &Args) -> std::result::Result<Option<serde_json::Value>, AppError> {
    if let Command::Report { file } = &args.command {
        println!("{}", commands::report(file)?);
        return Ok(None);
    }

    let ctx = AppContext::builder().data_dir(args.data_dir.clone()).build()?;

    let value = match &args.command {
        Command::Analyze { file } => {
            let file_name = file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            to_value(&commands::analyze(&ctx, &file_name, &read_file(file)?)?)?
        }
        Command::Train { saved_path } => to_value(&commands::train(&ctx, saved_path)?)?,
        Command::Predict { model_id, file } => {
            to_value(&commands::predict(&ctx, model_id, &read_file(file)?)?)?
        }
        Command::History { model_id } => to_value(&commands::get_history(&ctx, model_id))?,
        Command::Report { .. } => return Ok(None),
    };
    Ok(Some(value))
}

fn to_value(value: &impl Serialize) -> std::result::Result<serde_json::Value, AppError> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(e.to_string()))
}

fn main() -> Result<ExitCode> {
    // Load .env before parsing so DATAQC_DATA_DIR can come from it
    dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level, args.quiet);
    debug!("{:?}", args);

    match run(&args) {
        Ok(Some(value)) => {
            print_json(&value).context("failed to write command output")?;
            Ok(ExitCode::SUCCESS)
        }
        Ok(None) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            error!("[{}] {}", e.error_code(), e);
            print_json(&e.body()).context("failed to write error body")?;
            Ok(ExitCode::FAILURE)
        }
    }
}
