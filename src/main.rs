use std::path::{Path, PathBuf};
use anyhow::Context;
use clap::{Parser, Subcommand};
use ndarray::{Ix3, Ix4};
use tracing::info;

use starport::compat::allow_duplicate_omp_runtimes;
use starport::config::Settings;
use starport::display;
use starport::geom::golden_spiral;
use starport::model::StarDist3D;
use starport::npy::read_npy;
use starport::predict::{candidates_from_tensors, Prediction, PredictOptions};
use starport::zoo::Zoo;

/// Ports pretrained StarDist 3D models into TensorFlow-loadable archives
#[derive(Parser)]
#[command(name = "starport", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Export a pretrained model as a TensorFlow archive
    Export {
        /// Pretrained model to export (defaults to the configured model)
        #[arg(long)]
        model: Option<String>,
        /// Destination archive (defaults to the configured path)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Fetch a pretrained model into the zoo cache
    Fetch {
        /// Name of the pretrained model
        model: String,
    },
    /// List the cached pretrained models
    List,
    /// Show the details of a cached pretrained model
    Info {
        /// Name of the pretrained model
        model: String,
    },
    /// Extract shape candidates from network-output dumps
    Predict {
        /// NPY file with the object probability field (z, y, x)
        #[arg(long)]
        prob: PathBuf,
        /// NPY file with the per-ray distance field (z, y, x, ray)
        #[arg(long)]
        dist: PathBuf,
        /// Probability threshold (defaults to 0.5)
        #[arg(long)]
        threshold: Option<f32>,
        /// Fit and print an ellipsoid per candidate
        #[arg(long)]
        ellipsoids: bool,
    },
}

/// Main entry point for the starport tool
///
/// Sets the duplicate-OpenMP-runtime flag before anything else, then runs
/// the requested command. With no command the original conversion sequence
/// runs: load the configured pretrained model, run one no-input prediction
/// to materialize the ray table, export the archive.
///
/// # Errors
/// Returns an error if settings cannot be loaded or any model, cache or
/// filesystem operation fails; the error aborts the process with a
/// non-zero exit code.
fn main() -> anyhow::Result<()> {
    // Must happen before anything touches the native runtimes
    allow_duplicate_omp_runtimes();

    let cli = Cli::parse();

    // Load settings first
    let settings = Settings::new().context("Failed to load configuration")?;

    // Initialize the subscriber first, before any file operations
    let file_appender = tracing_appender::rolling::RollingFileAppender::new(
        tracing_appender::rolling::Rotation::DAILY,
        // Use log file path from settings, or default to "logs"
        settings.logging.file.as_deref().unwrap_or_else(|| Path::new("logs")),
        "starport",
    );

    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        // Disable ANSI colors for cleaner log files
        .with_ansi(false)
        .with_line_number(true)
        .with_file(true)
        .with_target(false)
        .with_max_level(log_level(&settings.logging.level))
        .init();

    info!("starport starting up...");

    match cli.command {
        None => convert(&settings, None, None),
        Some(Command::Export { model, output }) => convert(&settings, model, output),
        Some(Command::Fetch { model }) => fetch(&settings, &model),
        Some(Command::List) => list(&settings),
        Some(Command::Info { model }) => info_command(&settings, &model),
        Some(Command::Predict { prob, dist, threshold, ellipsoids }) => {
            predict(&settings, &prob, &dist, threshold, ellipsoids)
        }
    }
}

/// The original conversion sequence: load, dummy-predict, export.
fn convert(
    settings: &Settings,
    model: Option<String>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let name = model.unwrap_or_else(|| settings.export.model.clone());
    let dest = output.unwrap_or_else(|| settings.export.path.clone());

    let model = StarDist3D::from_pretrained(&name, settings)
        .map_err(anyhow::Error::from_boxed)
        .with_context(|| format!("Failed to load pretrained model '{}'", name))?;

    // A no-input prediction forces the lazily-built ray table
    model
        .predict_instances(None)
        .map_err(anyhow::Error::from_boxed)
        .context("Dummy prediction failed")?;

    let report = model
        .export_tf(&dest)
        .map_err(anyhow::Error::from_boxed)
        .with_context(|| format!("Failed to export to {}", dest.display()))?;

    println!(
        "Exported '{}' to {} ({} bytes)",
        name,
        report.path.display(),
        report.bytes
    );
    Ok(())
}

/// Fetches a pretrained model into the zoo cache.
fn fetch(settings: &Settings, name: &str) -> anyhow::Result<()> {
    let mut zoo = zoo_from(settings);
    let bundle_dir = zoo
        .fetch(name)
        .map_err(anyhow::Error::from_boxed)
        .with_context(|| format!("Failed to fetch '{}'", name))?;
    println!("Fetched '{}' into {}", name, bundle_dir.display());
    Ok(())
}

/// Lists the cached pretrained models.
fn list(settings: &Settings) -> anyhow::Result<()> {
    let mut zoo = zoo_from(settings);
    zoo.scan()
        .map_err(anyhow::Error::from_boxed)
        .context("Failed to scan the zoo cache")?;
    display::display_models_table(&zoo.entries());
    Ok(())
}

/// Shows the details of a cached pretrained model.
fn info_command(settings: &Settings, name: &str) -> anyhow::Result<()> {
    let mut zoo = zoo_from(settings);
    zoo.scan()
        .map_err(anyhow::Error::from_boxed)
        .context("Failed to scan the zoo cache")?;
    let entry = zoo
        .find(name)
        .map_err(anyhow::Error::from_boxed)
        .with_context(|| format!("Model '{}' is not cached", name))?;
    display::display_model_info(&entry);
    Ok(())
}

/// Extracts shape candidates from network-output dumps.
fn predict(
    settings: &Settings,
    prob_path: &Path,
    dist_path: &Path,
    threshold: Option<f32>,
    ellipsoids: bool,
) -> anyhow::Result<()> {
    let prob = read_npy(prob_path)
        .with_context(|| format!("Failed to read {}", prob_path.display()))?
        .into_dimensionality::<Ix3>()
        .context("Probability field must have 3 dimensions (z, y, x)")?;
    let dist = read_npy(dist_path)
        .with_context(|| format!("Failed to read {}", dist_path.display()))?
        .into_dimensionality::<Ix4>()
        .context("Distance field must have 4 dimensions (z, y, x, ray)")?;

    // The ray count is the last distance dimension
    let n_rays = dist.dim().3;
    let rays = golden_spiral(n_rays).map_err(anyhow::Error::from)?;

    let options = PredictOptions {
        threshold: threshold.unwrap_or(0.5),
        border: settings.predict.border,
        grid: [1, 1, 1],
    };
    let candidates = candidates_from_tensors(&rays, prob.view(), dist.view(), &options)
        .map_err(anyhow::Error::from_boxed)
        .context("Candidate extraction failed")?;

    let (z, y, x) = prob.dim();
    let prediction = Prediction {
        shape: [z, y, x],
        threshold: options.threshold,
        candidates,
    };
    display::display_prediction_summary(&prediction, ellipsoids);
    Ok(())
}

/// Builds a zoo over the configured cache directory
fn zoo_from(settings: &Settings) -> Zoo {
    Zoo::new(
        settings.zoo.directory.clone(),
        settings.zoo.base_url.clone(),
    )
}

/// Maps the configured logging level onto a tracing level
fn log_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "error" => tracing::Level::ERROR,
        "warn" => tracing::Level::WARN,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => tracing::Level::INFO,
    }
}
