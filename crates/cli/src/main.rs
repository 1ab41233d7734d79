use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;

use eyecrop_core::detection::domain::eye_locator::EyeLocator;
use eyecrop_core::detection::infrastructure::onnx_yolo_detector::{
    OnnxYoloDetector, DEFAULT_CONFIDENCE,
};
use eyecrop_core::imaging::infrastructure::image_file_reader::ImageFileReader;
use eyecrop_core::imaging::infrastructure::image_file_writer::ImageFileWriter;
use eyecrop_core::pipeline::batch_recompose_use_case::BatchRecomposeUseCase;
use eyecrop_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use eyecrop_core::pipeline::recompose_image_use_case::RecomposeImageUseCase;
use eyecrop_core::shared::aspect_ratio::AspectRatio;
use eyecrop_core::shared::constants::FACE_MODEL;
use eyecrop_core::shared::model_resolver;

const BUNDLED_MODELS_DIR: &str = "models";

/// Recompose portraits so the eyes sit on the upper third.
#[derive(Parser, Debug)]
#[command(name = "eyecrop")]
struct Cli {
    /// Input image or directory (scanned recursively).
    #[arg(default_value = "input_pictures")]
    input: PathBuf,

    /// Output directory; the input folder structure is mirrored below it.
    #[arg(default_value = "output_pictures")]
    output: PathBuf,

    /// Target aspect ratio as W:H.
    #[arg(long, default_value = "4:5")]
    aspect: AspectRatio,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
    confidence: f64,

    /// Parallel image workers (default: available CPU cores).
    #[arg(long)]
    workers: Option<usize>,

    /// Draw detection boxes and composition guides on the output.
    #[arg(long)]
    debug: bool,

    /// Use a local ONNX face model instead of the cached/downloaded one.
    #[arg(long)]
    model: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let detector = Arc::new(OnnxYoloDetector::new(&resolve_model(&cli)?, cli.confidence)?);
    let locator = EyeLocator::new(detector.clone(), detector);
    let recompose = RecomposeImageUseCase::new(
        Arc::new(ImageFileReader::new()),
        Arc::new(ImageFileWriter::new()),
        locator,
        cli.aspect,
        cli.debug,
    );

    let workers = cli.workers.unwrap_or_else(default_workers);
    let mut batch = BatchRecomposeUseCase::new(
        Arc::new(recompose),
        workers,
        Box::new(StdoutPipelineLogger::default()),
    );
    let report = batch.execute(&cli.input, &cli.output)?;

    log::info!(
        "Wrote {} image(s) to {}",
        report.processed.len(),
        cli.output.display()
    );
    if !report.failed.is_empty() {
        log::warn!("{} image(s) could not be processed:", report.failed.len());
        for failure in &report.failed {
            log::warn!("  {}: {}", failure.input.display(), failure.error);
        }
    }
    Ok(())
}

fn resolve_model(cli: &Cli) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(path) = &cli.model {
        return Ok(path.clone());
    }
    log::info!("Resolving model: {}", FACE_MODEL.name);
    let bundled = bundled_model_dir();
    let path = model_resolver::resolve(
        FACE_MODEL,
        bundled.as_deref(),
        Some(Box::new(download_progress)),
    )?;
    Ok(path)
}

/// `models/` next to the executable, where packaged builds ship the model.
fn bundled_model_dir() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    Some(exe.parent()?.join(BUNDLED_MODELS_DIR))
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input not found: {}", cli.input.display()).into());
    }
    if !(0.0..=1.0).contains(&cli.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            cli.confidence
        )
        .into());
    }
    if cli.workers == Some(0) {
        return Err("Workers must be at least 1".into());
    }
    if let Some(model) = &cli.model {
        if !model.is_file() {
            return Err(format!("Model file not found: {}", model.display()).into());
        }
    }
    Ok(())
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
        if downloaded >= total {
            eprintln!();
        }
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
}
