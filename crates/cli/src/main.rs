//! imgclass - classify an image with an ONNX model
//!
//! ```bash
//! imgclass --model resnet.onnx --image cat.png
//! imgclass --model resnet.onnx --image cat.png --labels imagenet.txt --top-k 5 --json
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use classifier::{Classifier, ClassifierConfig, ClassifyError};
use imgclass_cli::{init_logging, load_bitmap, load_labels, Report};
use inference_engine::OnnxEngine;

#[derive(Parser, Debug)]
#[command(name = "imgclass", version, about = "Top-1 image classification with an ONNX model")]
struct Cli {
    /// ONNX model file
    #[arg(long)]
    model: PathBuf,

    /// Image file to classify
    #[arg(long)]
    image: PathBuf,

    /// Classifier config file (TOML, JSON or YAML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Newline-separated class labels
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Also list the K best classes
    #[arg(long, default_value_t = 1)]
    top_k: usize,

    /// Reject images that do not already match the model resolution
    #[arg(long)]
    no_resize: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,

    /// JSON log lines on stderr
    #[arg(long)]
    log_json: bool,
}

fn run(cli: &Cli) -> Result<Report> {
    let config = ClassifierConfig::load(cli.config.as_deref())?;
    let classifier = Classifier::new(config)?;

    let engine = OnnxEngine::load(
        &cli.model,
        classifier.input_spec().clone(),
        classifier.output_spec().clone(),
    )
    .context("failed to load model")?;
    info!("Model loaded from {}", engine.source());

    let labels = match &cli.labels {
        Some(path) => load_labels(path)?,
        None => Vec::new(),
    };

    let cfg = classifier.config();
    let bitmap = load_bitmap(&cli.image, cfg.input_width, cfg.input_height, !cli.no_resize)?;

    let (result, ranked) = classifier.classify_top_k(&engine, &bitmap, cli.top_k)?;
    info!("Classified {} as {}", cli.image.display(), result.class_index);

    Ok(Report::new(&cli.image, &result, &ranked, &labels))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);

    info!("=== imgclass v{} ===", env!("CARGO_PKG_VERSION"));

    match run(&cli) {
        Ok(report) => {
            if cli.json {
                match serde_json::to_string_pretty(&report) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        error!("Failed to serialize report: {}", e);
                        return ExitCode::FAILURE;
                    }
                }
            } else {
                println!("{}", report.to_text());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            let code = e
                .downcast_ref::<ClassifyError>()
                .map(|c| c.code().unsigned_abs() as u8)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}
