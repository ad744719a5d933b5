//! Image Classification CLI
//!
//! Host-side glue around the classifier: logging setup, image decoding and
//! resizing, label lookup, and report formatting.

use std::path::Path;

use anyhow::{Context, Result};
use bitmap_source::Bitmap;
use classifier::Classification;
use image::imageops::FilterType;
use serde::Serialize;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

/// Install the global tracing subscriber
pub fn init_logging(verbose: bool, json: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    let installed = if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };

    if installed.is_err() {
        eprintln!("tracing subscriber already installed");
    }
}

/// Decode an image file into an RGBA bitmap.
///
/// With `resize`, images are scaled to `width` x `height` first; otherwise the
/// original geometry is kept and the classifier will reject a mismatch.
pub fn load_bitmap(path: &Path, width: u32, height: u32, resize: bool) -> Result<Bitmap> {
    let img = image::open(path)
        .with_context(|| format!("failed to decode image {}", path.display()))?
        .to_rgba8();
    debug!("Loaded {} ({}x{})", path.display(), img.width(), img.height());

    let img = if resize && img.dimensions() != (width, height) {
        image::imageops::resize(&img, width, height, FilterType::Triangle)
    } else {
        img
    };

    Ok(Bitmap::from_rgba_image(img))
}

/// Read newline-separated class labels, one per class index
pub fn load_labels(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read labels {}", path.display()))?;
    Ok(text.lines().map(|l| l.trim().to_string()).collect())
}

/// One ranked class in a report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedClass {
    pub index: usize,
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Classification report printed by the binary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub image: String,
    pub class_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub score: f32,
    pub inference_ms: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub top: Vec<RankedClass>,
}

impl Report {
    /// Build a report; `ranked` is listed only when it holds more than one class
    pub fn new(image: &Path, result: &Classification, ranked: &[(usize, f32)], labels: &[String]) -> Self {
        let label_of = |i: usize| labels.get(i).cloned();
        let top = if ranked.len() > 1 {
            ranked
                .iter()
                .map(|&(index, score)| RankedClass {
                    index,
                    score,
                    label: label_of(index),
                })
                .collect()
        } else {
            Vec::new()
        };

        Self {
            image: image.display().to_string(),
            class_index: result.class_index,
            label: label_of(result.class_index),
            score: result.score,
            inference_ms: result.inference_time.as_secs_f64() * 1000.0,
            top,
        }
    }

    /// Human-readable rendering
    pub fn to_text(&self) -> String {
        let mut out = format!(
            "{}: class {}{} (score {:.4}, {:.2} ms)",
            self.image,
            self.class_index,
            self.label
                .as_deref()
                .map(|l| format!(" \"{}\"", l))
                .unwrap_or_default(),
            self.score,
            self.inference_ms
        );
        for (rank, class) in self.top.iter().enumerate() {
            out.push_str(&format!(
                "\n  {}. {} {:.4}{}",
                rank + 1,
                class.index,
                class.score,
                class.label.as_deref().map(|l| format!(" {}", l)).unwrap_or_default()
            ));
        }
        out
    }
}
