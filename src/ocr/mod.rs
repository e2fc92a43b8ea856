//! Text recognition module
//!
//! The segmentation engine only needs text boxes. This module defines the
//! [`TextOracle`] capability that supplies them, plus a few implementations:
//!
//! - [`NoTextOracle`] - never finds text (OCR disabled)
//! - [`FixedTextOracle`] - returns a fixed list, useful as a stub
//! - [`TesseractOracle`] - runs the `tesseract` CLI and parses its TSV output
//!
//! Recognition failures are not fatal for the pipeline: use
//! [`recognize_or_empty`] to degrade to "no text boxes".

mod tesseract;

use image::RgbImage;
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

use crate::segment::TextBox;

pub use tesseract::{OcrGranularity, TesseractOptions, TesseractOracle};

/// OCR error types
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR tool not found: {0}")]
    ToolNotFound(String),

    #[error("OCR failed: {0}")]
    Failed(String),

    #[error("OCR timed out after {0} seconds")]
    Timeout(u64),

    #[error("Failed to parse OCR output: {0}")]
    Parse(String),

    #[error("Failed to write OCR input {0}: {1}")]
    Input(PathBuf, String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OcrError>;

/// Supplier of recognized text regions for an image
pub trait TextOracle: Send + Sync {
    /// Short name for logs and reports
    fn name(&self) -> &str;

    /// Recognize text regions, in the engine's native detection order.
    ///
    /// Boxes are in pixel coordinates of `image` and carry trimmed, non-empty text.
    fn recognize(&self, image: &RgbImage) -> Result<Vec<TextBox>>;
}

/// Outcome of a recognition attempt that never fails
#[derive(Debug, Clone, Default)]
pub struct Recognition {
    pub boxes: Vec<TextBox>,
    /// Set when the oracle failed and the boxes were replaced by an empty list
    pub degraded: Option<String>,
}

/// Run an oracle, turning any failure into an empty box list
pub fn recognize_or_empty(oracle: &dyn TextOracle, image: &RgbImage) -> Recognition {
    match oracle.recognize(image) {
        Ok(boxes) => Recognition {
            boxes,
            degraded: None,
        },
        Err(e) => {
            warn!(oracle = oracle.name(), error = %e, "text recognition failed, continuing without text");
            Recognition {
                boxes: Vec::new(),
                degraded: Some(e.to_string()),
            }
        }
    }
}

/// Oracle that never finds text
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTextOracle;

impl TextOracle for NoTextOracle {
    fn name(&self) -> &str {
        "none"
    }

    fn recognize(&self, _image: &RgbImage) -> Result<Vec<TextBox>> {
        Ok(Vec::new())
    }
}

/// Oracle returning a fixed list of boxes
#[derive(Debug, Clone, Default)]
pub struct FixedTextOracle {
    boxes: Vec<TextBox>,
}

impl FixedTextOracle {
    pub fn new(boxes: Vec<TextBox>) -> Self {
        Self { boxes }
    }
}

impl TextOracle for FixedTextOracle {
    fn name(&self) -> &str {
        "fixed"
    }

    fn recognize(&self, _image: &RgbImage) -> Result<Vec<TextBox>> {
        Ok(self.boxes.clone())
    }
}
