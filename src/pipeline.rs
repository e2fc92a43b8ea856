//! Email build pipeline
//!
//! Wires the collaborators around the segmentation engine:
//!
//! 1. Load and decode the campaign graphic
//! 2. Downscale to the template width (never upscale)
//! 3. Recognize text; failures degrade to "no text"
//! 4. Segment into bands
//! 5. Render HTML, slices and the assets archive

use chrono::Utc;
use image::{imageops::FilterType, RgbImage};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{info, warn};

use crate::ocr::{recognize_or_empty, NoTextOracle, TesseractOptions, TesseractOracle, TextOracle};
use crate::render::{
    draw_overlay, EmailRenderOptions, EmailRenderer, EmailStyle, RenderError, Renderer,
    TemplateSource,
};
use crate::segment::{SegmentError, SegmentOptions, SegmentReport, Segmenter};

/// Default maximum width of the prepared image, matching the template column
pub const DEFAULT_MAX_WIDTH: u32 = 700;

/// Longest accepted campaign name
const MAX_CAMPAIGN_NAME_LEN: usize = 128;

// ============================================================
// Errors
// ============================================================

/// Pipeline error types
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Input image not found: {0}")]
    InputNotFound(PathBuf),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Invalid campaign name: {0:?}")]
    InvalidCampaignName(String),

    #[error("Segmentation failed: {0}")]
    Segment(#[from] SegmentError),

    #[error("Render failure: {0}")]
    RenderFailure(#[from] RenderError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

// ============================================================
// Progress
// ============================================================

/// Progress notifications from the pipeline
pub trait ProgressCallback: Send + Sync {
    /// A step started
    fn on_step_start(&self, step: &str);

    /// Progress inside the current step
    fn on_step_progress(&self, current: usize, total: usize);

    /// A step finished
    fn on_step_complete(&self, step: &str, message: &str);

    /// Diagnostic message
    fn on_debug(&self, message: &str);
}

/// Progress callback that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentProgress;

impl ProgressCallback for SilentProgress {
    fn on_step_start(&self, _step: &str) {}
    fn on_step_progress(&self, _current: usize, _total: usize) {}
    fn on_step_complete(&self, _step: &str, _message: &str) {}
    fn on_debug(&self, _message: &str) {}
}

// ============================================================
// Config, Request, Result
// ============================================================

/// Resolved pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Engine thresholds
    pub segment: SegmentOptions,
    /// Maximum prepared image width (0 = keep original width)
    pub max_width: u32,
    /// Run text recognition
    pub ocr: bool,
    /// Tesseract settings when `ocr` is on
    pub tesseract: TesseractOptions,
    /// Row styling
    pub style: EmailStyle,
    /// Write a debug overlay next to the HTML
    pub save_debug: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            segment: SegmentOptions::default(),
            max_width: DEFAULT_MAX_WIDTH,
            ocr: true,
            tesseract: TesseractOptions::default(),
            style: EmailStyle::default(),
            save_debug: false,
        }
    }
}

impl PipelineConfig {
    /// Serialize for display
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Oracle matching the `ocr` switch
    pub fn oracle(&self) -> Arc<dyn TextOracle> {
        if self.ocr {
            Arc::new(TesseractOracle::new(self.tesseract.clone()))
        } else {
            Arc::new(NoTextOracle)
        }
    }
}

/// One email to build
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub image_path: PathBuf,
    pub template: TemplateSource,
    pub title: String,
    pub snippet: String,
    pub cta_url: String,
    pub campaign: String,
    pub output_html: PathBuf,
}

/// Summary of a finished build
#[derive(Debug, Clone, Serialize)]
pub struct BuildResult {
    pub html_path: PathBuf,
    pub archive_path: PathBuf,
    pub slices: Vec<PathBuf>,
    pub debug_image: Option<PathBuf>,
    pub text_bands: usize,
    pub image_bands: usize,
    pub text_boxes: usize,
    /// OCR failure message when recognition degraded to no text
    pub ocr_degraded: Option<String>,
    pub original_size: (u32, u32),
    pub prepared_size: (u32, u32),
    pub elapsed_seconds: f64,
    pub generated_at: String,
}

/// Check that a campaign name is usable as a file name stem
pub fn validate_campaign_name(name: &str) -> Result<()> {
    let ok = !name.is_empty()
        && name.len() <= MAX_CAMPAIGN_NAME_LEN
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
        && !name.starts_with('.');
    if ok {
        Ok(())
    } else {
        Err(PipelineError::InvalidCampaignName(name.to_string()))
    }
}

// ============================================================
// Pipeline
// ============================================================

/// Campaign graphic to HTML email pipeline
pub struct EmailPipeline {
    config: PipelineConfig,
    oracle: Arc<dyn TextOracle>,
}

impl EmailPipeline {
    /// Create a pipeline with an explicit text oracle
    pub fn new(config: PipelineConfig, oracle: Arc<dyn TextOracle>) -> Self {
        Self { config, oracle }
    }

    /// Create a pipeline whose oracle follows `config.ocr`
    pub fn from_config(config: PipelineConfig) -> Self {
        let oracle = config.oracle();
        Self::new(config, oracle)
    }

    /// Get the configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Name of the active text oracle
    pub fn oracle_name(&self) -> &str {
        self.oracle.name()
    }

    /// Decode an image file to RGB8, sniffing the format from its content
    pub fn load_image(path: &Path) -> Result<RgbImage> {
        if !path.exists() {
            return Err(PipelineError::InputNotFound(path.to_path_buf()));
        }

        let decoded = image::ImageReader::open(path)?
            .with_guessed_format()?
            .decode()
            .map_err(|e| PipelineError::InvalidImage(e.to_string()))?;

        let rgb = decoded.to_rgb8();
        if rgb.width() == 0 || rgb.height() == 0 {
            return Err(PipelineError::InvalidImage(format!(
                "empty image {}x{}",
                rgb.width(),
                rgb.height()
            )));
        }
        Ok(rgb)
    }

    /// Downscale to `max_width` keeping the aspect ratio; never upscale
    pub fn prepare_image(image: RgbImage, max_width: u32) -> RgbImage {
        let (width, height) = image.dimensions();
        if max_width == 0 || width <= max_width {
            return image;
        }

        let scale = f64::from(max_width) / f64::from(width);
        let new_height = ((f64::from(height) * scale).round() as u32).max(1);
        image::imageops::resize(&image, max_width, new_height, FilterType::Lanczos3)
    }

    /// Load, prepare, recognize and segment without rendering
    pub fn analyze(&self, image_path: &Path) -> Result<SegmentReport> {
        let image = Self::prepare_image(Self::load_image(image_path)?, self.config.max_width);
        let recognition = recognize_or_empty(self.oracle.as_ref(), &image);
        let segmenter = Segmenter::new(self.config.segment.clone());
        Ok(segmenter.analyze(&image, &recognition.boxes)?)
    }

    /// Build one email
    pub fn build(
        &self,
        request: &BuildRequest,
        progress: &dyn ProgressCallback,
    ) -> Result<BuildResult> {
        let started = Instant::now();
        validate_campaign_name(&request.campaign)?;

        progress.on_step_start("Loading image");
        let original = Self::load_image(&request.image_path)?;
        let original_size = original.dimensions();
        let image = Self::prepare_image(original, self.config.max_width);
        let prepared_size = image.dimensions();
        progress.on_step_complete(
            "Loading image",
            &format!(
                "{}x{} -> {}x{}",
                original_size.0, original_size.1, prepared_size.0, prepared_size.1
            ),
        );

        progress.on_step_start("Recognizing text");
        let recognition = recognize_or_empty(self.oracle.as_ref(), &image);
        if let Some(reason) = &recognition.degraded {
            progress.on_debug(&format!("OCR degraded: {}", reason));
        }
        progress.on_step_complete(
            "Recognizing text",
            &format!("{} text boxes ({})", recognition.boxes.len(), self.oracle.name()),
        );

        progress.on_step_start("Segmenting");
        let segmenter = Segmenter::new(self.config.segment.clone());
        let report = segmenter.analyze(&image, &recognition.boxes)?;
        progress.on_debug(&format!(
            "cuts={:?} vetoed={:?} slivers={}",
            report.cuts,
            report.vetoed_cuts,
            report.slivers.len()
        ));
        progress.on_step_complete("Segmenting", &format!("{} bands", report.bands.len()));

        progress.on_step_start("Rendering");
        let renderer = EmailRenderer::new(EmailRenderOptions {
            output_html: request.output_html.clone(),
            campaign: request.campaign.clone(),
            title: request.title.clone(),
            snippet: request.snippet.clone(),
            cta_url: request.cta_url.clone(),
            template: request.template.clone(),
            style: self.config.style.clone(),
        });
        let artifacts = renderer.render(&image, &report.bands)?;
        progress.on_step_complete(
            "Rendering",
            &format!(
                "{} image slices, {} text rows",
                artifacts.image_bands, artifacts.text_bands
            ),
        );

        let debug_image = if self.config.save_debug {
            let path = renderer
                .options()
                .output_dir()
                .join(format!("{}-debug.png", request.campaign));
            draw_overlay(&image, &report)
                .save(&path)
                .map_err(RenderError::from)?;
            progress.on_debug(&format!("debug overlay: {}", path.display()));
            Some(path)
        } else {
            None
        };

        if recognition.degraded.is_some() {
            warn!(campaign = %request.campaign, "email built without recognized text");
        }
        info!(
            campaign = %request.campaign,
            bands = report.bands.len(),
            html = %artifacts.html_path.display(),
            "email built"
        );

        Ok(BuildResult {
            html_path: artifacts.html_path,
            archive_path: artifacts.archive_path,
            slices: artifacts.slices,
            debug_image,
            text_bands: artifacts.text_bands,
            image_bands: artifacts.image_bands,
            text_boxes: recognition.boxes.len(),
            ocr_degraded: recognition.degraded,
            original_size,
            prepared_size,
            elapsed_seconds: started.elapsed().as_secs_f64(),
            generated_at: Utc::now().to_rfc3339(),
        })
    }
}
