//! Email rendering module
//!
//! Turns classified bands into artifacts:
//!
//! - image bands become PNG slices cropped from the prepared image
//! - text bands become escaped, styled table rows
//! - the rows are injected into an HTML template
//! - the slices are bundled into a zip archive
//!
//! All failures here are [`RenderError`]s, kept apart from segmentation errors.

mod archive;
mod debug;
mod html;
mod template;

use image::{imageops, ImageFormat, RgbImage};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::segment::Band;

pub use archive::zip_directory;
pub use debug::draw_overlay;
pub use html::{build_content, ContentPart, EmailStyle};
pub use template::{builtin_template, inject, TemplateSource, BUILTIN_TEMPLATE};

// ============================================================
// Error Types
// ============================================================

/// Rendering error types
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Template not found: {0}")]
    TemplateNotFound(PathBuf),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Band rows {y0}..{y1} outside image of height {height}")]
    BandOutOfBounds { y0: u32, y1: u32, height: u32 },

    #[error("Image write failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RenderError>;

// ============================================================
// Renderer
// ============================================================

/// Consumer of classified bands
pub trait Renderer {
    /// Render bands of `image` into artifacts
    fn render(&self, image: &RgbImage, bands: &[Band]) -> Result<RenderArtifacts>;
}

/// Files produced by a render
#[derive(Debug, Clone, Serialize)]
pub struct RenderArtifacts {
    /// Final HTML file
    pub html_path: PathBuf,
    /// Directory holding the image slices
    pub assets_dir: PathBuf,
    /// Zip of the assets directory
    pub archive_path: PathBuf,
    /// Slice files in band order
    pub slices: Vec<PathBuf>,
    /// Number of text rows emitted
    pub text_bands: usize,
    /// Number of image rows emitted
    pub image_bands: usize,
}

/// Per-email render settings
#[derive(Debug, Clone)]
pub struct EmailRenderOptions {
    /// Output HTML path; assets and archive are written next to it
    pub output_html: PathBuf,
    /// Campaign name, used for the assets directory and archive names
    pub campaign: String,
    /// Subject placed in `<title>`
    pub title: String,
    /// Preheader snippet
    pub snippet: String,
    /// Link target of slices and the button
    pub cta_url: String,
    /// Template markup source
    pub template: TemplateSource,
    /// Row styling
    pub style: EmailStyle,
}

impl EmailRenderOptions {
    /// Directory the HTML is written into
    pub fn output_dir(&self) -> PathBuf {
        match self.output_html.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Name of the assets directory, relative to the output directory
    pub fn assets_dir_name(&self) -> String {
        format!("{}-assets", self.campaign)
    }

    /// Path of the assets archive
    pub fn archive_path(&self) -> PathBuf {
        self.output_dir().join(format!("{}-assets.zip", self.campaign))
    }
}

/// Renderer producing a sliced HTML email
pub struct EmailRenderer {
    options: EmailRenderOptions,
}

impl EmailRenderer {
    /// Create a new renderer
    pub fn new(options: EmailRenderOptions) -> Self {
        Self { options }
    }

    /// Get the options
    pub fn options(&self) -> &EmailRenderOptions {
        &self.options
    }

    /// Crop rows `[y0, y1)` over the full width and save as PNG
    fn write_slice(image: &RgbImage, y0: u32, y1: u32, path: &Path) -> Result<()> {
        let height = image.height();
        if y1 <= y0 || y1 > height {
            return Err(RenderError::BandOutOfBounds { y0, y1, height });
        }

        let slice = imageops::crop_imm(image, 0, y0, image.width(), y1 - y0).to_image();
        slice.save_with_format(path, ImageFormat::Png)?;
        Ok(())
    }
}

impl Renderer for EmailRenderer {
    fn render(&self, image: &RgbImage, bands: &[Band]) -> Result<RenderArtifacts> {
        let opts = &self.options;
        let output_dir = opts.output_dir();
        let assets_name = opts.assets_dir_name();
        let assets_dir = output_dir.join(&assets_name);
        // Slices from an earlier build of the campaign would leak into the archive
        if assets_dir.exists() {
            debug!(dir = %assets_dir.display(), "clearing previous assets");
            std::fs::remove_dir_all(&assets_dir)?;
        }
        std::fs::create_dir_all(&assets_dir)?;

        let mut parts = Vec::with_capacity(bands.len());
        let mut slices = Vec::new();
        let mut text_bands = 0;

        for band in bands {
            match band {
                Band::Text { text } => {
                    text_bands += 1;
                    parts.push(ContentPart::Text { text: text.clone() });
                }
                Band::Image { y0, y1 } => {
                    let name = format!("slice_{}_{}.png", y0, y1);
                    let path = assets_dir.join(&name);
                    Self::write_slice(image, *y0, *y1, &path)?;
                    slices.push(path);
                    parts.push(ContentPart::Image {
                        src: format!("{}/{}", assets_name, name),
                    });
                }
            }
        }

        let content = build_content(&parts, &opts.cta_url, &opts.style);
        let template = opts.template.load()?;
        let html = inject(&template, &opts.title, &opts.snippet, &content);

        std::fs::create_dir_all(&output_dir)?;
        std::fs::write(&opts.output_html, html)?;

        let archive_path = opts.archive_path();
        let archived = zip_directory(&assets_dir, &archive_path)?;

        debug!(
            html = %opts.output_html.display(),
            slices = slices.len(),
            text_bands,
            archived,
            "email rendered"
        );

        Ok(RenderArtifacts {
            html_path: opts.output_html.clone(),
            assets_dir,
            archive_path,
            image_bands: slices.len(),
            slices,
            text_bands,
        })
    }
}
