//! mailslicer - sliced HTML emails from a single campaign graphic
//!
//! Marketing pieces usually arrive as one tall image. Sent as-is, the copy
//! is invisible to spam filters, screen readers and search. This crate cuts
//! the image at its blank gaps, swaps the bands that carry text for real
//! HTML text rows, and keeps the rest as linked image slices.
//!
//! # Modules
//!
//! - [`segment`] - pure segmentation engine (bands from pixels + text boxes)
//! - [`ocr`] - text recognition behind the [`TextOracle`] trait
//! - [`render`] - slices, template injection and the assets archive
//! - [`pipeline`] - end-to-end build with progress reporting
//! - [`config`] - TOML configuration and CLI overrides
//! - `web` - HTTP API (feature `web`)

pub mod cli;
pub mod config;
pub mod ocr;
pub mod pipeline;
pub mod render;
pub mod segment;

#[cfg(feature = "web")]
pub mod web;

pub use cli::{AnalyzeArgs, BuildArgs, Cli, Commands, OcrArgs, SegmentArgs};
#[cfg(feature = "web")]
pub use cli::ServeArgs;
pub use config::{CliOverrides, Config, ConfigError};
pub use ocr::{
    recognize_or_empty, FixedTextOracle, NoTextOracle, OcrError, OcrGranularity, Recognition,
    TesseractOptions, TesseractOracle, TextOracle,
};
pub use pipeline::{
    validate_campaign_name, BuildRequest, BuildResult, EmailPipeline, PipelineConfig,
    PipelineError, ProgressCallback, SilentProgress,
};
pub use render::{
    EmailRenderOptions, EmailRenderer, EmailStyle, RenderArtifacts, RenderError, Renderer,
    TemplateSource,
};
pub use segment::{
    Band, Interval, SegmentError, SegmentOptions, SegmentReport, Segmenter, TextBox,
};
#[cfg(feature = "web")]
pub use web::{ServerConfig, WebServer};

/// Process exit codes
pub mod exit_codes {
    /// Success
    pub const SUCCESS: i32 = 0;
    /// General error
    pub const GENERAL_ERROR: i32 = 1;
    /// Invalid command line arguments
    pub const INVALID_ARGS: i32 = 2;
    /// Input file not found
    pub const INPUT_NOT_FOUND: i32 = 3;
}
