//! Segmentation engine
//!
//! Splits a campaign graphic into alternating picture and text bands.
//!
//! # Algorithm
//!
//! 1. Profile every row's BT.709 luminance (mean and range)
//! 2. Slide a window over the row means and flag bright, flat neighborhoods
//! 3. Collapse each run of flagged rows into one cut at its floor-midpoint
//! 4. Drop cuts that fall within a safety margin of any text box
//! 5. Turn `[0, cuts.., height]` into intervals, dropping thin slivers
//! 6. Classify each interval as a text band or an image band
//!
//! The engine is pure: no I/O, no global state. Thresholds live in
//! [`SegmentOptions`] and are passed to every call.
//!
//! # Example
//!
//! ```rust,no_run
//! use mailslicer::{SegmentOptions, Segmenter, TextBox};
//!
//! let image = image::open("campaign.png").unwrap().to_rgb8();
//! let boxes = vec![TextBox::new(0, 40, 700, 60, "Oferta de inverno")];
//!
//! let segmenter = Segmenter::new(SegmentOptions::default());
//! let bands = segmenter.segment(&image, &boxes).unwrap();
//! println!("{} bands", bands.len());
//! ```

mod classify;
mod gaps;
mod intervals;
mod profile;
mod sanitize;
mod types;

use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use classify::BandClassifier;
pub use gaps::GapDetector;
pub use intervals::IntervalBuilder;
pub use profile::{luminance, LuminanceProfiler};
pub use sanitize::CutSanitizer;
pub use types::{
    Band, Interval, Result, RowProfile, RowStats, SegmentError, SegmentReport, TextBox,
};

// ============================================================
// Constants
// ============================================================

/// Default sliding half-window in rows
const DEFAULT_HALF_WINDOW: u32 = 8;

/// Default mean luminance a neighborhood must exceed (0-255)
const DEFAULT_BRIGHTNESS_THRESHOLD: f64 = 235.0;

/// Default max-min spread of row means a neighborhood must stay below
const DEFAULT_FLATNESS_THRESHOLD: f64 = 8.0;

/// Default rows kept clear around each text box
const DEFAULT_SAFETY_MARGIN: u32 = 6;

/// Default minimum interval height in rows
const DEFAULT_MIN_BAND_HEIGHT: u32 = 12;

/// Upper clamp for luminance thresholds
const MAX_LUMINANCE: f64 = 255.0;

// ============================================================
// Options
// ============================================================

/// Segmentation thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentOptions {
    /// Sliding half-window size in rows
    pub half_window: u32,
    /// Mean luminance a neighborhood must exceed to count as blank
    pub brightness_threshold: f64,
    /// Spread of row means a neighborhood must stay below to count as blank
    pub flatness_threshold: f64,
    /// Rows kept clear above and below every text box
    pub safety_margin: u32,
    /// Minimum height of an emitted interval
    pub min_band_height: u32,
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self {
            half_window: DEFAULT_HALF_WINDOW,
            brightness_threshold: DEFAULT_BRIGHTNESS_THRESHOLD,
            flatness_threshold: DEFAULT_FLATNESS_THRESHOLD,
            safety_margin: DEFAULT_SAFETY_MARGIN,
            min_band_height: DEFAULT_MIN_BAND_HEIGHT,
        }
    }
}

impl SegmentOptions {
    /// Create a new options builder
    pub fn builder() -> SegmentOptionsBuilder {
        SegmentOptionsBuilder::default()
    }
}

/// Builder for SegmentOptions
#[derive(Debug, Default)]
pub struct SegmentOptionsBuilder {
    options: SegmentOptions,
}

impl SegmentOptionsBuilder {
    /// Set sliding half-window size
    #[must_use]
    pub fn half_window(mut self, rows: u32) -> Self {
        self.options.half_window = rows;
        self
    }

    /// Set brightness threshold (0-255)
    #[must_use]
    pub fn brightness_threshold(mut self, threshold: f64) -> Self {
        self.options.brightness_threshold = threshold.clamp(0.0, MAX_LUMINANCE);
        self
    }

    /// Set flatness threshold (0-255)
    #[must_use]
    pub fn flatness_threshold(mut self, threshold: f64) -> Self {
        self.options.flatness_threshold = threshold.clamp(0.0, MAX_LUMINANCE);
        self
    }

    /// Set safety margin around text boxes
    #[must_use]
    pub fn safety_margin(mut self, rows: u32) -> Self {
        self.options.safety_margin = rows;
        self
    }

    /// Set minimum band height
    #[must_use]
    pub fn min_band_height(mut self, rows: u32) -> Self {
        self.options.min_band_height = rows;
        self
    }

    /// Build the options
    #[must_use]
    pub fn build(self) -> SegmentOptions {
        self.options
    }
}

// ============================================================
// Segmenter
// ============================================================

/// Entry point of the segmentation engine
#[derive(Debug, Clone, Default)]
pub struct Segmenter {
    options: SegmentOptions,
}

impl Segmenter {
    /// Create a segmenter with the given options
    pub fn new(options: SegmentOptions) -> Self {
        Self { options }
    }

    /// Get the options
    pub fn options(&self) -> &SegmentOptions {
        &self.options
    }

    /// Segment an image into ordered bands
    pub fn segment(&self, image: &RgbImage, boxes: &[TextBox]) -> Result<Vec<Band>> {
        Ok(self.analyze(image, boxes)?.bands)
    }

    /// Segment a packed RGB8 buffer (3 bytes per pixel, row-major)
    pub fn segment_raw(
        &self,
        width: u32,
        height: u32,
        pixels: Vec<u8>,
        boxes: &[TextBox],
    ) -> Result<Vec<Band>> {
        let image = Self::image_from_raw(width, height, pixels)?;
        self.segment(&image, boxes)
    }

    /// Wrap a packed RGB8 buffer, rejecting size mismatches
    pub fn image_from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Result<RgbImage> {
        if width == 0 || height == 0 {
            return Err(SegmentError::InvalidImage(format!(
                "empty image {}x{}",
                width, height
            )));
        }

        let expected = width as usize * height as usize * 3;
        if pixels.len() != expected {
            return Err(SegmentError::InvalidImage(format!(
                "expected {} bytes for {}x{} RGB, got {}",
                expected,
                width,
                height,
                pixels.len()
            )));
        }

        RgbImage::from_raw(width, height, pixels)
            .ok_or_else(|| SegmentError::InvalidImage("pixel buffer too small".to_string()))
    }

    /// Segment an image and keep every intermediate decision
    pub fn analyze(&self, image: &RgbImage, boxes: &[TextBox]) -> Result<SegmentReport> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(SegmentError::InvalidImage(format!(
                "empty image {}x{}",
                width, height
            )));
        }

        let valid_boxes: Vec<TextBox> = boxes
            .iter()
            .filter(|b| b.is_well_formed(width, height))
            .cloned()
            .collect();
        let ignored_boxes = boxes.len() - valid_boxes.len();
        if ignored_boxes > 0 {
            warn!(
                ignored = ignored_boxes,
                "ignoring text boxes with inverted or out-of-range coordinates"
            );
        }

        let profile = LuminanceProfiler::profile(image);
        let candidates = GapDetector::candidates(&profile, &self.options);
        let raw_cuts = GapDetector::collapse_runs(&candidates);

        let (cuts, vetoed_cuts) =
            CutSanitizer::split(&raw_cuts, &valid_boxes, self.options.safety_margin);

        let (intervals, slivers) =
            IntervalBuilder::build(&cuts, height, self.options.min_band_height);

        let bands = if intervals.is_empty() {
            vec![Band::Image { y0: 0, y1: height }]
        } else {
            BandClassifier::classify_all(&intervals, &valid_boxes)
        };

        debug!(
            width,
            height,
            candidates = candidates.len(),
            cuts = cuts.len(),
            vetoed = vetoed_cuts.len(),
            intervals = intervals.len(),
            slivers = slivers.len(),
            text_bands = bands.iter().filter(|b| b.is_text()).count(),
            "segmentation complete"
        );

        Ok(SegmentReport {
            image_size: (width, height),
            candidate_rows: candidates.len(),
            cuts,
            vetoed_cuts,
            intervals,
            slivers,
            ignored_boxes,
            bands,
        })
    }
}
