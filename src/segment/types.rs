//! Common types for the segment module

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================
// Error Types
// ============================================================

/// Segmentation error types
#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("Invalid image: {0}")]
    InvalidImage(String),
}

pub type Result<T> = std::result::Result<T, SegmentError>;

// ============================================================
// Row Profile
// ============================================================

/// Luminance statistics for a single image row
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RowStats {
    /// Mean luminance across the row (0-255)
    pub mean: f64,
    /// max - min luminance across the row
    pub range: f64,
}

/// Per-row luminance profile, indexed by row
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowProfile {
    rows: Vec<RowStats>,
}

impl RowProfile {
    /// Create a profile from precomputed rows
    pub fn from_rows(rows: Vec<RowStats>) -> Self {
        Self { rows }
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the profile has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Get statistics for row `y`
    pub fn get(&self, y: usize) -> Option<&RowStats> {
        self.rows.get(y)
    }

    /// All rows in order
    pub fn rows(&self) -> &[RowStats] {
        &self.rows
    }
}

// ============================================================
// Text Boxes
// ============================================================

/// A recognized text region in image pixel coordinates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBox {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
    /// Recognized text, already trimmed
    pub text: String,
}

impl TextBox {
    /// Create a new text box
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32, text: impl Into<String>) -> Self {
        Self {
            x0,
            y0,
            x1,
            y1,
            text: text.into(),
        }
    }

    /// Vertical midpoint `(y0 + y1) / 2`, kept fractional
    pub fn vertical_midpoint(&self) -> f64 {
        (f64::from(self.y0) + f64::from(self.y1)) / 2.0
    }

    /// Check that the box is non-inverted and lies inside a `width` x `height` image
    pub fn is_well_formed(&self, width: u32, height: u32) -> bool {
        self.x0 >= 0
            && self.y0 >= 0
            && self.x0 <= self.x1
            && self.y0 <= self.y1
            && i64::from(self.x1) <= i64::from(width)
            && i64::from(self.y1) <= i64::from(height)
    }

    /// Check whether this box forbids a cut at row `y` with the given safety margin.
    ///
    /// Inverted boxes veto nothing.
    pub fn vetoes(&self, y: u32, margin: u32) -> bool {
        if self.y0 > self.y1 {
            return false;
        }
        let y = i64::from(y);
        let margin = i64::from(margin);
        y >= i64::from(self.y0) - margin && y <= i64::from(self.y1) + margin
    }

    /// Check whether the box's vertical extent lies fully inside `interval`
    pub fn is_nested_in(&self, interval: &Interval) -> bool {
        i64::from(self.y0) >= i64::from(interval.y0) && i64::from(self.y1) <= i64::from(interval.y1)
    }
}

// ============================================================
// Intervals and Bands
// ============================================================

/// A vertical slice `[y0, y1)` of the image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub y0: u32,
    pub y1: u32,
}

impl Interval {
    /// Create a new interval
    pub fn new(y0: u32, y1: u32) -> Self {
        Self { y0, y1 }
    }

    /// Height in rows
    pub fn height(&self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }

    /// Check if row `y` belongs to the interval
    pub fn contains_row(&self, y: u32) -> bool {
        y >= self.y0 && y < self.y1
    }
}

/// A classified band of the image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Band {
    /// Band re-rendered as HTML copy
    Text { text: String },
    /// Band cropped from the original image, rows `[y0, y1)`
    Image { y0: u32, y1: u32 },
}

impl Band {
    pub fn is_text(&self) -> bool {
        matches!(self, Band::Text { .. })
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Band::Image { .. })
    }
}

/// Segmentation output together with the intermediate decisions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentReport {
    /// Image dimensions (width, height)
    pub image_size: (u32, u32),

    /// Number of rows flagged as cut candidates before collapsing runs
    pub candidate_rows: usize,

    /// Cuts that survived sanitization, ascending
    pub cuts: Vec<u32>,

    /// Cuts removed because a text box straddled them
    pub vetoed_cuts: Vec<u32>,

    /// Emitted intervals, ascending
    pub intervals: Vec<Interval>,

    /// Spans thinner than the minimum band height, dropped from the output
    pub slivers: Vec<Interval>,

    /// Text boxes ignored for inverted or out-of-range coordinates
    pub ignored_boxes: usize,

    /// One band per interval, or a single whole-image band when no interval survived
    pub bands: Vec<Band>,
}
