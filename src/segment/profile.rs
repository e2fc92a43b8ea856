//! Luminance profiling
//!
//! Reduces an RGB image to one mean and one range value per row, using the
//! ITU-R BT.709 luma weights. Rows are independent and processed in parallel.

use image::RgbImage;
use rayon::prelude::*;

use super::types::{RowProfile, RowStats};

/// BT.709 red weight
const LUMA_R: f64 = 0.2126;

/// BT.709 green weight
const LUMA_G: f64 = 0.7152;

/// BT.709 blue weight
const LUMA_B: f64 = 0.0722;

/// Perceptual luminance of one pixel (0-255)
#[inline]
pub fn luminance(r: u8, g: u8, b: u8) -> f64 {
    LUMA_R * f64::from(r) + LUMA_G * f64::from(g) + LUMA_B * f64::from(b)
}

/// Row luminance profiler
pub struct LuminanceProfiler;

impl LuminanceProfiler {
    /// Compute the row profile of an image
    pub fn profile(image: &RgbImage) -> RowProfile {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return RowProfile::default();
        }

        let stride = width as usize * 3;
        let pixels = &image.as_raw()[..stride * height as usize];

        let rows = pixels.par_chunks_exact(stride).map(Self::row_stats).collect();

        RowProfile::from_rows(rows)
    }

    /// Mean and range of luminance over one packed RGB row
    fn row_stats(row: &[u8]) -> RowStats {
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for px in row.chunks_exact(3) {
            let lum = luminance(px[0], px[1], px[2]);
            sum += lum;
            min = min.min(lum);
            max = max.max(lum);
        }

        let count = (row.len() / 3).max(1) as f64;
        RowStats {
            mean: sum / count,
            range: max - min,
        }
    }
}
