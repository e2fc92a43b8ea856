//! Gap detection
//!
//! Finds rows sitting in a uniformly bright neighborhood (blank margins and
//! background between blocks) and collapses each contiguous run of such rows
//! into a single cut.

use super::types::RowProfile;
use super::SegmentOptions;

/// Sliding-window gap detector over a [`RowProfile`]
pub struct GapDetector;

impl GapDetector {
    /// Detect one representative cut per flat run
    pub fn detect(profile: &RowProfile, options: &SegmentOptions) -> Vec<u32> {
        Self::collapse_runs(&Self::candidates(profile, options))
    }

    /// Rows whose `[y - w, y + w]` neighborhood is bright and flat.
    ///
    /// Only the row means take part; the per-row range is not consulted.
    pub fn candidates(profile: &RowProfile, options: &SegmentOptions) -> Vec<u32> {
        let rows = profile.rows();
        let height = rows.len();
        let win = options.half_window as usize;
        let span = (2 * win + 1) as f64;

        let mut candidates = Vec::new();
        for y in win..height.saturating_sub(win) {
            let window = &rows[y - win..=y + win];

            let mut sum = 0.0;
            let mut min = f64::INFINITY;
            let mut max = f64::NEG_INFINITY;
            for row in window {
                sum += row.mean;
                min = min.min(row.mean);
                max = max.max(row.mean);
            }

            let mean = sum / span;
            if mean > options.brightness_threshold && (max - min) < options.flatness_threshold {
                candidates.push(y as u32);
            }
        }

        candidates
    }

    /// Collapse runs of consecutive rows into their floor-midpoint element
    pub fn collapse_runs(candidates: &[u32]) -> Vec<u32> {
        let mut cuts = Vec::new();
        let mut run: Vec<u32> = Vec::new();

        for &y in candidates {
            match run.last() {
                Some(&last) if y == last + 1 => run.push(y),
                Some(_) => {
                    cuts.push(run[run.len() / 2]);
                    run.clear();
                    run.push(y);
                }
                None => run.push(y),
            }
        }
        if !run.is_empty() {
            cuts.push(run[run.len() / 2]);
        }

        cuts
    }
}
