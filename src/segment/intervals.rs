//! Interval construction from sanitized cuts

use super::types::Interval;

/// Builds contiguous vertical bands between cuts
pub struct IntervalBuilder;

impl IntervalBuilder {
    /// Build intervals from `[0, cuts.., height]`.
    ///
    /// Returns `(intervals, slivers)`. Spans shorter than `min_band_height` go
    /// to `slivers` and are not merged into a neighbor.
    pub fn build(cuts: &[u32], height: u32, min_band_height: u32) -> (Vec<Interval>, Vec<Interval>) {
        let boundaries: Vec<u32> = std::iter::once(0)
            .chain(cuts.iter().copied())
            .chain(std::iter::once(height))
            .collect();

        let mut intervals = Vec::new();
        let mut slivers = Vec::new();

        for pair in boundaries.windows(2) {
            let (y0, y1) = (pair[0], pair[1]);
            if y1 <= y0 {
                continue;
            }

            let interval = Interval::new(y0, y1);
            if interval.height() >= min_band_height {
                intervals.push(interval);
            } else {
                slivers.push(interval);
            }
        }

        (intervals, slivers)
    }
}
