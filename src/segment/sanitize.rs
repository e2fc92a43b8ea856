//! Cut sanitization against recognized text

use super::types::TextBox;

/// Removes cuts that would sever a text box
pub struct CutSanitizer;

impl CutSanitizer {
    /// Keep only the cuts no text box vetoes
    pub fn sanitize(cuts: &[u32], boxes: &[TextBox], margin: u32) -> Vec<u32> {
        Self::split(cuts, boxes, margin).0
    }

    /// Split cuts into `(kept, vetoed)`, both in input order.
    ///
    /// A box vetoes a cut when the cut lies in `[y0 - margin, y1 + margin]`,
    /// whatever the box's text says.
    pub fn split(cuts: &[u32], boxes: &[TextBox], margin: u32) -> (Vec<u32>, Vec<u32>) {
        cuts.iter()
            .partition(|&&y| !boxes.iter().any(|b| b.vetoes(y, margin)))
    }
}
