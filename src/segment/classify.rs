//! Band classification
//!
//! Decides whether each interval becomes a text band or an image band.
//!
//! Two different membership rules are involved and they must stay different:
//!
//! 1. An interval is a text *candidate* when any box's vertical midpoint lies
//!    in `[y0, y1]` (both ends inclusive).
//! 2. The band's text is gathered only from boxes whose vertical extent is
//!    fully nested in the interval.
//!
//! A candidate whose gathered text is empty (its only box overhangs the
//! interval) falls back to an image band.

use super::types::{Band, Interval, TextBox};

/// Interval classifier
pub struct BandClassifier;

impl BandClassifier {
    /// Classify every interval, preserving order
    pub fn classify_all(intervals: &[Interval], boxes: &[TextBox]) -> Vec<Band> {
        intervals
            .iter()
            .map(|interval| Self::classify(interval, boxes))
            .collect()
    }

    /// Classify a single interval
    pub fn classify(interval: &Interval, boxes: &[TextBox]) -> Band {
        if Self::has_text(interval, boxes) {
            let text = Self::nested_text(interval, boxes);
            if !text.is_empty() {
                return Band::Text { text };
            }
        }

        Band::Image {
            y0: interval.y0,
            y1: interval.y1,
        }
    }

    /// Midpoint membership test
    pub fn has_text(interval: &Interval, boxes: &[TextBox]) -> bool {
        let (lo, hi) = (f64::from(interval.y0), f64::from(interval.y1));
        boxes.iter().any(|b| {
            let mid = b.vertical_midpoint();
            mid >= lo && mid <= hi
        })
    }

    /// Space-joined, whitespace-collapsed text of fully nested boxes, in detection order
    pub fn nested_text(interval: &Interval, boxes: &[TextBox]) -> String {
        let joined = boxes
            .iter()
            .filter(|b| b.is_nested_in(interval))
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        joined.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_boxes_is_image() {
        let band = BandClassifier::classify(&Interval::new(0, 30), &[]);
        assert_eq!(band, Band::Image { y0: 0, y1: 30 });
    }

    #[test]
    fn test_contained_box_is_text() {
        let boxes = vec![TextBox::new(0, 40, 100, 60, "Hello")];
        let band = BandClassifier::classify(&Interval::new(0, 100), &boxes);
        assert_eq!(
            band,
            Band::Text {
                text: "Hello".to_string()
            }
        );
    }

    #[test]
    fn test_midpoint_inside_but_box_overhangs_falls_back_to_image() {
        // Midpoint 45 is inside [30, 50] but the box leaves the interval at 60
        let boxes = vec![TextBox::new(0, 30, 100, 60, "Overhang")];
        let interval = Interval::new(30, 50);

        assert!(BandClassifier::has_text(&interval, &boxes));
        assert_eq!(BandClassifier::nested_text(&interval, &boxes), "");
        assert_eq!(
            BandClassifier::classify(&interval, &boxes),
            Band::Image { y0: 30, y1: 50 }
        );
    }

    #[test]
    fn test_all_nested_boxes_joined() {
        let boxes = vec![
            TextBox::new(0, 10, 100, 20, "Primeira"),
            TextBox::new(0, 22, 100, 28, "Segunda"),
        ];
        let band = BandClassifier::classify(&Interval::new(0, 30), &boxes);
        assert_eq!(
            band,
            Band::Text {
                text: "Primeira Segunda".to_string()
            }
        );
    }

    #[test]
    fn test_midpoint_bounds_inclusive() {
        let boxes = vec![TextBox::new(0, 20, 100, 40, "edge")];
        // Midpoint 30 equals y1 of the first interval and y0 of the second
        assert!(BandClassifier::has_text(&Interval::new(0, 30), &boxes));
        assert!(BandClassifier::has_text(&Interval::new(30, 60), &boxes));
        assert!(!BandClassifier::has_text(&Interval::new(31, 60), &boxes));
    }

    #[test]
    fn test_text_is_collapsed_and_ordered() {
        let boxes = vec![
            TextBox::new(0, 50, 100, 60, "  segundo\n bloco "),
            TextBox::new(0, 10, 100, 20, "primeiro\tbloco"),
        ];
        let text = BandClassifier::nested_text(&Interval::new(0, 100), &boxes);
        assert_eq!(text, "segundo bloco primeiro bloco");
    }

    #[test]
    fn test_classify_all_preserves_order() {
        let boxes = vec![TextBox::new(0, 40, 100, 50, "Texto")];
        let bands = BandClassifier::classify_all(
            &[Interval::new(0, 30), Interval::new(30, 100)],
            &boxes,
        );
        assert_eq!(bands.len(), 2);
        assert!(bands[0].is_image());
        assert!(bands[1].is_text());
    }
}
