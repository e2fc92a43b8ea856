//! Segmentation engine properties
//!
//! Synthetic campaign layouts drawn with imageproc, checked against the
//! engine's guarantees: deterministic output, full coverage minus slivers,
//! safe cuts and the whole-image fallback.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use mailslicer::{Band, Interval, SegmentOptions, SegmentReport, Segmenter, TextBox};

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const INK: Rgb<u8> = Rgb([20, 20, 20]);
const PHOTO: Rgb<u8> = Rgb([180, 60, 40]);

/// White canvas with a photo block, a text line and a second photo block
fn layout() -> (RgbImage, Vec<TextBox>) {
    let mut image = RgbImage::from_pixel(120, 300, WHITE);
    draw_filled_rect_mut(&mut image, Rect::at(0, 20).of_size(120, 80), PHOTO);
    // Text glyph stripe
    draw_filled_rect_mut(&mut image, Rect::at(10, 140).of_size(100, 16), INK);
    draw_filled_rect_mut(&mut image, Rect::at(0, 200).of_size(120, 80), PHOTO);

    let boxes = vec![TextBox::new(10, 140, 110, 156, "Compre 2 leve 3")];
    (image, boxes)
}

fn analyze(image: &RgbImage, boxes: &[TextBox]) -> SegmentReport {
    Segmenter::default().analyze(image, boxes).unwrap()
}

fn band_span(band: &Band, interval: &Interval) -> (u32, u32) {
    match band {
        Band::Image { y0, y1 } => (*y0, *y1),
        Band::Text { .. } => (interval.y0, interval.y1),
    }
}

#[test]
fn test_layout_bands() {
    let (image, boxes) = layout();
    let report = analyze(&image, &boxes);

    let kinds: Vec<bool> = report.bands.iter().map(Band::is_text).collect();
    assert!(kinds.contains(&true), "text line should become a text band");
    assert_eq!(
        report
            .bands
            .iter()
            .filter_map(|b| match b {
                Band::Text { text } => Some(text.as_str()),
                Band::Image { .. } => None,
            })
            .collect::<Vec<_>>(),
        vec!["Compre 2 leve 3"]
    );
}

#[test]
fn test_deterministic() {
    let (image, boxes) = layout();
    let first = analyze(&image, &boxes);
    for _ in 0..3 {
        assert_eq!(analyze(&image, &boxes), first);
    }
}

#[test]
fn test_coverage_minus_slivers() {
    let (image, boxes) = layout();
    let report = analyze(&image, &boxes);

    let mut spans: Vec<(u32, u32)> = report
        .intervals
        .iter()
        .chain(report.slivers.iter())
        .map(|iv| (iv.y0, iv.y1))
        .collect();
    spans.sort_unstable();

    assert_eq!(spans.first().map(|s| s.0), Some(0));
    assert_eq!(spans.last().map(|s| s.1), Some(image.height()));
    for pair in spans.windows(2) {
        assert_eq!(pair[0].1, pair[1].0, "intervals must tile without gaps");
    }

    assert_eq!(report.bands.len(), report.intervals.len());
    for (band, interval) in report.bands.iter().zip(&report.intervals) {
        let (y0, y1) = band_span(band, interval);
        assert!(y0 < y1);
        assert!(y1 - y0 >= SegmentOptions::default().min_band_height);
    }
}

#[test]
fn test_cuts_are_safe() {
    let (image, boxes) = layout();
    let report = analyze(&image, &boxes);
    let margin = i64::from(SegmentOptions::default().safety_margin);

    for &cut in &report.cuts {
        for b in &boxes {
            let y = i64::from(cut);
            assert!(
                y < i64::from(b.y0) - margin || y > i64::from(b.y1) + margin,
                "cut {} too close to box {:?}",
                cut,
                b
            );
        }
    }
}

#[test]
fn test_bands_ordered_top_to_bottom() {
    let (image, boxes) = layout();
    let report = analyze(&image, &boxes);
    for pair in report.intervals.windows(2) {
        assert!(pair[0].y1 <= pair[1].y0);
    }
}

#[test]
fn test_without_text_every_band_is_image() {
    let (image, _) = layout();
    let report = analyze(&image, &[]);
    assert!(!report.bands.is_empty());
    assert!(report.bands.iter().all(Band::is_image));
}

#[test]
fn test_all_white_image() {
    let image = RgbImage::from_pixel(50, 200, WHITE);
    let report = analyze(&image, &[]);

    // One run of candidate rows [8, 192) collapses to a single cut
    assert_eq!(report.candidate_rows, 184);
    assert_eq!(report.cuts, vec![100]);
    assert_eq!(
        report.bands,
        vec![Band::Image { y0: 0, y1: 100 }, Band::Image { y0: 100, y1: 200 }]
    );
}

#[test]
fn test_all_dark_image_is_one_band() {
    let image = RgbImage::from_pixel(50, 200, INK);
    let report = analyze(&image, &[]);
    assert!(report.cuts.is_empty());
    assert_eq!(report.bands, vec![Band::Image { y0: 0, y1: 200 }]);
}

#[test]
fn test_blank_text_falls_back_to_image() {
    let (image, _) = layout();
    let boxes = vec![TextBox::new(10, 140, 110, 156, " \t ")];
    let report = analyze(&image, &boxes);

    // The box still protects its rows from cuts
    assert!(report.cuts.iter().all(|&c| !(134..=162).contains(&c)));
    assert!(report.bands.iter().all(Band::is_image));
}

#[test]
fn test_custom_thresholds_change_cuts() {
    // Light gray gap (luminance 230) is not blank by default
    let image = RgbImage::from_fn(40, 100, |_, y| {
        if (42..59).contains(&y) {
            Rgb([230, 230, 230])
        } else {
            INK
        }
    });

    assert!(analyze(&image, &[]).cuts.is_empty());

    let options = SegmentOptions::builder().brightness_threshold(220.0).build();
    let report = Segmenter::new(options).analyze(&image, &[]).unwrap();
    assert_eq!(report.cuts, vec![50]);
}

#[test]
fn test_report_serializes_bands_with_kind() {
    let image = RgbImage::from_pixel(50, 200, WHITE);
    let report = analyze(&image, &[]);
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["bands"][0]["kind"], "image");
    assert_eq!(json["bands"][0]["y1"], 100);
    assert_eq!(json["cuts"][0], 100);
}
