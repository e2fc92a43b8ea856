//! Debug overlay of segmentation decisions

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

use crate::segment::{Band, SegmentReport};

const CUT_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const VETOED_COLOR: Rgb<u8> = Rgb([255, 160, 0]);
const TEXT_BAND_COLOR: Rgb<u8> = Rgb([0, 90, 255]);
const IMAGE_BAND_COLOR: Rgb<u8> = Rgb([0, 180, 0]);
const SLIVER_COLOR: Rgb<u8> = Rgb([128, 128, 128]);

/// Draw bands, slivers, kept cuts and vetoed cuts over a copy of the image
pub fn draw_overlay(image: &RgbImage, report: &SegmentReport) -> RgbImage {
    let mut canvas = image.clone();
    let width = canvas.width();
    if width == 0 || canvas.height() == 0 {
        return canvas;
    }

    for (interval, band) in report.intervals.iter().zip(&report.bands) {
        let color = match band {
            Band::Text { .. } => TEXT_BAND_COLOR,
            Band::Image { .. } => IMAGE_BAND_COLOR,
        };
        outline(&mut canvas, interval.y0, interval.height(), color);
    }

    for sliver in &report.slivers {
        outline(&mut canvas, sliver.y0, sliver.height(), SLIVER_COLOR);
    }

    for &y in &report.vetoed_cuts {
        hline(&mut canvas, y, VETOED_COLOR);
    }
    for &y in &report.cuts {
        hline(&mut canvas, y, CUT_COLOR);
    }

    canvas
}

fn outline(canvas: &mut RgbImage, y0: u32, height: u32, color: Rgb<u8>) {
    if height == 0 {
        return;
    }
    let rect = Rect::at(0, y0 as i32).of_size(canvas.width(), height);
    draw_hollow_rect_mut(canvas, rect, color);
}

fn hline(canvas: &mut RgbImage, y: u32, color: Rgb<u8>) {
    let right = canvas.width().saturating_sub(1) as f32;
    draw_line_segment_mut(canvas, (0.0, y as f32), (right, y as f32), color);
}
