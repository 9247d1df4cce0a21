// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Deskew — projection-profile estimation of the dominant text-line angle.
//
// For each candidate angle the text pixels are projected onto sheared rows;
// when the candidate matches the true line angle the projection collapses
// into sharp peaks. The peakedness of the best candidate relative to the
// field gives a confidence value, and rotation is skipped entirely when that
// confidence is below the configured cutoff — a legible input is never made
// worse by a speculative rotation.

use image::{DynamicImage, GrayImage, Luma, Rgb};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};
use tracing::debug;

use super::steps::otsu_threshold;

/// Tuning for skew estimation.
#[derive(Debug, Clone)]
pub struct DeskewConfig {
    /// Half-width of the search range in degrees.
    pub max_angle_deg: f32,
    /// Search step in degrees.
    pub step_deg: f32,
    /// Minimum estimate confidence (0..1) required before rotating.
    pub confidence_cutoff: f32,
    /// Angles at or below this magnitude are treated as already level.
    pub tolerance_deg: f32,
}

impl Default for DeskewConfig {
    fn default() -> Self {
        Self {
            max_angle_deg: 15.0,
            step_deg: 0.25,
            confidence_cutoff: 0.15,
            tolerance_deg: 0.5,
        }
    }
}

/// Sample cap for the estimation pass. Angles are scale-invariant, so the
/// estimate runs on a thumbnail when the input is larger.
const ESTIMATE_MAX_DIM: u32 = 800;

/// Estimate the dominant text-line angle, then rotate it out.
///
/// Returns the input unchanged when the estimate is below the confidence
/// cutoff or the angle is within tolerance. Applying deskew to an already
/// level image therefore leaves it untouched.
pub(crate) fn deskew(image: &DynamicImage, config: &DeskewConfig) -> DynamicImage {
    let (angle, confidence) = estimate_skew(image, config);

    if confidence < config.confidence_cutoff {
        debug!(angle, confidence, cutoff = config.confidence_cutoff, "deskew skipped: low confidence");
        return image.clone();
    }
    if angle.abs() <= config.tolerance_deg {
        debug!(angle, "deskew skipped: within tolerance");
        return image.clone();
    }

    debug!(angle, confidence, "deskew rotating");
    rotate_level(image, -angle.to_radians())
}

/// Estimate the text-line angle of an image in degrees, with a confidence
/// value in 0..1. Positive angles mean the lines run downward to the right.
pub fn estimate_skew(image: &DynamicImage, config: &DeskewConfig) -> (f32, f32) {
    if !(config.step_deg > 0.0) || !(config.max_angle_deg > 0.0) {
        return (0.0, 0.0);
    }

    let gray = thumbnail_gray(image);
    let (width, height) = gray.dimensions();
    if width < 8 || height < 8 {
        return (0.0, 0.0);
    }

    // Text pixels are the dark side of the Otsu split.
    let threshold = otsu_threshold(&gray);
    let mut dark: Vec<(u32, u32)> = Vec::new();
    for (x, y, pixel) in gray.enumerate_pixels() {
        if pixel.0[0] < threshold {
            dark.push((x, y));
        }
    }
    if dark.len() < 64 {
        return (0.0, 0.0);
    }

    // Bins cover every sheared row index the search range can produce.
    let margin = (width as f32 * config.max_angle_deg.to_radians().tan()).ceil() as i64 + 1;
    let bin_count = (height as i64 + 2 * margin) as usize;

    let steps = (2.0 * config.max_angle_deg / config.step_deg).round() as i32;
    let mut best_angle = 0.0f32;
    let mut best_score = 0.0f64;
    let mut score_sum = 0.0f64;
    let mut score_count = 0u32;

    let mut bins = vec![0u32; bin_count];
    for i in 0..=steps {
        let angle = -config.max_angle_deg + i as f32 * config.step_deg;
        let shear = angle.to_radians().tan();

        bins.fill(0);
        for &(x, y) in &dark {
            let row = (y as f32 - x as f32 * shear).round() as i64 + margin;
            if row >= 0 && (row as usize) < bin_count {
                bins[row as usize] += 1;
            }
        }

        // Sum of squared bin counts: maximal when the projection is peaked.
        let score: f64 = bins.iter().map(|&c| (c as f64) * (c as f64)).sum();
        score_sum += score;
        score_count += 1;

        if score > best_score {
            best_score = score;
            best_angle = angle;
        }
    }

    if best_score <= 0.0 {
        return (0.0, 0.0);
    }
    let mean_score = score_sum / score_count as f64;
    let confidence = (1.0 - mean_score / best_score).clamp(0.0, 1.0) as f32;

    (best_angle, confidence)
}

/// Rotate by the given angle (radians) about the centre, filling the exposed
/// corners with paper white.
fn rotate_level(image: &DynamicImage, radians: f32) -> DynamicImage {
    match image {
        DynamicImage::ImageLuma8(gray) => DynamicImage::ImageLuma8(rotate_about_center(
            gray,
            radians,
            Interpolation::Bilinear,
            Luma([255u8]),
        )),
        _ => DynamicImage::ImageRgb8(rotate_about_center(
            &image.to_rgb8(),
            radians,
            Interpolation::Bilinear,
            Rgb([255u8, 255, 255]),
        )),
    }
}

/// Grayscale copy, downscaled when larger than the estimation cap.
fn thumbnail_gray(image: &DynamicImage) -> GrayImage {
    if image.width() > ESTIMATE_MAX_DIM || image.height() > ESTIMATE_MAX_DIM {
        image.thumbnail(ESTIMATE_MAX_DIM, ESTIMATE_MAX_DIM).to_luma8()
    } else {
        image.to_luma8()
    }
}
