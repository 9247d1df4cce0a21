// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Individual preprocessing transforms. Every function here is pure: it takes
// a raster by reference and produces a new one, so the same input and
// parameters always yield byte-identical output.

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use imageproc::filter::median_filter;

use super::profile::BinarizeMethod;

// -- Grayscale ----------------------------------------------------------------

/// Collapse colour channels by luminance. Already-grayscale input is passed
/// through unchanged, which makes the step idempotent.
pub(crate) fn grayscale(image: &DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageLuma8(_) => image.clone(),
        _ => DynamicImage::ImageLuma8(image.to_luma8()),
    }
}

// -- Denoise ------------------------------------------------------------------

/// Median filter with a small radius. Median smoothing removes salt-and-pepper
/// scan noise while keeping hard text edges, which a Gaussian blur would soften.
pub(crate) fn denoise(image: &DynamicImage, radius: u8) -> DynamicImage {
    let r = u32::from(radius);
    match image {
        DynamicImage::ImageLuma8(gray) => DynamicImage::ImageLuma8(median_filter(gray, r, r)),
        _ => DynamicImage::ImageRgb8(median_filter(&image.to_rgb8(), r, r)),
    }
}

// -- Binarize -----------------------------------------------------------------

/// Two-level conversion. Output is always an 8-bit grayscale image containing
/// only 0 (text) and 255 (background).
///
/// The comparison is `pixel >= threshold → background`, so a pixel exactly at
/// the threshold rounds to background. The automatic methods (Otsu, adaptive)
/// recognize an input that is already two-level and return it unchanged, so
/// repeated application is stable.
pub(crate) fn binarize(image: &DynamicImage, method: &BinarizeMethod) -> DynamicImage {
    let gray = image.to_luma8();

    let output = match method {
        BinarizeMethod::Fixed { threshold } => apply_threshold(&gray, *threshold),
        BinarizeMethod::Otsu => {
            if is_two_level(&gray) {
                gray
            } else {
                let threshold = otsu_threshold(&gray);
                apply_threshold(&gray, threshold)
            }
        }
        BinarizeMethod::Adaptive { block_radius, c } => {
            if is_two_level(&gray) {
                gray
            } else {
                adaptive_threshold(&gray, *block_radius, *c)
            }
        }
    };

    DynamicImage::ImageLuma8(output)
}

/// Global threshold: `pixel >= threshold` becomes white.
fn apply_threshold(gray: &GrayImage, threshold: u8) -> GrayImage {
    let (width, height) = gray.dimensions();
    let mut output = GrayImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let val = gray.get_pixel(x, y).0[0];
            let binary = if val >= threshold { 255u8 } else { 0u8 };
            output.put_pixel(x, y, Luma([binary]));
        }
    }
    output
}

/// True if the image contains only the values 0 and 255.
fn is_two_level(gray: &GrayImage) -> bool {
    gray.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255)
}

/// Compute the Otsu threshold for a grayscale image.
///
/// Finds the threshold value that maximises the between-class variance of the
/// text and background pixel groups.
pub(crate) fn otsu_threshold(gray: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in gray.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total_pixels = gray.width() as u64 * gray.height() as u64;
    if total_pixels == 0 {
        return 128;
    }

    let mut sum_total: f64 = 0.0;
    for (i, &count) in histogram.iter().enumerate() {
        sum_total += i as f64 * count as f64;
    }

    let mut sum_background: f64 = 0.0;
    let mut weight_background: u64 = 0;
    let mut max_variance: f64 = 0.0;
    let mut best_threshold: u8 = 0;

    for (t, &count) in histogram.iter().enumerate() {
        weight_background += count;
        if weight_background == 0 {
            continue;
        }
        let weight_foreground = total_pixels - weight_background;
        if weight_foreground == 0 {
            break;
        }

        sum_background += t as f64 * count as f64;
        let mean_background = sum_background / weight_background as f64;
        let mean_foreground = (sum_total - sum_background) / weight_foreground as f64;

        let between_variance = weight_background as f64
            * weight_foreground as f64
            * (mean_background - mean_foreground).powi(2);

        if between_variance > max_variance {
            max_variance = between_variance;
            best_threshold = t as u8;
        }
    }

    // The loop finds the last value assigned to the background class; the
    // dividing line for the >= comparison sits one above it.
    best_threshold.saturating_add(1)
}

/// Local mean threshold using an integral image for O(1) window sums.
fn adaptive_threshold(gray: &GrayImage, block_radius: u32, c: i32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let integral = compute_integral_image(gray);

    let mut output = GrayImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let local_mean = region_mean(&integral, width, height, x, y, block_radius);
            let threshold = (local_mean as i32 - c).clamp(0, 255) as u8;
            let val = gray.get_pixel(x, y).0[0];
            let binary = if val >= threshold { 255u8 } else { 0u8 };
            output.put_pixel(x, y, Luma([binary]));
        }
    }
    output
}

/// Compute the integral (summed-area table) of a grayscale image.
///
/// `integral[y * (width+1) + x]` contains the sum of all pixel values in the
/// rectangle [0, 0) to (x, y) (exclusive on both axes). The table has
/// dimensions `(width+1) x (height+1)` with a zero-padded border.
fn compute_integral_image(gray: &GrayImage) -> Vec<u64> {
    let (w, h) = gray.dimensions();
    let stride = (w + 1) as usize;
    let mut table = vec![0u64; stride * (h + 1) as usize];

    for y in 0..h {
        let mut row_sum: u64 = 0;
        for x in 0..w {
            row_sum += gray.get_pixel(x, y).0[0] as u64;
            let idx = (y + 1) as usize * stride + (x + 1) as usize;
            let above = y as usize * stride + (x + 1) as usize;
            table[idx] = row_sum + table[above];
        }
    }

    table
}

/// Mean pixel value within a square region centred on (cx, cy), clamped to
/// image bounds, using the precomputed integral image.
fn region_mean(
    integral: &[u64],
    img_width: u32,
    img_height: u32,
    cx: u32,
    cy: u32,
    radius: u32,
) -> f64 {
    let stride = (img_width + 1) as usize;

    let x1 = cx.saturating_sub(radius) as usize;
    let y1 = cy.saturating_sub(radius) as usize;
    let x2 = ((cx + radius + 1) as usize).min(img_width as usize);
    let y2 = ((cy + radius + 1) as usize).min(img_height as usize);

    let area = ((x2 - x1) * (y2 - y1)) as f64;
    if area == 0.0 {
        return 128.0;
    }

    let sum = integral[y2 * stride + x2] as f64 - integral[y1 * stride + x2] as f64
        - integral[y2 * stride + x1] as f64
        + integral[y1 * stride + x1] as f64;

    sum / area
}

// -- Contrast -----------------------------------------------------------------

/// Contrast adjustment around the midpoint. Values are clamped to [0, 255],
/// never wrapped.
pub(crate) fn contrast(image: &DynamicImage, factor: f32) -> DynamicImage {
    let adjust = |channel: u8| -> u8 {
        let val = factor * (channel as f32 - 128.0) + 128.0;
        val.clamp(0.0, 255.0) as u8
    };

    match image {
        DynamicImage::ImageLuma8(gray) => {
            let out = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
                Luma([adjust(gray.get_pixel(x, y).0[0])])
            });
            DynamicImage::ImageLuma8(out)
        }
        _ => {
            let rgb = image.to_rgb8();
            let out = RgbImage::from_fn(rgb.width(), rgb.height(), |x, y| {
                let Rgb([r, g, b]) = *rgb.get_pixel(x, y);
                Rgb([adjust(r), adjust(g), adjust(b)])
            });
            DynamicImage::ImageRgb8(out)
        }
    }
}

// -- Sharpen ------------------------------------------------------------------

/// 3x3 sharpening: centre `1 + 8*amount`, ring `-amount`. At amount 1.0 this
/// is the classic document kernel (centre 9, ring -1). Border pixels sample
/// with clamped coordinates; output values are clamped to [0, 255].
pub(crate) fn sharpen(image: &DynamicImage, amount: f32) -> DynamicImage {
    if amount == 0.0 {
        return image.clone();
    }

    match image {
        DynamicImage::ImageLuma8(gray) => DynamicImage::ImageLuma8(sharpen_gray(gray, amount)),
        _ => DynamicImage::ImageRgb8(sharpen_rgb(&image.to_rgb8(), amount)),
    }
}

fn sharpen_gray(gray: &GrayImage, amount: f32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let centre = 1.0 + 8.0 * amount;

    GrayImage::from_fn(width, height, |x, y| {
        let mut acc = 0.0f32;
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                let sx = (x as i64 + dx).clamp(0, width as i64 - 1) as u32;
                let sy = (y as i64 + dy).clamp(0, height as i64 - 1) as u32;
                let weight = if dx == 0 && dy == 0 { centre } else { -amount };
                acc += weight * gray.get_pixel(sx, sy).0[0] as f32;
            }
        }
        Luma([acc.clamp(0.0, 255.0) as u8])
    })
}

fn sharpen_rgb(rgb: &RgbImage, amount: f32) -> RgbImage {
    let (width, height) = rgb.dimensions();
    let centre = 1.0 + 8.0 * amount;

    RgbImage::from_fn(width, height, |x, y| {
        let mut acc = [0.0f32; 3];
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                let sx = (x as i64 + dx).clamp(0, width as i64 - 1) as u32;
                let sy = (y as i64 + dy).clamp(0, height as i64 - 1) as u32;
                let weight = if dx == 0 && dy == 0 { centre } else { -amount };
                let Rgb([r, g, b]) = *rgb.get_pixel(sx, sy);
                acc[0] += weight * r as f32;
                acc[1] += weight * g as f32;
                acc[2] += weight * b as f32;
            }
        }
        Rgb([
            acc[0].clamp(0.0, 255.0) as u8,
            acc[1].clamp(0.0, 255.0) as u8,
            acc[2].clamp(0.0, 255.0) as u8,
        ])
    })
}
