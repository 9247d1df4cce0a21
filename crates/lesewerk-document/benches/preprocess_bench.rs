// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the preprocessing pipeline. Runs the archival
// profile (grayscale, denoise, deskew, adaptive binarize) on a small
// synthetic page with slightly skewed text rows — the realistic hot path for
// scanned input.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, GrayImage, Luma};

use lesewerk_document::{PreprocessingProfile, Preprocessor};

/// Build a 320x240 synthetic page: white background with dark text rows
/// drawn at a ~2 degree slope.
fn synthetic_page() -> DynamicImage {
    let (width, height) = (320u32, 240u32);
    let slope = 2.0f32.to_radians().tan();
    let mut img = GrayImage::from_pixel(width, height, Luma([245u8]));
    let mut y0 = 20i64;
    while y0 < height as i64 - 20 {
        for x in 0..width {
            let y = y0 + (x as f32 * slope).round() as i64;
            if y >= 0 && y < height as i64 - 2 {
                img.put_pixel(x, y as u32, Luma([25u8]));
                img.put_pixel(x, (y + 1) as u32, Luma([25u8]));
            }
        }
        y0 += 18;
    }
    DynamicImage::ImageLuma8(img)
}

fn bench_archival_profile(c: &mut Criterion) {
    let preprocessor = Preprocessor::with_defaults();
    let profile = PreprocessingProfile::archival();
    let page = synthetic_page();

    c.bench_function("prepare archival (320x240)", |b| {
        b.iter(|| {
            let out = preprocessor
                .prepare(black_box(&page), &profile)
                .expect("prepare");
            black_box(out);
        });
    });
}

fn bench_document_profile(c: &mut Criterion) {
    let preprocessor = Preprocessor::with_defaults();
    let profile = PreprocessingProfile::document_default();
    let page = synthetic_page();

    c.bench_function("prepare document_default (320x240)", |b| {
        b.iter(|| {
            let out = preprocessor
                .prepare(black_box(&page), &profile)
                .expect("prepare");
            black_box(out);
        });
    });
}

criterion_group!(benches, bench_archival_profile, bench_document_profile);
criterion_main!(benches);
