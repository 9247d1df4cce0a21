// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Preprocessing pipeline — turns an arbitrary input raster into an OCR-ready
// one by applying the steps of a profile in order. Every step produces a new
// raster; nothing is mutated in place, so rasters can be shared freely
// between concurrent jobs.

pub mod deskew;
pub mod profile;
mod steps;

use image::DynamicImage;
use lesewerk_core::error::Result;
use tracing::{debug, instrument};

pub use deskew::DeskewConfig;
pub use profile::{BinarizeMethod, PreprocessingProfile, ProfileStep};

use crate::raster;

/// Tuning knobs for the preprocessing transforms that carry internal
/// heuristics. Profile steps say *what* to run; this says how the
/// estimators behave.
#[derive(Debug, Clone, Default)]
pub struct PreprocessConfig {
    pub deskew: DeskewConfig,
}

/// Applies preprocessing profiles to rasters.
///
/// `prepare` is deterministic: identical input and profile yield
/// byte-identical output.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    config: PreprocessConfig,
}

impl Preprocessor {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    /// A preprocessor with default estimator tuning.
    pub fn with_defaults() -> Self {
        Self::new(PreprocessConfig::default())
    }

    /// Apply the profile's steps in declared order.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidImage` if the input has zero area or an unsupported
    /// colour depth. An empty output is never produced silently.
    #[instrument(skip_all, fields(
        width = image.width(),
        height = image.height(),
        steps = profile.steps().len(),
    ))]
    pub fn prepare(
        &self,
        image: &DynamicImage,
        profile: &PreprocessingProfile,
    ) -> Result<DynamicImage> {
        raster::ensure_supported(image)?;

        let mut current = image.clone();
        for step in profile.steps() {
            current = match step {
                ProfileStep::Grayscale => steps::grayscale(&current),
                ProfileStep::Denoise { radius } => steps::denoise(&current, *radius),
                ProfileStep::Binarize { method } => steps::binarize(&current, method),
                ProfileStep::Deskew => deskew::deskew(&current, &self.config.deskew),
                ProfileStep::Contrast { factor } => steps::contrast(&current, *factor),
                ProfileStep::Sharpen { amount } => steps::sharpen(&current, *amount),
            };
            debug!(?step, width = current.width(), height = current.height(), "step applied");
        }

        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use lesewerk_core::error::LesewerkError;

    fn sample_page() -> DynamicImage {
        // Light page with a few dark "text" rows.
        let img = GrayImage::from_fn(64, 64, |_, y| {
            if y % 8 < 2 { Luma([30u8]) } else { Luma([220u8]) }
        });
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn prepare_is_deterministic() {
        let preprocessor = Preprocessor::with_defaults();
        let profile = PreprocessingProfile::archival();
        let input = sample_page();

        let a = preprocessor.prepare(&input, &profile).expect("first run");
        let b = preprocessor.prepare(&input, &profile).expect("second run");
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn prepare_does_not_mutate_its_input() {
        let preprocessor = Preprocessor::with_defaults();
        let profile = PreprocessingProfile::document_default();
        let input = sample_page();
        let before = input.as_bytes().to_vec();

        preprocessor.prepare(&input, &profile).expect("prepare");
        assert_eq!(input.as_bytes(), before.as_slice());
    }

    #[test]
    fn empty_profile_is_identity() {
        let preprocessor = Preprocessor::with_defaults();
        let profile = PreprocessingProfile::new(vec![]).expect("empty profile");
        let input = sample_page();

        let out = preprocessor.prepare(&input, &profile).expect("prepare");
        assert_eq!(input.as_bytes(), out.as_bytes());
    }

    #[test]
    fn zero_area_input_fails_with_invalid_image() {
        let preprocessor = Preprocessor::with_defaults();
        let profile = PreprocessingProfile::document_default();
        let empty = DynamicImage::ImageLuma8(GrayImage::new(0, 0));

        let err = preprocessor
            .prepare(&empty, &profile)
            .expect_err("zero area must fail");
        assert!(matches!(err, LesewerkError::InvalidImage(_)));
    }

    #[test]
    fn archival_profile_produces_two_level_output() {
        let preprocessor = Preprocessor::with_defaults();
        let out = preprocessor
            .prepare(&sample_page(), &PreprocessingProfile::archival())
            .expect("prepare");
        assert!(out.to_luma8().pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }
}
