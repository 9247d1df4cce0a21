// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Preprocessing profiles — typed, validated, immutable step sequences.

use lesewerk_core::error::{LesewerkError, Result};

/// Thresholding method for the binarize step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinarizeMethod {
    /// Global threshold: pixels at or above `threshold` become background
    /// (white), everything below becomes text (black). A pixel exactly at the
    /// threshold rounds to background.
    Fixed { threshold: u8 },
    /// Global threshold computed from the image histogram (Otsu's method).
    Otsu,
    /// Local mean threshold over a `(2*block_radius+1)²` neighbourhood,
    /// offset by the constant `c`. Typical values: radius 15, c 10.
    Adaptive { block_radius: u32, c: i32 },
}

/// One step of a preprocessing profile. Every step is a pure
/// raster-to-raster transform; none mutates its input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProfileStep {
    /// Collapse colour channels by luminance. No-op on single-channel input.
    Grayscale,
    /// Median filter with the given radius (1..=3). The radius cap keeps
    /// text edges intact.
    Denoise { radius: u8 },
    /// Two-level conversion.
    Binarize { method: BinarizeMethod },
    /// Estimate the dominant text-line angle and rotate it out. Skipped when
    /// the estimate is not confident or the angle is within tolerance.
    Deskew,
    /// Contrast adjustment around the midpoint, clamped to [0, 255].
    /// Factor 1.0 is a no-op; valid range 0.1..=4.0.
    Contrast { factor: f32 },
    /// Unsharp-style 3x3 sharpening, clamped to [0, 255]. Amount 0.0 is a
    /// no-op, 1.0 is the classic document-sharpening kernel; valid range
    /// 0.0..=2.0.
    Sharpen { amount: f32 },
}

impl ProfileStep {
    fn validate(&self) -> std::result::Result<(), String> {
        match self {
            Self::Grayscale | Self::Deskew => Ok(()),
            Self::Denoise { radius } => {
                if (1..=3).contains(radius) {
                    Ok(())
                } else {
                    Err(format!("denoise radius {radius} outside 1..=3"))
                }
            }
            Self::Binarize { method } => match method {
                BinarizeMethod::Fixed { .. } | BinarizeMethod::Otsu => Ok(()),
                BinarizeMethod::Adaptive { block_radius, c } => {
                    if !(1..=64).contains(block_radius) {
                        Err(format!("adaptive block radius {block_radius} outside 1..=64"))
                    } else if !(-128..=128).contains(c) {
                        Err(format!("adaptive offset {c} outside -128..=128"))
                    } else {
                        Ok(())
                    }
                }
            },
            Self::Contrast { factor } => {
                if factor.is_finite() && (0.1..=4.0).contains(factor) {
                    Ok(())
                } else {
                    Err(format!("contrast factor {factor} outside 0.1..=4.0"))
                }
            }
            Self::Sharpen { amount } => {
                if amount.is_finite() && (0.0..=2.0).contains(amount) {
                    Ok(())
                } else {
                    Err(format!("sharpen amount {amount} outside 0.0..=2.0"))
                }
            }
        }
    }
}

/// An ordered, immutable sequence of preprocessing steps.
///
/// Constructed once per extraction request; validation happens here, so a
/// profile that exists is always applicable. An empty profile is valid and
/// leaves the raster untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessingProfile {
    steps: Vec<ProfileStep>,
}

impl PreprocessingProfile {
    /// Build a profile from the given steps, validating every parameter.
    pub fn new(steps: Vec<ProfileStep>) -> Result<Self> {
        for (position, step) in steps.iter().enumerate() {
            step.validate()
                .map_err(|detail| LesewerkError::InvalidProfile(format!("step {position}: {detail}")))?;
        }
        Ok(Self { steps })
    }

    /// The steps in application order.
    pub fn steps(&self) -> &[ProfileStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The default profile for photographed or scanned documents: grayscale,
    /// light denoise, contrast boost, sharpen. Keeps the full grey range,
    /// which suits most recognition engines.
    pub fn document_default() -> Self {
        Self {
            steps: vec![
                ProfileStep::Grayscale,
                ProfileStep::Denoise { radius: 1 },
                ProfileStep::Contrast { factor: 1.4 },
                ProfileStep::Sharpen { amount: 1.0 },
            ],
        }
    }

    /// Aggressive profile for skewed or low-quality scans: adds deskew and
    /// adaptive binarization after the grayscale/denoise stage.
    pub fn archival() -> Self {
        Self {
            steps: vec![
                ProfileStep::Grayscale,
                ProfileStep::Denoise { radius: 1 },
                ProfileStep::Deskew,
                ProfileStep::Binarize {
                    method: BinarizeMethod::Adaptive {
                        block_radius: 15,
                        c: 10,
                    },
                },
            ],
        }
    }
}
