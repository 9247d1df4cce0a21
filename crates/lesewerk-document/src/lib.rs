// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// lesewerk-document — Document handling for the Lesewerk extraction engine.
//
// Provides the raster input boundary (format detection, decoding, validation),
// the deterministic preprocessing pipeline (grayscale, denoise, binarize,
// deskew, contrast, sharpen), the PDF page source (lazy per-page
// rasterization on a dedicated worker thread), and the OCR capability trait
// with feature-gated engine adapters.

pub mod document;
pub mod ocr;
pub mod pdf;
pub mod preprocess;
pub mod raster;

// Re-export the primary types so callers can use `lesewerk_document::Document` etc.
pub use document::{Document, DocumentContent};
pub use ocr::OcrCapability;
pub use pdf::{PdfHandle, PdfPageSource, RenderBackend};
pub use preprocess::{
    BinarizeMethod, PreprocessConfig, PreprocessingProfile, Preprocessor, ProfileStep,
};

#[cfg(feature = "ocr")]
pub use ocr::ocrs_engine::OcrsEngine;

#[cfg(feature = "tesseract")]
pub use ocr::tesseract::TesseractEngine;
