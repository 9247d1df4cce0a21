// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR capability boundary.
//
// The engine that actually recognizes text is an external collaborator
// consumed through this trait. Adapters for concrete engines live behind
// feature gates; the rest of the system only ever sees `dyn OcrCapability`.

#[cfg(feature = "ocr")]
pub mod ocrs_engine;

#[cfg(feature = "tesseract")]
pub mod tesseract;

use image::DynamicImage;
use lesewerk_core::error::OcrFailure;
use lesewerk_core::types::{CancelToken, RecognitionOptions, RecognizedPage};

/// An OCR engine: given a prepared raster, return recognized text and
/// per-word confidence scores.
///
/// Implementations are called from blocking worker threads and must be safe
/// to share (`Send + Sync`); a call may take seconds. Confidence scores are
/// reported exactly as the engine produced them (normalized to `0..=1`);
/// engines without word-level certainty return an empty word list.
pub trait OcrCapability: Send + Sync {
    /// Short engine name, recorded on every result.
    fn name(&self) -> &'static str;

    /// Whether `recognize` honours the cancel token while running. Engines
    /// that cannot stop mid-recognition return `false`; the scheduler then
    /// discards their result on completion instead of aborting them.
    fn supports_cancellation(&self) -> bool {
        false
    }

    /// Recognize text in a prepared raster.
    fn recognize(
        &self,
        image: &DynamicImage,
        options: &RecognitionOptions,
        cancel: &CancelToken,
    ) -> std::result::Result<RecognizedPage, OcrFailure>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GrayImage;
    use lesewerk_core::types::WordConfidence;

    /// Minimal stub engine used to exercise the trait object seam.
    struct StubEngine;

    impl OcrCapability for StubEngine {
        fn name(&self) -> &'static str {
            "stub"
        }

        fn recognize(
            &self,
            _image: &DynamicImage,
            _options: &RecognitionOptions,
            cancel: &CancelToken,
        ) -> std::result::Result<RecognizedPage, OcrFailure> {
            if cancel.is_cancelled() {
                return Err(OcrFailure::Recognition("cancelled".into()));
            }
            Ok(RecognizedPage {
                lines: vec!["hello world".into()],
                words: vec![
                    WordConfidence {
                        text: "hello".into(),
                        confidence: 0.9,
                    },
                    WordConfidence {
                        text: "world".into(),
                        confidence: 0.8,
                    },
                ],
            })
        }
    }

    #[test]
    fn trait_object_recognizes() {
        let engine: Box<dyn OcrCapability> = Box::new(StubEngine);
        let image = DynamicImage::ImageLuma8(GrayImage::new(10, 10));

        let page = engine
            .recognize(&image, &RecognitionOptions::default(), &CancelToken::new())
            .expect("recognize");
        assert_eq!(page.lines, vec!["hello world"]);
        assert_eq!(page.words.len(), 2);
        assert!(!engine.supports_cancellation());
    }

    #[test]
    fn stub_honours_pre_set_cancellation() {
        let engine = StubEngine;
        let image = DynamicImage::ImageLuma8(GrayImage::new(10, 10));
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = engine
            .recognize(&image, &RecognitionOptions::default(), &cancel)
            .expect_err("cancelled");
        assert!(matches!(err, OcrFailure::Recognition(_)));
    }
}
