// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Extraction jobs — the unit of work binding one raster (or one PDF page) to
// a preprocessing profile and recognition options.

use std::sync::Arc;

use chrono::Utc;
use image::DynamicImage;
use lesewerk_core::error::{LesewerkError, Result};
use lesewerk_core::types::{
    CancelToken, DocumentId, ExtractionResult, JobKey, RecognitionOptions,
};
use lesewerk_document::document::{Document, DocumentContent};
use lesewerk_document::ocr::OcrCapability;
use lesewerk_document::pdf::PdfHandle;
use lesewerk_document::preprocess::{PreprocessingProfile, Preprocessor};
use tracing::{debug, instrument};

use crate::postprocess;

/// The raster input of a job.
///
/// A job never owns its raster: image documents share theirs behind an `Arc`,
/// PDF pages are rendered on demand by the page source. In both cases the
/// raster is immutable, so concurrent jobs can read the same source freely.
#[derive(Clone, Debug)]
pub enum JobInput {
    Raster(Arc<DynamicImage>),
    PdfPage { handle: PdfHandle, index: u32 },
}

impl JobInput {
    /// Page index for PDF inputs, `None` for rasters.
    pub fn page(&self) -> Option<u32> {
        match self {
            Self::Raster(_) => None,
            Self::PdfPage { index, .. } => Some(*index),
        }
    }
}

/// Everything the scheduler needs to run one extraction.
///
/// The profile and options are immutable values constructed once, here;
/// workers only read them.
#[derive(Clone, Debug)]
pub struct ExtractionRequest {
    pub document: DocumentId,
    pub input: JobInput,
    pub profile: PreprocessingProfile,
    pub options: RecognitionOptions,
    /// Render resolution override for PDF pages; `None` uses the engine
    /// config default.
    pub dpi: Option<f32>,
}

impl ExtractionRequest {
    /// Request extraction of one page of a document.
    ///
    /// For raster documents the only valid page is 0. For PDFs the index is
    /// validated against the page count up front, so a bad index fails at
    /// submission rather than mid-run.
    pub fn for_page(
        document: &Document,
        page: u32,
        profile: PreprocessingProfile,
        options: RecognitionOptions,
    ) -> Result<Self> {
        let input = match document.content() {
            DocumentContent::Raster(image) => {
                if page != 0 {
                    return Err(LesewerkError::PageIndex {
                        index: page,
                        page_count: 1,
                    });
                }
                JobInput::Raster(image.clone())
            }
            DocumentContent::Pdf(handle) => {
                let page_count = handle.page_count()?;
                if page >= page_count {
                    return Err(LesewerkError::PageIndex {
                        index: page,
                        page_count,
                    });
                }
                JobInput::PdfPage {
                    handle: handle.clone(),
                    index: page,
                }
            }
        };

        Ok(Self {
            document: document.id(),
            input,
            profile,
            options,
            dpi: None,
        })
    }

    /// Request extraction of a standalone raster.
    pub fn for_raster(
        document: DocumentId,
        image: Arc<DynamicImage>,
        profile: PreprocessingProfile,
        options: RecognitionOptions,
    ) -> Self {
        Self {
            document,
            input: JobInput::Raster(image),
            profile,
            options,
            dpi: None,
        }
    }

    /// Override the render resolution for this request's PDF page.
    pub fn with_dpi(mut self, dpi: f32) -> Self {
        self.dpi = Some(dpi);
        self
    }

    /// The scheduler serialization key: document + page.
    pub fn key(&self) -> JobKey {
        JobKey {
            document: self.document,
            page: self.input.page(),
        }
    }
}

/// Run one extraction synchronously: preprocess the raster, hand it to the
/// OCR capability, tidy the recognized lines, and wrap everything into an
/// [`ExtractionResult`].
///
/// Confidence scores pass through unmodified. There is no retry here — retry
/// policy belongs to the caller.
#[instrument(skip_all, fields(
    engine = ocr.name(),
    width = image.width(),
    height = image.height(),
    page = ?page_index,
))]
pub fn run(
    preprocessor: &Preprocessor,
    ocr: &dyn OcrCapability,
    image: &DynamicImage,
    profile: &PreprocessingProfile,
    options: &RecognitionOptions,
    cancel: &CancelToken,
    page_index: Option<u32>,
) -> Result<ExtractionResult> {
    let prepared = preprocessor.prepare(image, profile)?;
    debug!(
        prepared_width = prepared.width(),
        prepared_height = prepared.height(),
        "raster prepared"
    );

    let page = ocr.recognize(&prepared, options, cancel)?;
    let lines = postprocess::tidy_lines(&page.lines);

    debug!(lines = lines.len(), words = page.words.len(), "extraction complete");
    Ok(ExtractionResult {
        lines,
        words: page.words,
        page_index,
        engine: ocr.name().to_string(),
        completed_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use lesewerk_core::error::OcrFailure;
    use lesewerk_core::types::{RecognizedPage, WordConfidence};

    struct FixedEngine {
        lines: Vec<String>,
        words: Vec<WordConfidence>,
    }

    impl OcrCapability for FixedEngine {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn recognize(
            &self,
            _image: &DynamicImage,
            _options: &RecognitionOptions,
            _cancel: &CancelToken,
        ) -> std::result::Result<RecognizedPage, OcrFailure> {
            Ok(RecognizedPage {
                lines: self.lines.clone(),
                words: self.words.clone(),
            })
        }
    }

    struct UnavailableEngine;

    impl OcrCapability for UnavailableEngine {
        fn name(&self) -> &'static str {
            "unavailable"
        }

        fn recognize(
            &self,
            _image: &DynamicImage,
            _options: &RecognitionOptions,
            _cancel: &CancelToken,
        ) -> std::result::Result<RecognizedPage, OcrFailure> {
            Err(OcrFailure::EngineUnavailable("not installed".into()))
        }
    }

    fn blank_page() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(24, 24, Luma([240u8])))
    }

    #[test]
    fn run_wraps_engine_output_into_a_result() {
        let engine = FixedEngine {
            lines: vec![
                "Title   line".to_string(),
                String::new(),
                String::new(),
                "body  text".to_string(),
            ],
            words: vec![WordConfidence {
                text: "Title".into(),
                confidence: 0.75,
            }],
        };

        let result = run(
            &Preprocessor::with_defaults(),
            &engine,
            &blank_page(),
            &PreprocessingProfile::document_default(),
            &RecognitionOptions::default(),
            &CancelToken::new(),
            Some(4),
        )
        .expect("run");

        assert_eq!(result.lines, vec!["Title line", "", "body text"]);
        assert_eq!(result.words.len(), 1);
        assert_eq!(result.words[0].confidence, 0.75);
        assert_eq!(result.page_index, Some(4));
        assert_eq!(result.engine, "fixed");
    }

    #[test]
    fn engine_failure_surfaces_as_ocr_error() {
        let err = run(
            &Preprocessor::with_defaults(),
            &UnavailableEngine,
            &blank_page(),
            &PreprocessingProfile::new(vec![]).expect("empty profile"),
            &RecognitionOptions::default(),
            &CancelToken::new(),
            None,
        )
        .expect_err("engine unavailable");
        assert!(matches!(
            err,
            LesewerkError::Ocr(OcrFailure::EngineUnavailable(_))
        ));
    }

    #[test]
    fn invalid_raster_fails_before_recognition() {
        let engine = FixedEngine {
            lines: vec![],
            words: vec![],
        };
        let zero = DynamicImage::ImageLuma8(GrayImage::new(0, 0));
        let err = run(
            &Preprocessor::with_defaults(),
            &engine,
            &zero,
            &PreprocessingProfile::document_default(),
            &RecognitionOptions::default(),
            &CancelToken::new(),
            None,
        )
        .expect_err("zero-area raster");
        assert!(matches!(err, LesewerkError::InvalidImage(_)));
    }

    #[test]
    fn raster_request_page_zero_only() {
        let document = Document::from_raster(blank_page(), "scan.png").expect("document");
        let profile = PreprocessingProfile::document_default();

        let request = ExtractionRequest::for_page(
            &document,
            0,
            profile.clone(),
            RecognitionOptions::default(),
        )
        .expect("page 0");
        assert_eq!(request.key().page, None);
        assert_eq!(request.key().document, document.id());

        let err = ExtractionRequest::for_page(&document, 1, profile, RecognitionOptions::default())
            .expect_err("page 1 of a raster");
        assert!(matches!(
            err,
            LesewerkError::PageIndex {
                index: 1,
                page_count: 1
            }
        ));
    }
}
