// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Lesewerk extraction engine.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an extraction job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a loaded document (raster file or open PDF).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle states of an extraction job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    /// Submitted, waiting for a worker slot.
    Queued,
    /// Currently being preprocessed / recognized.
    Running,
    /// Recognition finished — see the job's result.
    Completed,
    /// Extraction failed — see the job's error.
    Failed,
    /// Cancelled before completion.
    Cancelled,
}

/// Serialization key for the scheduler.
///
/// Jobs sharing a key (same document, same page) run one at a time, in
/// submission order. `page` is `None` for single-raster documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobKey {
    pub document: DocumentId,
    pub page: Option<u32>,
}

/// Supported input formats at the pipeline boundary.
///
/// Anything that does not map onto one of these fails with
/// `UnsupportedFormat` before a decoder is ever invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputFormat {
    Png,
    Jpeg,
    Bmp,
    Tiff,
    Pdf,
}

impl InputFormat {
    /// MIME type string for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Bmp => "image/bmp",
            Self::Tiff => "image/tiff",
            Self::Pdf => "application/pdf",
        }
    }

    /// Infer the input format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "bmp" => Some(Self::Bmp),
            "tif" | "tiff" => Some(Self::Tiff),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Whether this format goes through the PDF page source rather than the
    /// raster decoder.
    pub fn is_pdf(&self) -> bool {
        matches!(self, Self::Pdf)
    }
}

/// A recognized word together with the engine's certainty estimate.
///
/// Confidence is whatever the engine reported, normalized to `0.0..=1.0` by
/// the engine adapter but never reinterpreted beyond that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordConfidence {
    pub text: String,
    pub confidence: f32,
}

/// Raw output of one recognition pass, as returned by an OCR capability.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecognizedPage {
    /// Recognized text, one entry per line, in reading order.
    pub lines: Vec<String>,
    /// Per-word confidence scores, in reading order. Engines that do not
    /// report word-level certainty leave this empty.
    pub words: Vec<WordConfidence>,
}

/// Options forwarded to the OCR capability for one recognition request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecognitionOptions {
    /// Language hints in ISO 639 three-letter form ("eng", "fra", ...).
    /// Empty means the engine's default language.
    pub language_hints: Vec<String>,
}

impl RecognitionOptions {
    /// Options for a single language.
    pub fn language(hint: impl Into<String>) -> Self {
        Self {
            language_hints: vec![hint.into()],
        }
    }
}

/// The immutable outcome of a successful extraction job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Recognized text, one entry per line, tidied (§ post-processing) but
    /// otherwise exactly what the engine produced.
    pub lines: Vec<String>,
    /// Per-word confidence scores, passed through from the engine unmodified.
    pub words: Vec<WordConfidence>,
    /// Source page index for PDF inputs, `None` for plain raster inputs.
    pub page_index: Option<u32>,
    /// Name of the engine that produced this result.
    pub engine: String,
    /// When recognition completed.
    pub completed_at: DateTime<Utc>,
}

impl ExtractionResult {
    /// The recognized text as a single newline-joined string.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Cooperative cancellation flag shared between a job's owner and its worker.
///
/// Cloning yields another view of the same flag. Once set, the flag never
/// clears.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_format_from_extension_is_case_insensitive() {
        assert_eq!(InputFormat::from_extension("PNG"), Some(InputFormat::Png));
        assert_eq!(InputFormat::from_extension("jpeg"), Some(InputFormat::Jpeg));
        assert_eq!(InputFormat::from_extension("Tif"), Some(InputFormat::Tiff));
        assert_eq!(InputFormat::from_extension("pdf"), Some(InputFormat::Pdf));
        assert_eq!(InputFormat::from_extension("docx"), None);
        assert_eq!(InputFormat::from_extension(""), None);
    }

    #[test]
    fn job_keys_distinguish_pages_of_the_same_document() {
        let doc = DocumentId::new();
        let page0 = JobKey {
            document: doc,
            page: Some(0),
        };
        let page1 = JobKey {
            document: doc,
            page: Some(1),
        };
        let raster = JobKey {
            document: doc,
            page: None,
        };
        assert_ne!(page0, page1);
        assert_ne!(page0, raster);
        assert_eq!(
            page0,
            JobKey {
                document: doc,
                page: Some(0)
            }
        );
    }

    #[test]
    fn extraction_result_text_joins_lines() {
        let result = ExtractionResult {
            lines: vec!["first line".into(), "second line".into()],
            words: vec![],
            page_index: Some(2),
            engine: "stub".into(),
            completed_at: Utc::now(),
        };
        assert_eq!(result.text(), "first line\nsecond line");
    }

    #[test]
    fn cancel_token_clones_share_the_flag() {
        let token = CancelToken::new();
        let view = token.clone();
        assert!(!view.is_cancelled());
        token.cancel();
        assert!(view.is_cancelled());
    }

    #[test]
    fn extraction_result_round_trips_through_json() {
        let result = ExtractionResult {
            lines: vec!["hello".into()],
            words: vec![WordConfidence {
                text: "hello".into(),
                confidence: 0.93,
            }],
            page_index: None,
            engine: "stub".into(),
            completed_at: Utc::now(),
        };
        let json = serde_json::to_string(&result).expect("serialize");
        let back: ExtractionResult = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.lines, result.lines);
        assert_eq!(back.words, result.words);
        assert_eq!(back.page_index, None);
    }
}
