// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Lesewerk.

use thiserror::Error;

/// Top-level error type for all Lesewerk operations.
#[derive(Debug, Error)]
pub enum LesewerkError {
    // -- Raster boundary --
    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("unsupported input format: {0}")]
    UnsupportedFormat(String),

    // -- PDF layer --
    #[error("failed to open document: {0}")]
    DocumentOpen(String),

    #[error("page index {index} out of range (document has {page_count} pages)")]
    PageIndex { index: u32, page_count: u32 },

    #[error("document handle is closed")]
    HandleClosed,

    #[error("page rendering failed: {0}")]
    Render(String),

    // -- Preprocessing --
    #[error("invalid preprocessing profile: {0}")]
    InvalidProfile(String),

    // -- OCR engine --
    #[error("OCR failed: {0}")]
    Ocr(#[from] OcrFailure),

    // -- Scheduler --
    #[error("job queue is full ({depth} jobs waiting)")]
    QueueFull { depth: usize },

    #[error("scheduler has been shut down")]
    SchedulerClosed,

    #[error("internal task failure: {0}")]
    Internal(String),

    // -- I/O --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Engine-side recognition failures, carried inside [`LesewerkError::Ocr`].
///
/// These map directly onto the ways an external OCR engine can let a request
/// down: the engine (or its model data) is missing, a requested language is
/// not installed, the recognition ran past the configured deadline, or the
/// engine reported an internal error.
#[derive(Debug, Error)]
pub enum OcrFailure {
    #[error("engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("recognition timed out after {0} ms")]
    Timeout(u64),

    #[error("recognition failed: {0}")]
    Recognition(String),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LesewerkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_index_message_names_both_values() {
        let err = LesewerkError::PageIndex {
            index: 3,
            page_count: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains('3'), "message should carry the index: {msg}");
        assert!(msg.contains("3 pages"), "message should carry the count: {msg}");
    }

    #[test]
    fn ocr_failure_converts_into_top_level_error() {
        let failure = OcrFailure::EngineUnavailable("tesseract not installed".into());
        let err: LesewerkError = failure.into();
        assert!(matches!(
            err,
            LesewerkError::Ocr(OcrFailure::EngineUnavailable(_))
        ));
    }

    #[test]
    fn timeout_message_includes_duration() {
        let err = OcrFailure::Timeout(15_000);
        assert!(err.to_string().contains("15000 ms"));
    }
}
