// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for front-ends.
//
// Every technical error is mapped to plain English with a clear suggestion.
// The taxonomy uses four severity levels that drive UI presentation.

use crate::error::{LesewerkError, OcrFailure};

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Momentary overload, timeout — retrying can succeed.
    Transient,
    /// User must do something (pick another file, close and reopen).
    ActionRequired,
    /// Cannot be fixed by retrying or user action — wrong format, bad data.
    Permanent,
    /// Software must be installed first (OCR engine, language data,
    /// rendering library). Retrying without remediation cannot succeed.
    InstallRequired,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether retrying the same request can succeed.
    pub retriable: bool,
    /// Severity level (drives icon/colour in UI).
    pub severity: Severity,
}

/// Convert a `LesewerkError` into a `HumanError` suitable for direct display.
pub fn humanize_error(err: &LesewerkError) -> HumanError {
    match err {
        // -- Raster boundary --
        LesewerkError::InvalidImage(_) => HumanError {
            message: "There's a problem with this image.".into(),
            suggestion: "The image may be damaged or empty. Try opening it in an image viewer first, or save it again as a PNG or JPEG.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        LesewerkError::UnsupportedFormat(detail) => HumanError {
            message: "This type of file isn't supported.".into(),
            suggestion: format!(
                "Lesewerk reads PNG, JPEG, BMP, TIFF and PDF files. Try converting the file first. (File type: {detail})"
            ),
            retriable: false,
            severity: Severity::Permanent,
        },

        // -- PDF layer --
        LesewerkError::DocumentOpen(_) => HumanError {
            message: "This PDF couldn't be opened.".into(),
            suggestion: "The file may be damaged or password-protected. Try opening it in a PDF viewer to check it works.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        LesewerkError::PageIndex { index, page_count } => HumanError {
            message: "That page doesn't exist in this document.".into(),
            suggestion: format!(
                "You asked for page {} but the document only has {} page(s).",
                index + 1,
                page_count
            ),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        LesewerkError::HandleClosed => HumanError {
            message: "This document has already been closed.".into(),
            suggestion: "Open the document again, then retry.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        LesewerkError::Render(_) => HumanError {
            message: "A page couldn't be turned into an image.".into(),
            suggestion: "The page may use features the renderer doesn't support. Try a different page, or re-export the PDF.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        // -- Preprocessing --
        LesewerkError::InvalidProfile(detail) => HumanError {
            message: "The image-cleanup settings aren't valid.".into(),
            suggestion: format!("Adjust the settings and try again. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        // -- OCR engine --
        LesewerkError::Ocr(failure) => humanize_ocr_failure(failure),

        // -- Scheduler --
        LesewerkError::QueueFull { depth } => HumanError {
            message: "Too many documents are waiting already.".into(),
            suggestion: format!(
                "There are {depth} extractions queued. Wait for some to finish, then try again."
            ),
            retriable: true,
            severity: Severity::Transient,
        },

        LesewerkError::SchedulerClosed => HumanError {
            message: "Text extraction has been shut down.".into(),
            suggestion: "Restart the application to continue extracting text.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        LesewerkError::Internal(detail) => HumanError {
            message: "Something went wrong inside the extractor.".into(),
            suggestion: format!("Try again. If this keeps happening, please report it. (Detail: {detail})"),
            retriable: true,
            severity: Severity::Transient,
        },

        // -- I/O --
        LesewerkError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "The file couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Try choosing the file again.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "The app doesn't have permission to read that file.".into(),
                    suggestion: "Check the file permissions, or try copying the file to a different location first.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Try again. If this keeps happening, your device's storage may be full.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }
    }
}

/// Map engine-side failures onto install/retry guidance.
fn humanize_ocr_failure(failure: &OcrFailure) -> HumanError {
    match failure {
        OcrFailure::EngineUnavailable(detail) => HumanError {
            message: "The text-recognition engine isn't installed.".into(),
            suggestion: format!(
                "Install the OCR engine (or its model files) and try again. (Detail: {detail})"
            ),
            retriable: false,
            severity: Severity::InstallRequired,
        },

        OcrFailure::UnsupportedLanguage(lang) => HumanError {
            message: "That language isn't available for text recognition.".into(),
            suggestion: format!(
                "Install the language data for '{lang}', or switch to a language that is already installed."
            ),
            retriable: false,
            severity: Severity::InstallRequired,
        },

        OcrFailure::Timeout(ms) => HumanError {
            message: "Text recognition took too long and was stopped.".into(),
            suggestion: format!(
                "The page may be very large or complex. Try a lower resolution, or raise the {ms} ms limit in the engine settings."
            ),
            retriable: true,
            severity: Severity::Transient,
        },

        OcrFailure::Recognition(_) => HumanError {
            message: "Text recognition didn't work on this image.".into(),
            suggestion: "Try scanning the document again with better lighting, making sure the text is clear and in focus.".into(),
            retriable: true,
            severity: Severity::Transient,
        },
    }
}
