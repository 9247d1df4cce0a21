// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR adapter for the `ocrs` engine — pure-Rust OCR backed by neural network
// models executed via `rten`.
//
// # Model Setup
//
// The engine requires two model files:
//
// - **Detection model** (`text-detection.rten`) — locates text regions.
// - **Recognition model** (`text-recognition.rten`) — decodes characters.
//
// Models can be downloaded from the ocrs-models releases, or obtained by
// running the `ocrs-cli` tool once (it caches them under `~/.cache/ocrs`).
//
// # Limits
//
// ocrs recognizes Latin-script text with English training data and reports
// no per-word certainty, so recognized pages carry an empty word list.

use std::path::{Path, PathBuf};

use image::DynamicImage;
use lesewerk_core::error::{LesewerkError, OcrFailure, Result};
use lesewerk_core::types::{CancelToken, RecognitionOptions, RecognizedPage};
use ocrs::{ImageSource, OcrEngine as OcrsInner, OcrEngineParams};
use rten::Model;
use tracing::{debug, info, instrument};

use super::OcrCapability;

/// Default directory for cached model files: `$XDG_CACHE_HOME/ocrs`, falling
/// back to `~/.cache/ocrs` when `XDG_CACHE_HOME` is unset.
fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// Configuration for constructing an [`OcrsEngine`].
#[derive(Debug, Clone)]
pub struct OcrsConfig {
    /// Path to the text-detection model file (`.rten`).
    pub detection_model_path: PathBuf,
    /// Path to the text-recognition model file (`.rten`).
    pub recognition_model_path: PathBuf,
}

impl Default for OcrsConfig {
    fn default() -> Self {
        let dir = default_model_dir();
        Self {
            detection_model_path: dir.join(DETECTION_MODEL_FILENAME),
            recognition_model_path: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }
}

impl OcrsConfig {
    /// Config pointing at a directory containing both model files.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection_model_path: dir.join(DETECTION_MODEL_FILENAME),
            recognition_model_path: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    /// Verify that both model files exist.
    pub fn validate(&self) -> std::result::Result<(), OcrFailure> {
        for path in [&self.detection_model_path, &self.recognition_model_path] {
            if !path.exists() {
                return Err(OcrFailure::EngineUnavailable(format!(
                    "model not found at {}; run `ocrs-cli` once to download models",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

/// `ocrs`-backed OCR capability.
///
/// Model loading is the expensive step — build the engine once and reuse it
/// for many pages. The `ocrs` and `rten` crates must be compiled in release
/// mode; debug builds are 10-100x slower.
pub struct OcrsEngine {
    inner: OcrsInner,
}

impl OcrsEngine {
    /// Load models from the paths in `config`.
    ///
    /// # Errors
    ///
    /// Fails with `EngineUnavailable` when model files are missing or
    /// corrupt.
    #[instrument(skip_all, fields(
        detection = %config.detection_model_path.display(),
        recognition = %config.recognition_model_path.display(),
    ))]
    pub fn new(config: OcrsConfig) -> Result<Self> {
        config.validate().map_err(LesewerkError::Ocr)?;

        info!("loading OCR detection model");
        let detection_model = Model::load_file(&config.detection_model_path).map_err(|err| {
            LesewerkError::Ocr(OcrFailure::EngineUnavailable(format!(
                "failed to load detection model from {}: {}",
                config.detection_model_path.display(),
                err
            )))
        })?;

        info!("loading OCR recognition model");
        let recognition_model =
            Model::load_file(&config.recognition_model_path).map_err(|err| {
                LesewerkError::Ocr(OcrFailure::EngineUnavailable(format!(
                    "failed to load recognition model from {}: {}",
                    config.recognition_model_path.display(),
                    err
                )))
            })?;

        let inner = OcrsInner::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| {
            LesewerkError::Ocr(OcrFailure::EngineUnavailable(format!(
                "failed to initialise OCR engine: {err}"
            )))
        })?;

        info!("ocrs engine initialised");
        Ok(Self { inner })
    }

    /// Engine using the default model cache directory.
    pub fn with_defaults() -> Result<Self> {
        Self::new(OcrsConfig::default())
    }
}

impl OcrCapability for OcrsEngine {
    fn name(&self) -> &'static str {
        "ocrs"
    }

    /// The adapter checks the token between the detection, line-finding, and
    /// recognition stages, so cancellation takes effect at the next stage
    /// boundary.
    fn supports_cancellation(&self) -> bool {
        true
    }

    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    fn recognize(
        &self,
        image: &DynamicImage,
        options: &RecognitionOptions,
        cancel: &CancelToken,
    ) -> std::result::Result<RecognizedPage, OcrFailure> {
        for hint in &options.language_hints {
            if !matches!(hint.as_str(), "en" | "eng" | "english") {
                return Err(OcrFailure::UnsupportedLanguage(hint.clone()));
            }
        }

        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();

        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            OcrFailure::Recognition(format!("failed to build image source ({width}x{height}): {err}"))
        })?;
        let input = self
            .inner
            .prepare_input(source)
            .map_err(|err| OcrFailure::Recognition(format!("preprocessing failed: {err}")))?;

        if cancel.is_cancelled() {
            return Err(OcrFailure::Recognition("recognition cancelled".into()));
        }

        let word_rects = self
            .inner
            .detect_words(&input)
            .map_err(|err| OcrFailure::Recognition(format!("word detection failed: {err}")))?;
        debug!(word_count = word_rects.len(), "words detected");

        if cancel.is_cancelled() {
            return Err(OcrFailure::Recognition("recognition cancelled".into()));
        }

        let line_rects = self.inner.find_text_lines(&input, &word_rects);
        debug!(line_count = line_rects.len(), "text lines found");

        if cancel.is_cancelled() {
            return Err(OcrFailure::Recognition("recognition cancelled".into()));
        }

        let line_texts = self
            .inner
            .recognize_text(&input, &line_rects)
            .map_err(|err| OcrFailure::Recognition(format!("line recognition failed: {err}")))?;

        let mut lines = Vec::with_capacity(line_texts.len());
        for line in line_texts.iter().flatten() {
            let text = line.to_string();
            if !text.trim().is_empty() {
                lines.push(text);
            }
        }

        debug!(recognized_lines = lines.len(), "recognition complete");
        // ocrs exposes no per-word certainty; the word list stays empty
        // rather than carrying invented scores.
        Ok(RecognizedPage {
            lines,
            words: Vec::new(),
        })
    }
}
