// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR adapter for the Tesseract engine via `leptess`.
//
// Tesseract reports per-word confidence through its TSV renderer, which this
// adapter parses into `WordConfidence` entries. Language hints are joined
// Tesseract-style ("eng+fra"); each language needs its `.traineddata` file
// installed.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat};
use leptess::{LepTess, Variable};
use lesewerk_core::error::OcrFailure;
use lesewerk_core::types::{CancelToken, RecognitionOptions, RecognizedPage, WordConfidence};
use tracing::{debug, instrument, warn};

use super::OcrCapability;

/// Default language when a request carries no hints.
const DEFAULT_LANGUAGE: &str = "eng";

/// Tesseract-backed OCR capability.
///
/// A fresh Tesseract instance is created per recognition call: `LepTess` is
/// not shareable across threads, and instance setup is cheap next to
/// recognizing a page.
pub struct TesseractEngine {
    /// Explicit tessdata directory; `None` uses Tesseract's own lookup.
    datapath: Option<String>,
    /// Resolution reported to Tesseract for images without DPI metadata.
    source_dpi: i32,
}

impl TesseractEngine {
    pub fn new() -> Self {
        Self {
            datapath: None,
            source_dpi: 300,
        }
    }

    /// Engine reading language data from an explicit tessdata directory.
    pub fn with_datapath(datapath: impl Into<String>) -> Self {
        Self {
            datapath: Some(datapath.into()),
            source_dpi: 300,
        }
    }

    fn language_for(options: &RecognitionOptions) -> String {
        if options.language_hints.is_empty() {
            DEFAULT_LANGUAGE.to_string()
        } else {
            options.language_hints.join("+")
        }
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrCapability for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    fn recognize(
        &self,
        image: &DynamicImage,
        options: &RecognitionOptions,
        cancel: &CancelToken,
    ) -> std::result::Result<RecognizedPage, OcrFailure> {
        if cancel.is_cancelled() {
            return Err(OcrFailure::Recognition("recognition cancelled".into()));
        }

        let language = Self::language_for(options);
        let mut engine =
            LepTess::new(self.datapath.as_deref(), &language).map_err(|err| {
                // Initialisation fails both when the engine itself is absent
                // and when a requested language pack is missing; a custom
                // hint makes the language the likelier culprit.
                if options.language_hints.is_empty() {
                    OcrFailure::EngineUnavailable(format!("tesseract init failed: {err}"))
                } else {
                    OcrFailure::UnsupportedLanguage(format!("{language}: {err}"))
                }
            })?;

        if let Err(err) = engine.set_variable(Variable::PreserveInterwordSpaces, "1") {
            warn!(%err, "could not set preserve_interword_spaces");
        }

        // Hand the raster over as in-memory PNG; Tesseract reads it through
        // Leptonica.
        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|err| OcrFailure::Recognition(format!("raster encoding failed: {err}")))?;
        engine
            .set_image_from_mem(&png)
            .map_err(|err| OcrFailure::Recognition(format!("failed to load raster: {err}")))?;
        engine.set_source_resolution(self.source_dpi);

        let text = engine
            .get_utf8_text()
            .map_err(|err| OcrFailure::Recognition(format!("recognition failed: {err}")))?;

        let lines: Vec<String> = text.lines().map(str::to_owned).collect();

        // Word confidences come from the TSV renderer; a failure there
        // degrades to an empty word list rather than failing the request.
        let words = match engine.get_tsv_text(0) {
            Ok(tsv) => parse_tsv_words(&tsv),
            Err(err) => {
                warn!(%err, "tsv rendering failed; word confidences unavailable");
                Vec::new()
            }
        };

        debug!(
            line_count = lines.len(),
            word_count = words.len(),
            language = %language,
            "recognition complete"
        );
        Ok(RecognizedPage { lines, words })
    }
}

/// Parse Tesseract TSV output into per-word confidences.
///
/// TSV columns: level, page_num, block_num, par_num, line_num, word_num,
/// left, top, width, height, conf, text. Word rows have level 5 and a
/// non-negative confidence in 0..=100.
fn parse_tsv_words(tsv: &str) -> Vec<WordConfidence> {
    let mut words = Vec::new();
    for row in tsv.lines() {
        let fields: Vec<&str> = row.split('\t').collect();
        if fields.len() != 12 || fields[0] != "5" {
            continue;
        }
        let Ok(conf) = fields[10].parse::<f32>() else {
            continue;
        };
        let text = fields[11].trim();
        if conf < 0.0 || text.is_empty() {
            continue;
        }
        words.push(WordConfidence {
            text: text.to_string(),
            confidence: conf / 100.0,
        });
    }
    words
}
