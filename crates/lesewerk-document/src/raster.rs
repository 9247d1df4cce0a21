// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster input boundary — format detection, decoding, and validation.
//
// Anything that enters the pipeline passes through here first. Unknown file
// types are rejected before a decoder runs; empty or malformed files surface
// as `InvalidImage`, never as a crash or an empty raster.

use std::path::Path;

use image::DynamicImage;
use lesewerk_core::error::{LesewerkError, Result};
use lesewerk_core::types::InputFormat;
use tracing::{debug, info, instrument};

/// Detect the input format of a file from its extension.
///
/// Fails with `UnsupportedFormat` for anything that is not PNG, JPEG, BMP,
/// TIFF, or PDF.
pub fn detect_format(path: impl AsRef<Path>) -> Result<InputFormat> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();

    InputFormat::from_extension(ext).ok_or_else(|| {
        LesewerkError::UnsupportedFormat(if ext.is_empty() {
            format!("{} (no file extension)", path.display())
        } else {
            ext.to_string()
        })
    })
}

/// Load and decode a raster image file.
///
/// The format boundary is checked before any bytes are read; PDF files are
/// rejected here because they go through the page source instead.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_raster(path: impl AsRef<Path>) -> Result<DynamicImage> {
    let path = path.as_ref();
    let format = detect_format(path)?;
    if format.is_pdf() {
        return Err(LesewerkError::UnsupportedFormat(
            "PDF input must be opened through the PDF page source".into(),
        ));
    }

    let bytes = std::fs::read(path)?;
    let image = decode_raster(&bytes)?;
    info!(
        width = image.width(),
        height = image.height(),
        format = format.mime_type(),
        "raster loaded"
    );
    Ok(image)
}

/// Decode raster bytes already in memory.
#[instrument(skip(bytes), fields(bytes_len = bytes.len()))]
pub fn decode_raster(bytes: &[u8]) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(LesewerkError::InvalidImage("file is empty".into()));
    }

    let image = image::load_from_memory(bytes)
        .map_err(|err| LesewerkError::InvalidImage(format!("failed to decode image: {err}")))?;

    ensure_supported(&image)?;
    debug!(
        width = image.width(),
        height = image.height(),
        "raster decoded from bytes"
    );
    Ok(image)
}

/// Verify that a raster is usable by the pipeline: non-zero area, 8-bit
/// colour depth.
pub fn ensure_supported(image: &DynamicImage) -> Result<()> {
    if image.width() == 0 || image.height() == 0 {
        return Err(LesewerkError::InvalidImage(format!(
            "zero-area image ({}x{})",
            image.width(),
            image.height()
        )));
    }

    match image {
        DynamicImage::ImageLuma8(_)
        | DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageRgb8(_)
        | DynamicImage::ImageRgba8(_) => Ok(()),
        other => Err(LesewerkError::InvalidImage(format!(
            "unsupported colour depth: {:?}",
            other.color()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn detect_format_accepts_known_extensions() {
        assert_eq!(detect_format("scan.png").expect("png"), InputFormat::Png);
        assert_eq!(detect_format("scan.JPG").expect("jpg"), InputFormat::Jpeg);
        assert_eq!(detect_format("doc.pdf").expect("pdf"), InputFormat::Pdf);
    }

    #[test]
    fn detect_format_rejects_unknown_extensions() {
        let err = detect_format("notes.docx").expect_err("docx must be rejected");
        assert!(matches!(err, LesewerkError::UnsupportedFormat(_)));

        let err = detect_format("no_extension").expect_err("missing extension");
        assert!(matches!(err, LesewerkError::UnsupportedFormat(_)));
    }

    #[test]
    fn empty_file_is_invalid_image() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("empty.png");
        std::fs::write(&path, b"").expect("write empty file");

        let err = load_raster(&path).expect_err("empty file must fail");
        assert!(matches!(err, LesewerkError::InvalidImage(_)), "{err}");
    }

    #[test]
    fn corrupted_file_is_invalid_image() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("garbage.png");
        std::fs::write(&path, b"this is not a png").expect("write garbage");

        let err = load_raster(&path).expect_err("garbage must fail");
        assert!(matches!(err, LesewerkError::InvalidImage(_)), "{err}");
    }

    #[test]
    fn valid_png_round_trips_through_the_boundary() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tiny.png");

        let img = GrayImage::from_pixel(12, 8, Luma([200u8]));
        img.save(&path).expect("save png");

        let loaded = load_raster(&path).expect("load png");
        assert_eq!(loaded.width(), 12);
        assert_eq!(loaded.height(), 8);
    }

    #[test]
    fn zero_area_raster_is_rejected() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(0, 0));
        let err = ensure_supported(&img).expect_err("zero area must fail");
        assert!(matches!(err, LesewerkError::InvalidImage(_)));
    }

    #[test]
    fn deep_colour_raster_is_rejected() {
        let img = DynamicImage::ImageLuma16(image::ImageBuffer::new(4, 4));
        let err = ensure_supported(&img).expect_err("16-bit must fail");
        assert!(matches!(err, LesewerkError::InvalidImage(_)));
    }

    #[test]
    fn missing_file_surfaces_as_io_error() {
        let err = load_raster("/nonexistent/path/scan.png").expect_err("missing file");
        assert!(matches!(err, LesewerkError::Io(_)));
    }
}
