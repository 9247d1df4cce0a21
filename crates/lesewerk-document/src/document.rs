// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document — a loaded input: either a decoded raster or an open PDF.
//
// The caller owns the lifecycle: documents are created on load and released
// by `close` (PDF) or by dropping the value. The raster of an image document
// is shared behind an `Arc` and never mutated, so any number of jobs can
// read it concurrently.

use std::path::Path;
use std::sync::Arc;

use image::DynamicImage;
use lesewerk_core::error::Result;
use lesewerk_core::types::DocumentId;
use tracing::{info, instrument};

use crate::pdf::{PdfHandle, PdfPageSource};
use crate::raster;

/// The payload of a document.
#[derive(Clone, Debug)]
pub enum DocumentContent {
    /// A decoded raster image (PNG, JPEG, BMP, TIFF input).
    Raster(Arc<DynamicImage>),
    /// An open PDF with lazy per-page raster access.
    Pdf(PdfHandle),
}

/// A loaded input document.
#[derive(Clone, Debug)]
pub struct Document {
    id: DocumentId,
    name: String,
    content: DocumentContent,
}

impl Document {
    /// Open a file, dispatching on the format boundary: raster formats are
    /// decoded eagerly, PDFs are opened through the page source. Any other
    /// format fails with `UnsupportedFormat` before the pipeline is entered.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>, pdf_source: &PdfPageSource) -> Result<Self> {
        let path = path.as_ref();
        let format = raster::detect_format(path)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document")
            .to_string();

        let content = if format.is_pdf() {
            DocumentContent::Pdf(pdf_source.open(path).await?)
        } else {
            DocumentContent::Raster(Arc::new(raster::load_raster(path)?))
        };

        let document = Self {
            id: DocumentId::new(),
            name,
            content,
        };
        info!(id = %document.id, format = format.mime_type(), "document opened");
        Ok(document)
    }

    /// Wrap an already-decoded raster, validating it at the boundary.
    pub fn from_raster(image: DynamicImage, name: impl Into<String>) -> Result<Self> {
        raster::ensure_supported(&image)?;
        Ok(Self {
            id: DocumentId::new(),
            name: name.into(),
            content: DocumentContent::Raster(Arc::new(image)),
        })
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &DocumentContent {
        &self.content
    }

    pub fn is_pdf(&self) -> bool {
        matches!(self.content, DocumentContent::Pdf(_))
    }

    /// Number of extractable pages: 1 for a raster, the page count for a PDF.
    pub fn page_count(&self) -> Result<u32> {
        match &self.content {
            DocumentContent::Raster(_) => Ok(1),
            DocumentContent::Pdf(handle) => handle.page_count(),
        }
    }

    /// Release underlying resources. For PDFs this closes the handle;
    /// rasters are freed when the last reference drops.
    pub fn close(&self) {
        if let DocumentContent::Pdf(handle) = &self.content {
            handle.close();
        }
    }
}
