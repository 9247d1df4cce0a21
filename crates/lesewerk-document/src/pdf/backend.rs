// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rasterization backends for the PDF page source.
//
// The page source invokes a backend for exactly two things: opening a
// document (to learn its page count and confirm it is readable) and
// rendering one page to a raster at a requested resolution. Everything else
// — handle bookkeeping, index validation, serialization — lives in the page
// source itself, which keeps backends small and lets tests run against a
// synthetic one.

use std::path::Path;

use image::DynamicImage;
use lesewerk_core::error::Result;

/// A PDF rasterization capability.
///
/// Implementations are driven from a single dedicated thread, so they may be
/// `!Sync` and hold thread-bound library state. `index` is 0-based and has
/// already been range-checked by the page source.
pub trait RenderBackend {
    /// Open the document at `path` and return its page count.
    ///
    /// Fails with `DocumentOpen` for missing, corrupt, or password-protected
    /// files.
    fn open(&mut self, path: &Path) -> Result<u32>;

    /// Render one page to a raster at the given resolution.
    ///
    /// `dpi` is uncapped: higher values improve OCR accuracy at a
    /// proportional memory and time cost, which is the caller's tradeoff to
    /// make.
    fn render(&mut self, path: &Path, index: u32, dpi: f32) -> Result<DynamicImage>;
}

#[cfg(feature = "pdfium")]
pub use pdfium_backend::PdfiumBackend;

#[cfg(feature = "pdfium")]
mod pdfium_backend {
    use super::*;

    use lesewerk_core::error::LesewerkError;
    use pdfium_render::prelude::*;
    use tracing::{debug, info};

    /// Backend rendering through the system pdfium library.
    ///
    /// pdfium is not thread-safe, which is why the page source confines the
    /// backend to one thread. Documents are reopened per call rather than
    /// cached, so the backend holds no state that borrows from the library
    /// instance; pdfium parses lazily, making the reopen cheap relative to
    /// rasterization.
    pub struct PdfiumBackend {
        pdfium: Pdfium,
    }

    impl PdfiumBackend {
        /// Bind to the pdfium library installed on the system.
        pub fn new() -> Result<Self> {
            let bindings = Pdfium::bind_to_system_library().map_err(|err| {
                LesewerkError::Render(format!("pdfium library not available: {err}"))
            })?;
            info!("pdfium backend initialised");
            Ok(Self {
                pdfium: Pdfium::new(bindings),
            })
        }
    }

    impl RenderBackend for PdfiumBackend {
        fn open(&mut self, path: &Path) -> Result<u32> {
            let document = self.pdfium.load_pdf_from_file(&path, None).map_err(|err| {
                LesewerkError::DocumentOpen(format!("{}: {}", path.display(), err))
            })?;
            let pages = document.pages().len() as u32;
            debug!(path = %path.display(), pages, "pdf opened");
            Ok(pages)
        }

        fn render(&mut self, path: &Path, index: u32, dpi: f32) -> Result<DynamicImage> {
            let document = self.pdfium.load_pdf_from_file(&path, None).map_err(|err| {
                LesewerkError::DocumentOpen(format!("{}: {}", path.display(), err))
            })?;

            let page = document.pages().get(index as u16).map_err(|err| {
                LesewerkError::Render(format!("page {index} of {}: {}", path.display(), err))
            })?;

            // Page geometry is in points (1/72 inch); scale to the requested
            // resolution.
            let width_px = (page.width().value / 72.0 * dpi).round().max(1.0) as i32;
            let render_config = PdfRenderConfig::new().set_target_width(width_px);

            let bitmap = page.render_with_config(&render_config).map_err(|err| {
                LesewerkError::Render(format!("page {index} of {}: {}", path.display(), err))
            })?;

            debug!(page = index, width_px, dpi, "page rendered");
            Ok(bitmap.as_image())
        }
    }
}
