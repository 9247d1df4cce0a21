// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF layer: page source, handles, and rasterization backends.

pub mod backend;
pub mod source;

pub use backend::RenderBackend;
pub use source::{PdfHandle, PdfPageSource};

#[cfg(feature = "pdfium")]
pub use backend::PdfiumBackend;
