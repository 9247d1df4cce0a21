// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF page source — opens documents and renders pages on demand.
//
// All rasterization runs on one dedicated worker thread that owns the
// backend. A document handle is a single-writer resource: renders against
// any handle of this source are serialized by construction, including
// renders of different pages, because they all pass through the same thread.
// Callers interact through async request/reply plumbing and never block.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use image::DynamicImage;
use lesewerk_core::error::{LesewerkError, Result};
use lesewerk_core::types::CancelToken;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument, warn};

use super::backend::RenderBackend;

/// Requests handled by the rasterization thread.
enum PdfRequest {
    Open {
        path: PathBuf,
        reply: oneshot::Sender<Result<(u64, u32)>>,
    },
    Render {
        handle: u64,
        index: u32,
        dpi: f32,
        cancel: CancelToken,
        reply: oneshot::Sender<Result<DynamicImage>>,
    },
    Close {
        handle: u64,
    },
}

/// Lazy, per-page PDF rasterization behind a dedicated worker thread.
///
/// Dropping the source (and every handle opened from it) stops the thread.
pub struct PdfPageSource {
    tx: mpsc::UnboundedSender<PdfRequest>,
}

impl PdfPageSource {
    /// Start a page source whose backend is built by `factory` on the worker
    /// thread itself. Backends may be `!Send`; only the factory crosses
    /// threads.
    ///
    /// A factory failure is not fatal here — every subsequent request fails
    /// with the factory's error instead, so a missing rasterization library
    /// surfaces on first use, per request.
    pub fn with_backend<B, F>(factory: F) -> Self
    where
        B: RenderBackend + 'static,
        F: FnOnce() -> Result<B> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();

        std::thread::Builder::new()
            .name("lesewerk-pdf-render".into())
            .spawn(move || match factory() {
                Ok(backend) => serve(backend, rx),
                Err(err) => serve_unavailable(err, rx),
            })
            .expect("failed to spawn PDF render thread");

        Self { tx }
    }

    /// A page source rendering through the system pdfium library.
    #[cfg(feature = "pdfium")]
    pub fn pdfium() -> Self {
        Self::with_backend(super::backend::PdfiumBackend::new)
    }

    /// Open a PDF and return a handle to it.
    ///
    /// The page count is read once here and cached on the handle.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(&self, path: impl AsRef<Path>) -> Result<PdfHandle> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(PdfRequest::Open {
                path: path.as_ref().to_path_buf(),
                reply,
            })
            .map_err(|_| renderer_stopped())?;

        let (id, pages) = rx.await.map_err(|_| renderer_stopped())??;
        info!(pages, "pdf document opened");

        Ok(PdfHandle {
            shared: Arc::new(HandleShared {
                id,
                pages,
                path: path.as_ref().to_path_buf(),
                tx: self.tx.clone(),
                closed: AtomicBool::new(false),
            }),
        })
    }
}

/// An open PDF document.
///
/// Cloning yields another reference to the same underlying document entry.
/// `close` releases the entry on the worker thread; afterwards every
/// operation fails with `HandleClosed`. Dropping the last clone closes
/// implicitly.
#[derive(Clone, Debug)]
pub struct PdfHandle {
    shared: Arc<HandleShared>,
}

#[derive(Debug)]
struct HandleShared {
    id: u64,
    pages: u32,
    path: PathBuf,
    tx: mpsc::UnboundedSender<PdfRequest>,
    closed: AtomicBool,
}

impl PdfHandle {
    /// Number of pages in the document.
    pub fn page_count(&self) -> Result<u32> {
        if self.is_closed() {
            return Err(LesewerkError::HandleClosed);
        }
        Ok(self.shared.pages)
    }

    /// Render one page to a raster.
    ///
    /// `index` is 0-based; out-of-range indices fail with `PageIndex`.
    /// Rendering is lazy and on demand — nothing is rasterized up front.
    /// `dpi` is uncapped; higher resolutions cost proportionally more memory
    /// and time. The cancel token is honoured up to the point the render
    /// starts; a render already in progress runs to completion.
    #[instrument(skip(self, cancel), fields(path = %self.shared.path.display()))]
    pub async fn render_page(
        &self,
        index: u32,
        dpi: f32,
        cancel: &CancelToken,
    ) -> Result<DynamicImage> {
        if self.is_closed() {
            return Err(LesewerkError::HandleClosed);
        }
        if index >= self.shared.pages {
            return Err(LesewerkError::PageIndex {
                index,
                page_count: self.shared.pages,
            });
        }
        if !dpi.is_finite() || dpi <= 0.0 {
            return Err(LesewerkError::Render(format!(
                "target dpi must be positive, got {dpi}"
            )));
        }

        let (reply, rx) = oneshot::channel();
        self.shared
            .tx
            .send(PdfRequest::Render {
                handle: self.shared.id,
                index,
                dpi,
                cancel: cancel.clone(),
                reply,
            })
            .map_err(|_| renderer_stopped())?;

        rx.await.map_err(|_| renderer_stopped())?
    }

    /// Release the document entry. Idempotent; subsequent operations on any
    /// clone of this handle fail with `HandleClosed`.
    pub fn close(&self) {
        if !self.shared.closed.swap(true, Ordering::SeqCst) {
            let _ = self.shared.tx.send(PdfRequest::Close {
                handle: self.shared.id,
            });
            debug!(path = %self.shared.path.display(), "pdf handle closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    pub fn path(&self) -> &Path {
        &self.shared.path
    }
}

impl Drop for HandleShared {
    fn drop(&mut self) {
        if !self.closed.load(Ordering::SeqCst) {
            let _ = self.tx.send(PdfRequest::Close { handle: self.id });
        }
    }
}

fn renderer_stopped() -> LesewerkError {
    LesewerkError::Render("rasterization thread is not running".into())
}

/// Worker loop: owns the backend and the open-document table.
fn serve<B: RenderBackend>(mut backend: B, mut rx: mpsc::UnboundedReceiver<PdfRequest>) {
    let mut documents: HashMap<u64, PathBuf> = HashMap::new();
    let mut next_id: u64 = 1;

    while let Some(request) = rx.blocking_recv() {
        match request {
            PdfRequest::Open { path, reply } => {
                let outcome = backend.open(&path).map(|pages| {
                    let id = next_id;
                    next_id += 1;
                    documents.insert(id, path);
                    (id, pages)
                });
                let _ = reply.send(outcome);
            }
            PdfRequest::Render {
                handle,
                index,
                dpi,
                cancel,
                reply,
            } => {
                let outcome = match documents.get(&handle) {
                    None => Err(LesewerkError::HandleClosed),
                    Some(_) if cancel.is_cancelled() => {
                        Err(LesewerkError::Render("render cancelled before start".into()))
                    }
                    Some(path) => backend.render(path, index, dpi),
                };
                let _ = reply.send(outcome);
            }
            PdfRequest::Close { handle } => {
                documents.remove(&handle);
            }
        }
    }

    debug!("pdf render thread exiting");
}

/// Degraded loop used when the backend factory failed: every request is
/// answered with the original construction error.
fn serve_unavailable(err: LesewerkError, mut rx: mpsc::UnboundedReceiver<PdfRequest>) {
    warn!(%err, "pdf rasterization backend unavailable");
    let detail = err.to_string();

    while let Some(request) = rx.blocking_recv() {
        match request {
            PdfRequest::Open { reply, .. } => {
                let _ = reply.send(Err(LesewerkError::DocumentOpen(detail.clone())));
            }
            PdfRequest::Render { reply, .. } => {
                let _ = reply.send(Err(LesewerkError::Render(detail.clone())));
            }
            PdfRequest::Close { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use std::sync::Mutex;
    use std::sync::atomic::AtomicU32;

    /// Synthetic backend: page counts configured per path stem, renders
    /// blank pages, and records how many renders ran.
    struct FakeBackend {
        pages_by_stem: HashMap<String, u32>,
        renders: Arc<AtomicU32>,
        log: Arc<Mutex<Vec<u32>>>,
    }

    impl FakeBackend {
        fn new(pages_by_stem: HashMap<String, u32>) -> (Self, Arc<AtomicU32>, Arc<Mutex<Vec<u32>>>) {
            let renders = Arc::new(AtomicU32::new(0));
            let log = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    pages_by_stem,
                    renders: renders.clone(),
                    log: log.clone(),
                },
                renders,
                log,
            )
        }

        fn stem(path: &Path) -> String {
            path.file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string()
        }
    }

    impl RenderBackend for FakeBackend {
        fn open(&mut self, path: &Path) -> Result<u32> {
            self.pages_by_stem
                .get(&Self::stem(path))
                .copied()
                .ok_or_else(|| LesewerkError::DocumentOpen(format!("{}", path.display())))
        }

        fn render(&mut self, _path: &Path, index: u32, _dpi: f32) -> Result<DynamicImage> {
            self.renders.fetch_add(1, Ordering::SeqCst);
            self.log.lock().expect("log lock").push(index);
            Ok(DynamicImage::ImageLuma8(GrayImage::from_pixel(
                20,
                30,
                Luma([255u8]),
            )))
        }
    }

    fn source_with_pages(pages: &[(&str, u32)]) -> PdfPageSource {
        let table: HashMap<String, u32> = pages
            .iter()
            .map(|(stem, count)| (stem.to_string(), *count))
            .collect();
        PdfPageSource::with_backend(move || Ok(FakeBackend::new(table).0))
    }

    #[tokio::test]
    async fn open_reports_page_count() {
        let source = source_with_pages(&[("report", 3)]);
        let handle = source.open("report.pdf").await.expect("open");
        assert_eq!(handle.page_count().expect("page count"), 3);
    }

    #[tokio::test]
    async fn open_missing_document_fails() {
        let source = source_with_pages(&[("report", 3)]);
        let err = source.open("absent.pdf").await.expect_err("must fail");
        assert!(matches!(err, LesewerkError::DocumentOpen(_)));
    }

    #[tokio::test]
    async fn render_validates_the_page_index() {
        // A 3-page document: index 2 renders, index 3 is out of range.
        let source = source_with_pages(&[("report", 3)]);
        let handle = source.open("report.pdf").await.expect("open");
        let cancel = CancelToken::new();

        let page = handle.render_page(2, 300.0, &cancel).await.expect("page 2");
        assert_eq!((page.width(), page.height()), (20, 30));

        let err = handle
            .render_page(3, 300.0, &cancel)
            .await
            .expect_err("page 3 out of range");
        assert!(
            matches!(err, LesewerkError::PageIndex { index: 3, page_count: 3 }),
            "{err}"
        );
    }

    #[tokio::test]
    async fn render_rejects_non_positive_dpi() {
        let source = source_with_pages(&[("report", 1)]);
        let handle = source.open("report.pdf").await.expect("open");
        let err = handle
            .render_page(0, 0.0, &CancelToken::new())
            .await
            .expect_err("zero dpi");
        assert!(matches!(err, LesewerkError::Render(_)));
    }

    #[tokio::test]
    async fn closed_handle_rejects_operations() {
        let source = source_with_pages(&[("report", 2)]);
        let handle = source.open("report.pdf").await.expect("open");

        handle.close();
        handle.close(); // idempotent

        assert!(matches!(
            handle.page_count(),
            Err(LesewerkError::HandleClosed)
        ));
        let err = handle
            .render_page(0, 300.0, &CancelToken::new())
            .await
            .expect_err("render after close");
        assert!(matches!(err, LesewerkError::HandleClosed));
    }

    #[tokio::test]
    async fn cancelled_render_never_reaches_the_backend() {
        let source = source_with_pages(&[("report", 2)]);
        let handle = source.open("report.pdf").await.expect("open");

        let cancel = CancelToken::new();
        cancel.cancel();
        let err = handle
            .render_page(0, 300.0, &cancel)
            .await
            .expect_err("cancelled render");
        assert!(matches!(err, LesewerkError::Render(_)));
    }

    #[tokio::test]
    async fn renders_are_lazy_and_on_demand() {
        let table: HashMap<String, u32> = [("report".to_string(), 5)].into();
        let (backend, renders, _log) = FakeBackend::new(table);
        let source = PdfPageSource::with_backend(move || Ok(backend));

        let handle = source.open("report.pdf").await.expect("open");
        assert_eq!(renders.load(Ordering::SeqCst), 0, "open must not rasterize");

        handle
            .render_page(1, 150.0, &CancelToken::new())
            .await
            .expect("render");
        assert_eq!(renders.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_renders_are_serialized_in_request_order() {
        let table: HashMap<String, u32> = [("report".to_string(), 4)].into();
        let (backend, _renders, log) = FakeBackend::new(table);
        let source = PdfPageSource::with_backend(move || Ok(backend));
        let handle = source.open("report.pdf").await.expect("open");

        let cancel = CancelToken::new();
        let (a, b, c) = tokio::join!(
            handle.render_page(0, 72.0, &cancel),
            handle.render_page(1, 72.0, &cancel),
            handle.render_page(2, 72.0, &cancel),
        );
        a.expect("page 0");
        b.expect("page 1");
        c.expect("page 2");

        // One worker thread serves all requests, so the backend saw them
        // strictly one at a time, in submission order.
        assert_eq!(*log.lock().expect("log lock"), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn backend_factory_failure_surfaces_per_request() {
        let source = PdfPageSource::with_backend(|| -> Result<FakeBackend> {
            Err(LesewerkError::Render("no rasterization library".into()))
        });

        let err = source.open("report.pdf").await.expect_err("open must fail");
        assert!(matches!(err, LesewerkError::DocumentOpen(_)), "{err}");
        assert!(err.to_string().contains("no rasterization library"));
    }
}
