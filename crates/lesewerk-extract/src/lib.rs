// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// lesewerk-extract — Extraction jobs and the asynchronous job scheduler.
// This crate bridges between the document layer (rasters, PDF pages, OCR
// capability) and the callers that want text back without blocking on it.

pub mod job;
pub mod postprocess;
pub mod scheduler;

pub use job::{ExtractionRequest, JobInput};
pub use scheduler::{JobHandle, JobOutcome, JobScheduler};

use lesewerk_core::error::Result;
use lesewerk_core::types::RecognitionOptions;
use lesewerk_document::Document;
use lesewerk_document::preprocess::PreprocessingProfile;
use tracing::instrument;

/// Outcome of one page of a whole-document extraction.
#[derive(Debug)]
pub struct PageOutcome {
    /// 0-based page index.
    pub page: u32,
    pub outcome: JobOutcome,
}

/// Extract every page of a document, one job per page.
///
/// Outcomes are reported per page: a page that fails (render error, OCR
/// failure) does not abort its siblings, and a rejected submission
/// (`QueueFull`) is recorded as that page's failure. Pages of the same
/// document are serialized by the scheduler, so results arrive in page
/// order.
#[instrument(skip_all, fields(document = %document.id(), name = document.name()))]
pub async fn extract_document(
    scheduler: &JobScheduler,
    document: &Document,
    profile: &PreprocessingProfile,
    options: &RecognitionOptions,
) -> Result<Vec<PageOutcome>> {
    let page_count = document.page_count()?;

    let mut submissions = Vec::with_capacity(page_count as usize);
    for page in 0..page_count {
        let request =
            ExtractionRequest::for_page(document, page, profile.clone(), options.clone())?;
        submissions.push((page, scheduler.submit(request)));
    }

    let mut outcomes = Vec::with_capacity(submissions.len());
    for (page, submission) in submissions {
        let outcome = match submission {
            Ok(handle) => handle.wait().await,
            Err(err) => JobOutcome::Failed(err),
        };
        outcomes.push(PageOutcome { page, outcome });
    }
    Ok(outcomes)
}
