// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job scheduler — runs extraction jobs off the interactive path.
//
// Architecture: submissions go to a dispatcher task that keeps one FIFO
// queue per job key (document + page) and starts at most one job per key at
// a time; started jobs acquire a slot from a semaphore sized to the worker
// pool before they transition to Running. Results travel back to the
// submitter over a oneshot channel, always from a worker task — the
// scheduler never re-enters the caller synchronously.
//
// Ordering guarantee: for jobs sharing a key, execution order equals
// submission order, and a job's outcome is delivered before the next job for
// that key starts (the worker sends the reply before telling the dispatcher
// the key is idle). Across different keys there is no ordering.
//
// Cancellation: a queued job is removed and resolves Cancelled without ever
// running. A running job has its cancel token set; engines that support
// cooperative cancellation abort early, otherwise the job runs to completion
// and its result is discarded.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::time::Duration;

use image::DynamicImage;
use lesewerk_core::config::EngineConfig;
use lesewerk_core::error::{LesewerkError, OcrFailure, Result};
use lesewerk_core::types::{CancelToken, ExtractionResult, JobId, JobKey, JobState};
use lesewerk_document::ocr::OcrCapability;
use lesewerk_document::preprocess::Preprocessor;
use tokio::sync::{Semaphore, mpsc, oneshot};
use tracing::{debug, info, instrument, warn};

use crate::job::{self, ExtractionRequest, JobInput};

/// Final outcome of a job, delivered through its [`JobHandle`].
#[derive(Debug)]
pub enum JobOutcome {
    Completed(ExtractionResult),
    Failed(LesewerkError),
    Cancelled,
}

impl JobOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Live job state shared between the scheduler and the handle.
#[derive(Clone, Debug)]
struct StateCell(Arc<AtomicU8>);

impl StateCell {
    fn new() -> Self {
        Self(Arc::new(AtomicU8::new(0)))
    }

    fn set(&self, state: JobState) {
        let value = match state {
            JobState::Queued => 0,
            JobState::Running => 1,
            JobState::Completed => 2,
            JobState::Failed => 3,
            JobState::Cancelled => 4,
        };
        self.0.store(value, Ordering::SeqCst);
    }

    fn get(&self) -> JobState {
        match self.0.load(Ordering::SeqCst) {
            0 => JobState::Queued,
            1 => JobState::Running,
            2 => JobState::Completed,
            3 => JobState::Failed,
            _ => JobState::Cancelled,
        }
    }
}

/// Caller-side handle to a submitted job.
///
/// Dropping the handle does not cancel the job; call [`cancel`](Self::cancel)
/// for that. `wait` consumes the handle and resolves when the outcome is
/// delivered.
#[derive(Debug)]
pub struct JobHandle {
    id: JobId,
    key: JobKey,
    state: StateCell,
    cancel: CancelToken,
    tx: mpsc::UnboundedSender<Msg>,
    rx: oneshot::Receiver<JobOutcome>,
}

impl JobHandle {
    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn key(&self) -> JobKey {
        self.key
    }

    /// Current state of the job.
    pub fn state(&self) -> JobState {
        self.state.get()
    }

    /// Request cancellation. Queued jobs never start; running jobs are
    /// aborted if the engine cooperates, otherwise their result is discarded
    /// on completion. Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
        let _ = self.tx.send(Msg::Cancel(self.id));
    }

    /// Wait for the job's outcome.
    pub async fn wait(self) -> JobOutcome {
        match self.rx.await {
            Ok(outcome) => outcome,
            Err(_) => JobOutcome::Failed(LesewerkError::SchedulerClosed),
        }
    }
}

/// Messages understood by the dispatcher task.
enum Msg {
    Submit(Box<QueuedJob>),
    Cancel(JobId),
    KeyIdle(JobKey),
    Shutdown(oneshot::Sender<()>),
}

struct QueuedJob {
    id: JobId,
    key: JobKey,
    request: ExtractionRequest,
    state: StateCell,
    cancel: CancelToken,
    reply: oneshot::Sender<JobOutcome>,
}

/// Shared context for the dispatcher and workers.
struct WorkerCtx {
    config: EngineConfig,
    ocr: Arc<dyn OcrCapability>,
    preprocessor: Preprocessor,
    semaphore: Arc<Semaphore>,
    tx: mpsc::UnboundedSender<Msg>,
    queued: Arc<AtomicUsize>,
}

/// Asynchronous extraction job scheduler.
///
/// Construct with an explicit [`EngineConfig`]; there is no global state.
/// Must be created inside a tokio runtime.
pub struct JobScheduler {
    tx: mpsc::UnboundedSender<Msg>,
    queued: Arc<AtomicUsize>,
    queue_depth: usize,
}

impl JobScheduler {
    pub fn new(
        config: EngineConfig,
        ocr: Arc<dyn OcrCapability>,
        preprocessor: Preprocessor,
    ) -> Self {
        let config = config.normalized();
        let (tx, rx) = mpsc::unbounded_channel();
        let queued = Arc::new(AtomicUsize::new(0));

        let worker_count = config.worker_count;
        let queue_depth = config.queue_depth;
        let ctx = Arc::new(WorkerCtx {
            semaphore: Arc::new(Semaphore::new(worker_count)),
            config,
            ocr,
            preprocessor,
            tx: tx.clone(),
            queued: queued.clone(),
        });

        tokio::spawn(dispatch(rx, ctx));

        info!(workers = worker_count, queue_depth, "job scheduler started");
        Self {
            tx,
            queued,
            queue_depth,
        }
    }

    /// Submit a job. Never blocks: the job is handed to the dispatcher and a
    /// handle is returned immediately.
    ///
    /// # Errors
    ///
    /// Fails fast with `QueueFull` when `queue_depth` jobs are already
    /// waiting, and with `SchedulerClosed` after shutdown.
    #[instrument(skip_all, fields(document = %request.document, page = ?request.input.page()))]
    pub fn submit(&self, request: ExtractionRequest) -> Result<JobHandle> {
        let depth = self.queue_depth;
        if self
            .queued
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |waiting| {
                (waiting < depth).then_some(waiting + 1)
            })
            .is_err()
        {
            return Err(LesewerkError::QueueFull { depth });
        }

        let id = JobId::new();
        let key = request.key();
        let state = StateCell::new();
        let cancel = CancelToken::new();
        let (reply, rx) = oneshot::channel();

        let job = Box::new(QueuedJob {
            id,
            key,
            request,
            state: state.clone(),
            cancel: cancel.clone(),
            reply,
        });

        if self.tx.send(Msg::Submit(job)).is_err() {
            self.queued.fetch_sub(1, Ordering::SeqCst);
            return Err(LesewerkError::SchedulerClosed);
        }

        info!(job_id = %id, "job submitted");
        Ok(JobHandle {
            id,
            key,
            state,
            cancel,
            tx: self.tx.clone(),
            rx,
        })
    }

    /// Number of jobs submitted but not yet running.
    pub fn queued_len(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }

    /// Stop accepting work and resolve every queued job as `Cancelled`.
    /// Running jobs get their cancel token set; their outcomes are still
    /// delivered (as `Cancelled`, since the flag is set).
    pub async fn shutdown(&self) {
        let (ack, rx) = oneshot::channel();
        if self.tx.send(Msg::Shutdown(ack)).is_ok() {
            let _ = rx.await;
        }
        info!("job scheduler shut down");
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

#[derive(Default)]
struct DispatchState {
    /// FIFO queue per key, for jobs not yet started.
    queues: HashMap<JobKey, VecDeque<Box<QueuedJob>>>,
    /// Key of every job currently sitting in `queues`.
    queued_index: HashMap<JobId, JobKey>,
    /// Keys with a started (dispatched) job.
    running: HashMap<JobKey, JobId>,
    /// Cancel tokens of started jobs.
    running_cancels: HashMap<JobId, CancelToken>,
}

async fn dispatch(mut rx: mpsc::UnboundedReceiver<Msg>, ctx: Arc<WorkerCtx>) {
    let mut state = DispatchState::default();

    while let Some(msg) = rx.recv().await {
        match msg {
            Msg::Submit(job) => {
                let key = job.key;
                state.queued_index.insert(job.id, key);
                state.queues.entry(key).or_default().push_back(job);
                pump(&mut state, &ctx, key);
            }
            Msg::Cancel(id) => {
                if let Some(key) = state.queued_index.remove(&id) {
                    if let Some(queue) = state.queues.get_mut(&key) {
                        if let Some(position) = queue.iter().position(|job| job.id == id) {
                            let job = queue.remove(position).expect("position is in range");
                            resolve_cancelled(job, &ctx);
                        }
                    }
                } else if let Some(cancel) = state.running_cancels.get(&id) {
                    cancel.cancel();
                }
                // Unknown ids already finished; nothing to do.
            }
            Msg::KeyIdle(key) => {
                if let Some(id) = state.running.remove(&key) {
                    state.running_cancels.remove(&id);
                }
                pump(&mut state, &ctx, key);
            }
            Msg::Shutdown(ack) => {
                for (_, queue) in state.queues.drain() {
                    for job in queue {
                        resolve_cancelled(job, &ctx);
                    }
                }
                state.queued_index.clear();
                for (_, cancel) in state.running_cancels.drain() {
                    cancel.cancel();
                }
                let _ = ack.send(());
                break;
            }
        }
    }

    // Channel closed without an explicit shutdown (scheduler and all handles
    // dropped): resolve whatever is still queued.
    for (_, queue) in state.queues.drain() {
        for job in queue {
            resolve_cancelled(job, &ctx);
        }
    }
    debug!("dispatcher exiting");
}

/// Start the next job for `key`, if any. At most one job per key is started
/// at a time; jobs cancelled while queued are resolved here without running.
fn pump(state: &mut DispatchState, ctx: &Arc<WorkerCtx>, key: JobKey) {
    if state.running.contains_key(&key) {
        return;
    }

    loop {
        let Some(queue) = state.queues.get_mut(&key) else {
            break;
        };
        let Some(job) = queue.pop_front() else {
            state.queues.remove(&key);
            break;
        };
        state.queued_index.remove(&job.id);

        if job.cancel.is_cancelled() {
            resolve_cancelled(job, ctx);
            continue;
        }

        state.running.insert(key, job.id);
        state.running_cancels.insert(job.id, job.cancel.clone());
        tokio::spawn(run_job(job, ctx.clone()));
        break;
    }
}

/// Resolve a job that never started as `Cancelled`.
fn resolve_cancelled(job: Box<QueuedJob>, ctx: &Arc<WorkerCtx>) {
    ctx.queued.fetch_sub(1, Ordering::SeqCst);
    job.state.set(JobState::Cancelled);
    debug!(job_id = %job.id, "queued job cancelled");
    let _ = job.reply.send(JobOutcome::Cancelled);
}

// ---------------------------------------------------------------------------
// Workers
// ---------------------------------------------------------------------------

async fn run_job(job: Box<QueuedJob>, ctx: Arc<WorkerCtx>) {
    let key = job.key;

    let Ok(permit) = ctx.semaphore.clone().acquire_owned().await else {
        // The semaphore is never closed while the scheduler lives; treat a
        // closed semaphore as shutdown.
        ctx.queued.fetch_sub(1, Ordering::SeqCst);
        job.state.set(JobState::Failed);
        let _ = job.reply.send(JobOutcome::Failed(LesewerkError::SchedulerClosed));
        let _ = ctx.tx.send(Msg::KeyIdle(key));
        return;
    };
    ctx.queued.fetch_sub(1, Ordering::SeqCst);

    // A cancellation that lands before the worker slot is free means the job
    // was still Queued — it must never run.
    if job.cancel.is_cancelled() {
        job.state.set(JobState::Cancelled);
        let _ = job.reply.send(JobOutcome::Cancelled);
        let _ = ctx.tx.send(Msg::KeyIdle(key));
        return;
    }

    job.state.set(JobState::Running);
    debug!(job_id = %job.id, "job running");

    let outcome = execute(&job, &ctx).await;

    // Discard-on-completion: when the owner cancelled mid-run and the engine
    // did not (or could not) abort, the produced result is dropped. A
    // deadline overrun keeps its timeout error — the token was tripped by
    // the watchdog, not the owner.
    let outcome = match outcome {
        timeout @ JobOutcome::Failed(LesewerkError::Ocr(OcrFailure::Timeout(_))) => timeout,
        _ if job.cancel.is_cancelled() => JobOutcome::Cancelled,
        other => other,
    };

    match &outcome {
        JobOutcome::Completed(result) => {
            job.state.set(JobState::Completed);
            info!(job_id = %job.id, lines = result.lines.len(), "job completed");
        }
        JobOutcome::Failed(err) => {
            job.state.set(JobState::Failed);
            warn!(job_id = %job.id, %err, "job failed");
        }
        JobOutcome::Cancelled => {
            job.state.set(JobState::Cancelled);
            info!(job_id = %job.id, "job cancelled");
        }
    }

    // Reply first, then free the key: this orders outcome delivery before
    // the next same-key job can start.
    let _ = job.reply.send(outcome);
    let _ = ctx.tx.send(Msg::KeyIdle(key));

    drop(permit);
}

/// Run one job: render (PDF inputs), then preprocess + recognize on the
/// blocking pool under the configured deadline.
async fn execute(job: &QueuedJob, ctx: &Arc<WorkerCtx>) -> JobOutcome {
    let request = &job.request;

    let raster: Arc<DynamicImage> = match &request.input {
        JobInput::Raster(image) => image.clone(),
        JobInput::PdfPage { handle, index } => {
            let dpi = request.dpi.unwrap_or(ctx.config.render_dpi);
            match handle.render_page(*index, dpi, &job.cancel).await {
                Ok(image) => Arc::new(image),
                Err(err) => return JobOutcome::Failed(err),
            }
        }
    };

    if job.cancel.is_cancelled() {
        return JobOutcome::Cancelled;
    }

    let preprocessor = ctx.preprocessor.clone();
    let ocr = ctx.ocr.clone();
    let profile = request.profile.clone();
    let options = request.options.clone();
    let cancel = job.cancel.clone();
    let page_index = request.input.page();

    let work = tokio::task::spawn_blocking(move || {
        job::run(
            &preprocessor,
            ocr.as_ref(),
            &raster,
            &profile,
            &options,
            &cancel,
            page_index,
        )
    });

    let deadline = Duration::from_millis(ctx.config.ocr_timeout_ms);
    match tokio::time::timeout(deadline, work).await {
        Ok(Ok(Ok(result))) => JobOutcome::Completed(result),
        Ok(Ok(Err(err))) => JobOutcome::Failed(err),
        Ok(Err(join_err)) => JobOutcome::Failed(LesewerkError::Internal(format!(
            "extraction task panicked: {join_err}"
        ))),
        Err(_elapsed) => {
            // Trip the token so a cooperating engine stops the orphaned
            // blocking work; its eventual result is dropped either way.
            job.cancel.cancel();
            JobOutcome::Failed(LesewerkError::Ocr(OcrFailure::Timeout(
                ctx.config.ocr_timeout_ms,
            )))
        }
    }
}
