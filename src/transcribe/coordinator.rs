//! Orchestration of transcription jobs against the worker boundary.
//!
//! The coordinator owns the worker handle exclusively and runs at most one
//! job at a time. Each job gets an absolute deadline; worker events are
//! translated into a single `Result<String>` for the caller. When the
//! deadline expires the job's cancel token is fired, the caller sees
//! `Timeout`, and the worker is torn down and respawned — a force-aborted
//! worker's state is considered unrecoverable, and the respawn keeps later
//! jobs from running against it.

use crate::audio::encoding::AudioArtifact;
use crate::defaults;
use crate::error::{CapscribeError, Result};
use crate::transcribe::model::ModelFactory;
use crate::transcribe::protocol::{CancelToken, WorkerEvent};
use crate::transcribe::worker::WorkerHandle;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// Status updates emitted while a job is in flight.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptionStatus {
    /// One-time model warm-up has begun.
    LoadingModel,
    /// Warm-up progress fraction in [0, 1].
    ModelProgress { fraction: f32 },
    /// Job running against the model.
    Transcribing,
    /// Terminal: text produced.
    Completed,
    /// Terminal: the worker reported a failure.
    Failed,
    /// Terminal: deadline expired; the worker is being respawned.
    TimedOut,
    /// Terminal: the job was cancelled.
    Cancelled,
}

impl std::fmt::Display for TranscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            TranscriptionStatus::LoadingModel => "Loading speech model...",
            TranscriptionStatus::ModelProgress { .. } => "Loading speech model",
            TranscriptionStatus::Transcribing => "Transcribing audio...",
            TranscriptionStatus::Completed => "Transcription complete",
            TranscriptionStatus::Failed => "Transcription failed",
            TranscriptionStatus::TimedOut => "Transcription timed out",
            TranscriptionStatus::Cancelled => "Transcription cancelled",
        };
        write!(f, "{}", text)
    }
}

/// Coordinates one transcription job at a time against a worker boundary.
///
/// Explicitly constructed and owned by the caller; dropping it tears the
/// worker down. Usable behind `Arc` from concurrent tasks — overlapping
/// submissions are rejected with `Busy`, never queued.
pub struct TranscriptionCoordinator {
    factory: ModelFactory,
    worker: Mutex<Option<WorkerHandle>>,
    busy: AtomicBool,
    status_tx: Option<crossbeam_channel::Sender<TranscriptionStatus>>,
    default_timeout: Duration,
}

impl TranscriptionCoordinator {
    /// Create a coordinator. No worker is spawned until `initialize` or the
    /// first `transcribe` call.
    pub fn new(factory: ModelFactory) -> Self {
        Self {
            factory,
            worker: Mutex::new(None),
            busy: AtomicBool::new(false),
            status_tx: None,
            default_timeout: Duration::from_secs(defaults::TRANSCRIBE_TIMEOUT_SECS),
        }
    }

    /// Sets a sender for job status updates.
    pub fn with_status_sender(mut self, tx: crossbeam_channel::Sender<TranscriptionStatus>) -> Self {
        self.status_tx = Some(tx);
        self
    }

    /// Sets the timeout used by `transcribe_artifact`.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// The timeout used when the caller does not supply one.
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Spawn the worker boundary if it is not already running.
    ///
    /// Idempotent: returns immediately when a worker exists.
    ///
    /// # Errors
    /// Returns `CapscribeError::Initialization` if the worker cannot be spawned.
    pub async fn initialize(&self) -> Result<()> {
        let mut worker = self.worker.lock().await;
        if worker.is_none() {
            *worker = Some(WorkerHandle::spawn(&self.factory)?);
        }
        Ok(())
    }

    /// Tear down the worker boundary, if any.
    pub async fn shutdown(&self) {
        *self.worker.lock().await = None;
    }

    /// Transcribe an artifact using the default timeout.
    pub async fn transcribe_artifact(&self, artifact: &AudioArtifact) -> Result<String> {
        self.transcribe(artifact.data().to_vec(), self.default_timeout)
            .await
    }

    /// Submit audio bytes for transcription.
    ///
    /// The audio buffer is transferred to the worker boundary. Exactly one
    /// job may be in flight; a submission while one is pending fails with
    /// `Busy` without disturbing it.
    ///
    /// # Errors
    /// - `CapscribeError::Busy` — a job is already pending
    /// - `CapscribeError::Processing` — the worker reported a failure
    /// - `CapscribeError::Timeout` — no terminal event before the deadline
    /// - `CapscribeError::Cancelled` — the worker aborted the job
    pub async fn transcribe(&self, audio: Vec<u8>, timeout: Duration) -> Result<String> {
        if self.busy.swap(true, Ordering::SeqCst) {
            return Err(CapscribeError::Busy);
        }
        let _busy = BusyGuard(&self.busy);
        self.run_job(audio, timeout).await
    }

    async fn run_job(&self, audio: Vec<u8>, timeout: Duration) -> Result<String> {
        self.initialize().await?;

        let deadline = tokio::time::Instant::now() + timeout;
        let cancel = CancelToken::new();

        let mut guard = self.worker.lock().await;
        // Take the handle for the duration of the job; terminal paths
        // either hand it back or replace it.
        let Some(mut worker) = guard.take() else {
            return Err(CapscribeError::Initialization {
                message: "worker boundary not running".to_string(),
            });
        };
        worker.submit(audio, cancel.clone())?;

        loop {
            match tokio::time::timeout_at(deadline, worker.next_event()).await {
                Ok(Some(event)) => match event {
                    WorkerEvent::LoadingModel => {
                        self.emit(TranscriptionStatus::LoadingModel);
                    }
                    WorkerEvent::ModelProgress { fraction } => {
                        self.emit(TranscriptionStatus::ModelProgress { fraction });
                    }
                    WorkerEvent::Transcribing => {
                        self.emit(TranscriptionStatus::Transcribing);
                    }
                    WorkerEvent::Complete { text } => {
                        *guard = Some(worker);
                        self.emit(TranscriptionStatus::Completed);
                        return Ok(text);
                    }
                    WorkerEvent::Error { message } => {
                        *guard = Some(worker);
                        self.emit(TranscriptionStatus::Failed);
                        return Err(CapscribeError::Processing { message });
                    }
                    WorkerEvent::Cancelled => {
                        // Worker-originated abort: reject, no respawn
                        *guard = Some(worker);
                        self.emit(TranscriptionStatus::Cancelled);
                        return Err(CapscribeError::Cancelled);
                    }
                },
                Ok(None) => {
                    // The worker thread died without a terminal message.
                    // Replace it so later jobs get a live boundary.
                    *guard = Some(WorkerHandle::spawn(&self.factory)?);
                    self.emit(TranscriptionStatus::Failed);
                    return Err(CapscribeError::Processing {
                        message: "worker terminated unexpectedly".to_string(),
                    });
                }
                Err(_) => {
                    // Deadline expired: request a best-effort abort, retire
                    // the worker (a stuck thread detaches along with its
                    // event channel, so a stray late message has nowhere to
                    // go), and respawn so the next job runs against a fresh
                    // boundary.
                    cancel.cancel();
                    drop(worker);
                    *guard = match WorkerHandle::spawn(&self.factory) {
                        Ok(fresh) => Some(fresh),
                        Err(e) => {
                            eprintln!("capscribe: failed to respawn worker: {e}");
                            None
                        }
                    };
                    self.emit(TranscriptionStatus::TimedOut);
                    return Err(CapscribeError::Timeout { after: timeout });
                }
            }
        }
    }

    fn emit(&self, status: TranscriptionStatus) {
        if let Some(tx) = &self.status_tx {
            let _ = tx.send(status);
        }
    }
}

/// Clears the busy flag when a job ends, including when the caller drops
/// the job future mid-flight.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
