//! The transcription worker boundary.
//!
//! A worker is a dedicated OS thread that owns one speech model instance.
//! It receives jobs over a request channel and reports status over an event
//! channel; nothing else crosses the boundary. Warm-up runs once per worker
//! instance, paid by the first job. Cancellation is observed cooperatively
//! at checkpoints: before warm-up, inside warm-up, after warm-up, and after
//! the (non-preemptible) model call.

use crate::error::{CapscribeError, Result};
use crate::transcribe::model::{ModelFactory, SpeechModel};
use crate::transcribe::protocol::{CancelToken, WorkerEvent, WorkerRequest};
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

/// Handle to a live worker, exclusively owned by the coordinator.
///
/// Dropping the handle closes the request channel; an idle worker exits on
/// its own, while one stuck inside a model call detaches and dies with the
/// process. A handle is never reused across a timeout — the coordinator
/// spawns a fresh worker instead, since a force-aborted worker's internal
/// state cannot be trusted.
pub struct WorkerHandle {
    request_tx: crossbeam_channel::Sender<WorkerRequest>,
    event_rx: UnboundedReceiver<WorkerEvent>,
    _thread: JoinHandle<()>,
}

impl WorkerHandle {
    /// Spawn a worker with a fresh model from the factory.
    ///
    /// # Errors
    /// Returns `CapscribeError::Initialization` if the model cannot be
    /// constructed or the thread cannot be spawned.
    pub fn spawn(factory: &ModelFactory) -> Result<Self> {
        let model = factory().map_err(|e| CapscribeError::Initialization {
            message: e.to_string(),
        })?;
        let (request_tx, request_rx) = crossbeam_channel::unbounded();
        let (event_tx, event_rx) = unbounded_channel();

        let thread = thread::Builder::new()
            .name("capscribe-worker".to_string())
            .spawn(move || run(model, request_rx, event_tx))
            .map_err(|e| CapscribeError::Initialization {
                message: format!("Failed to spawn worker thread: {}", e),
            })?;

        Ok(Self {
            request_tx,
            event_rx,
            _thread: thread,
        })
    }

    /// Submit one job. The audio buffer is transferred to the worker.
    ///
    /// # Errors
    /// Returns `CapscribeError::Initialization` if the worker thread is gone.
    pub fn submit(&self, audio: Vec<u8>, cancel: CancelToken) -> Result<()> {
        self.request_tx
            .send(WorkerRequest::Transcribe { audio, cancel })
            .map_err(|_| CapscribeError::Initialization {
                message: "worker thread is gone".to_string(),
            })
    }

    /// Receive the next event from this worker instance.
    ///
    /// Events arrive in emission order. Returns `None` if the worker thread
    /// terminated without a terminal message.
    pub async fn next_event(&mut self) -> Option<WorkerEvent> {
        self.event_rx.recv().await
    }
}

/// Worker loop: process requests strictly serially until the channel closes.
fn run(
    mut model: Box<dyn SpeechModel>,
    request_rx: crossbeam_channel::Receiver<WorkerRequest>,
    event_tx: UnboundedSender<WorkerEvent>,
) {
    while let Ok(WorkerRequest::Transcribe { audio, cancel }) = request_rx.recv() {
        run_job(model.as_mut(), &audio, &cancel, &event_tx);
    }
}

/// Run one job, emitting exactly one terminal event.
fn run_job(
    model: &mut dyn SpeechModel,
    audio: &[u8],
    cancel: &CancelToken,
    events: &UnboundedSender<WorkerEvent>,
) {
    // Checkpoint: before warm-up
    if cancel.is_cancelled() {
        let _ = events.send(WorkerEvent::Cancelled);
        return;
    }

    if !model.is_ready() {
        let _ = events.send(WorkerEvent::LoadingModel);
        let progress_tx = events.clone();
        let mut progress = move |fraction: f32| {
            let _ = progress_tx.send(WorkerEvent::ModelProgress { fraction });
        };
        // Checkpoint: the model observes the token between warm-up steps
        match model.warm_up(&mut progress, cancel) {
            Ok(()) => {}
            Err(CapscribeError::Cancelled) => {
                let _ = events.send(WorkerEvent::Cancelled);
                return;
            }
            Err(e) => {
                let _ = events.send(WorkerEvent::Error {
                    message: e.to_string(),
                });
                return;
            }
        }
    }

    // Checkpoint: after warm-up, before the processing call
    if cancel.is_cancelled() {
        let _ = events.send(WorkerEvent::Cancelled);
        return;
    }

    let _ = events.send(WorkerEvent::Transcribing);

    let outcome = model.transcribe(audio);

    // Checkpoint: after the processing call. The call itself is not
    // preemptible, so a cancellation that arrived mid-call is honored here
    // by discarding the result.
    if cancel.is_cancelled() {
        let _ = events.send(WorkerEvent::Cancelled);
        return;
    }

    match outcome {
        Ok(text) => {
            let _ = events.send(WorkerEvent::Complete { text });
        }
        Err(e) => {
            let _ = events.send(WorkerEvent::Error {
                message: e.to_string(),
            });
        }
    }
}
