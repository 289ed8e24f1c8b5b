//! Messages exchanged with the transcription worker boundary.
//!
//! The worker runs in its own thread and never shares mutable state with
//! the coordinator: audio crosses the boundary by value inside a request,
//! status comes back as a stream of events. The one exception is the
//! cancel token, which is deliberately a shared flag — it exists so an
//! abort can be observed while the worker is busy and cannot read its
//! request channel. A token belongs to exactly one job; a respawned worker
//! can never observe a prior job's token.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Requests sent by the coordinator to the worker.
#[derive(Debug)]
pub enum WorkerRequest {
    /// Submit one job. The audio buffer is transferred; the caller must not
    /// reuse it after submission.
    Transcribe { audio: Vec<u8>, cancel: CancelToken },
}

/// Events emitted by the worker for a job.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    /// One-time capability warm-up has begun.
    LoadingModel,
    /// Warm-up progress, advisory only.
    ModelProgress { fraction: f32 },
    /// Warm-up complete, job running.
    Transcribing,
    /// Terminal: transcription succeeded.
    Complete { text: String },
    /// Terminal: capability load or processing failure.
    Error { message: String },
    /// Terminal: job aborted at a cancellation checkpoint.
    Cancelled,
}

impl WorkerEvent {
    /// Whether this event ends the job. After a terminal event the worker
    /// emits nothing further for that job.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkerEvent::Complete { .. } | WorkerEvent::Error { .. } | WorkerEvent::Cancelled
        )
    }
}

/// Job-scoped cancellation token.
///
/// Cancellation is cooperative: the worker observes the token at its
/// checkpoints and aborts promptly when it is set, but the underlying
/// model call itself is not preemptible.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_events() {
        assert!(
            WorkerEvent::Complete {
                text: "hi".to_string()
            }
            .is_terminal()
        );
        assert!(
            WorkerEvent::Error {
                message: "boom".to_string()
            }
            .is_terminal()
        );
        assert!(WorkerEvent::Cancelled.is_terminal());
    }

    #[test]
    fn test_non_terminal_events() {
        assert!(!WorkerEvent::LoadingModel.is_terminal());
        assert!(!WorkerEvent::ModelProgress { fraction: 0.5 }.is_terminal());
        assert!(!WorkerEvent::Transcribing.is_terminal());
    }

    #[test]
    fn test_cancel_token_starts_clear() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_cancel_token_clones_share_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_independent_tokens_do_not_interfere() {
        let first = CancelToken::new();
        let second = CancelToken::new();
        first.cancel();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
    }
}
