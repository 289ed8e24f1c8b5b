//! Asynchronous, cancellable, timeout-bounded transcription.
//!
//! The coordinator runs one job at a time against a worker boundary — an
//! isolated thread owning a speech model — and translates the worker's
//! event stream into a single result for the caller.

pub mod coordinator;
pub mod model;
pub mod protocol;
pub mod whisper;
pub mod worker;

pub use coordinator::{TranscriptionCoordinator, TranscriptionStatus};
pub use model::{MockSpeechModel, ModelFactory, SpeechModel};
pub use protocol::{CancelToken, WorkerEvent, WorkerRequest};
pub use whisper::{WhisperConfig, WhisperModel};
pub use worker::WorkerHandle;
