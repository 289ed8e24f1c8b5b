//! capscribe - Voice capture and transcription pipeline
//!
//! Captures a live audio stream from an input device, packages it into a
//! deliverable artifact, and coordinates cancellable, timeout-bounded
//! transcription jobs against an isolated worker.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
#[cfg(feature = "cli")]
pub mod cli;
pub mod clock;
pub mod config;
pub mod defaults;
pub mod error;
pub mod recorder;
pub mod transcribe;
#[cfg(feature = "upload")]
pub mod upload;

// Core traits (capture → coordinate → deliver)
pub use audio::device::{CaptureDevice, DeviceFactory, MockCaptureDevice};
pub use audio::encoding::{ArtifactEncoder, AudioArtifact, AudioEncoding, EncoderRegistry};
pub use transcribe::model::{MockSpeechModel, ModelFactory, SpeechModel};

// Recorder
pub use recorder::{Recorder, RecorderConfig, RecorderEvent, RecorderState};

// Transcription
pub use transcribe::coordinator::{TranscriptionCoordinator, TranscriptionStatus};
pub use transcribe::protocol::{CancelToken, WorkerEvent};
pub use transcribe::worker::WorkerHandle;

// Artifact delivery
#[cfg(feature = "upload")]
pub use upload::{RecordingUploader, UploadMetadata, UploadResponse};

// Error handling
pub use error::{CapscribeError, Result};

// Config
pub use config::Config;

// Time source (for deterministic tests)
pub use clock::{Clock, MockClock, SystemClock};

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_starts_with_cargo_version() {
        let ver = version_string();
        assert!(
            ver.starts_with(env!("CARGO_PKG_VERSION")),
            "version_string should start with CARGO_PKG_VERSION, got: {}",
            ver
        );
    }

    #[test]
    fn version_string_contains_plus_when_git_hash_present() {
        let ver = version_string();
        if option_env!("GIT_HASH").is_some_and(|h| !h.is_empty()) {
            assert!(
                ver.contains('+'),
                "With GIT_HASH set, version should contain '+', got: {}",
                ver
            );
        } else {
            assert_eq!(ver, env!("CARGO_PKG_VERSION"));
        }
    }
}
