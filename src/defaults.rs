//! Default configuration constants for capscribe.
//!
//! This module provides shared constants used across different configuration types
//! to ensure consistency and eliminate duplication.

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition and provides a good balance
/// between quality and computational efficiency for voice applications.
pub const SAMPLE_RATE: u32 = 16000;

/// Interval between capture-device polls in milliseconds.
///
/// Bounds the memory-copy latency of moving samples out of the device buffer.
/// It does not segment the data semantically; chunks are concatenated verbatim
/// when the artifact is finalized.
pub const CHUNK_INTERVAL_MS: u64 = 10;

/// Granularity of elapsed-time tick notifications in milliseconds.
pub const TICK_INTERVAL_MS: u64 = 100;

/// Maximum recording duration in milliseconds before automatic stop.
///
/// Recording is self-bounding: once elapsed (non-paused) time reaches this
/// ceiling the session stops and finalizes on its own, so callers never have
/// to enforce an upper limit.
pub const MAX_RECORDING_MS: u64 = 300_000;

/// Default transcription deadline in seconds.
///
/// A job that produces no terminal worker message within this window is
/// cancelled and the worker is respawned.
pub const TRANSCRIBE_TIMEOUT_SECS: u64 = 30;

/// Multipart form field name the upload endpoint expects the artifact under.
pub const UPLOAD_FIELD: &str = "audio";

/// Default upload endpoint URL.
pub const UPLOAD_ENDPOINT: &str = "http://127.0.0.1:3000/api/audio";

/// Default language code for transcription.
///
/// "auto" lets the speech model detect the spoken language automatically.
/// Set to a specific code (e.g., "en", "de") to force a language.
pub const DEFAULT_LANGUAGE: &str = "auto";

/// Language value that triggers automatic language detection.
pub const AUTO_LANGUAGE: &str = "auto";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_interval_is_coarser_than_chunk_interval() {
        assert!(TICK_INTERVAL_MS >= CHUNK_INTERVAL_MS);
    }

    #[test]
    fn max_recording_is_multi_minute() {
        assert!(MAX_RECORDING_MS >= 2 * 60 * 1000);
    }
}
