//! Error types for capscribe.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CapscribeError {
    // Recorder / device errors
    #[error("Audio device unavailable: {message}")]
    DeviceUnavailable { message: String },

    #[error("Audio capture failed: {message}")]
    AudioCapture { message: String },

    #[error("Artifact encoding failed: {message}")]
    Encode { message: String },

    // Transcription errors
    #[error("A transcription job is already pending")]
    Busy,

    #[error("Failed to initialize transcription worker: {message}")]
    Initialization { message: String },

    #[error("Transcription timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("Transcription was cancelled")]
    Cancelled,

    #[error("Transcription failed: {message}")]
    Processing { message: String },

    #[error("Speech model not found at {path}")]
    ModelNotFound { path: String },

    #[error("Failed to load speech model: {message}")]
    ModelLoad { message: String },

    // Artifact delivery errors
    #[error("Upload failed: {message}")]
    Upload { message: String },

    #[error("Upload rejected with status {status}")]
    UploadRejected { status: u16 },

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, CapscribeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_device_unavailable_display() {
        let error = CapscribeError::DeviceUnavailable {
            message: "permission denied".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Audio device unavailable: permission denied"
        );
    }

    #[test]
    fn test_audio_capture_display() {
        let error = CapscribeError::AudioCapture {
            message: "buffer overflow".to_string(),
        };
        assert_eq!(error.to_string(), "Audio capture failed: buffer overflow");
    }

    #[test]
    fn test_encode_display() {
        let error = CapscribeError::Encode {
            message: "odd byte count".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Artifact encoding failed: odd byte count"
        );
    }

    #[test]
    fn test_busy_display() {
        assert_eq!(
            CapscribeError::Busy.to_string(),
            "A transcription job is already pending"
        );
    }

    #[test]
    fn test_initialization_display() {
        let error = CapscribeError::Initialization {
            message: "thread spawn failed".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Failed to initialize transcription worker: thread spawn failed"
        );
    }

    #[test]
    fn test_timeout_display() {
        let error = CapscribeError::Timeout {
            after: Duration::from_secs(30),
        };
        assert_eq!(error.to_string(), "Transcription timed out after 30s");
    }

    #[test]
    fn test_cancelled_display() {
        assert_eq!(
            CapscribeError::Cancelled.to_string(),
            "Transcription was cancelled"
        );
    }

    #[test]
    fn test_processing_display() {
        let error = CapscribeError::Processing {
            message: "inference failed".to_string(),
        };
        assert_eq!(error.to_string(), "Transcription failed: inference failed");
    }

    #[test]
    fn test_model_not_found_display() {
        let error = CapscribeError::ModelNotFound {
            path: "/models/ggml-base.bin".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Speech model not found at /models/ggml-base.bin"
        );
    }

    #[test]
    fn test_model_load_display() {
        let error = CapscribeError::ModelLoad {
            message: "out of memory".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Failed to load speech model: out of memory"
        );
    }

    #[test]
    fn test_upload_display() {
        let error = CapscribeError::Upload {
            message: "connection refused".to_string(),
        };
        assert_eq!(error.to_string(), "Upload failed: connection refused");
    }

    #[test]
    fn test_upload_rejected_display() {
        let error = CapscribeError::UploadRejected { status: 413 };
        assert_eq!(error.to_string(), "Upload rejected with status 413");
    }

    #[test]
    fn test_other_display() {
        let error = CapscribeError::Other("unexpected error".to_string());
        assert_eq!(error.to_string(), "unexpected error");
    }

    #[test]
    fn test_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: CapscribeError = io_error.into();
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_toml_error() {
        let toml_str = "invalid = toml = syntax";
        let toml_error = toml::from_str::<toml::Value>(toml_str).unwrap_err();
        let error: CapscribeError = toml_error.into();
        assert!(error.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(returns_result().unwrap(), 42);

        fn returns_error() -> Result<i32> {
            Err(CapscribeError::Busy)
        }
        assert!(returns_error().is_err());
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<CapscribeError>();
        assert_sync::<CapscribeError>();
    }

    #[test]
    fn test_error_debug_format() {
        let error = CapscribeError::Timeout {
            after: Duration::from_millis(500),
        };
        let debug_str = format!("{:?}", error);
        assert!(debug_str.contains("Timeout"));
    }
}
