use crate::audio::encoding::AudioEncoding;
use crate::defaults;
use crate::recorder::RecorderConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub recorder: RecorderSection,
    pub transcription: TranscriptionSection,
    pub upload: UploadSection,
}

/// Recorder configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecorderSection {
    pub device: Option<String>,
    pub preferred_encoding: String,
    pub max_duration_secs: u64,
    pub chunk_interval_ms: u64,
    pub tick_interval_ms: u64,
}

/// Transcription configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TranscriptionSection {
    pub model_path: Option<String>,
    pub language: String,
    pub timeout_secs: u64,
}

/// Artifact upload configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UploadSection {
    pub endpoint: String,
    pub field: String,
}

impl Default for RecorderSection {
    fn default() -> Self {
        Self {
            device: None,
            preferred_encoding: "wav".to_string(),
            max_duration_secs: defaults::MAX_RECORDING_MS / 1000,
            chunk_interval_ms: defaults::CHUNK_INTERVAL_MS,
            tick_interval_ms: defaults::TICK_INTERVAL_MS,
        }
    }
}

impl Default for TranscriptionSection {
    fn default() -> Self {
        Self {
            model_path: None,
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            timeout_secs: defaults::TRANSCRIBE_TIMEOUT_SECS,
        }
    }
}

impl Default for UploadSection {
    fn default() -> Self {
        Self {
            endpoint: defaults::UPLOAD_ENDPOINT.to_string(),
            field: defaults::UPLOAD_FIELD.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Self::default()
                } else {
                    panic!("Failed to load config from {}: {}", path.display(), e);
                }
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - CAPSCRIBE_DEVICE → recorder.device
    /// - CAPSCRIBE_ENCODING → recorder.preferred_encoding
    /// - CAPSCRIBE_LANGUAGE → transcription.language
    /// - CAPSCRIBE_MODEL → transcription.model_path
    /// - CAPSCRIBE_ENDPOINT → upload.endpoint
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(device) = std::env::var("CAPSCRIBE_DEVICE")
            && !device.is_empty()
        {
            self.recorder.device = Some(device);
        }
        if let Ok(encoding) = std::env::var("CAPSCRIBE_ENCODING")
            && !encoding.is_empty()
        {
            self.recorder.preferred_encoding = encoding;
        }
        if let Ok(language) = std::env::var("CAPSCRIBE_LANGUAGE")
            && !language.is_empty()
        {
            self.transcription.language = language;
        }
        if let Ok(model) = std::env::var("CAPSCRIBE_MODEL")
            && !model.is_empty()
        {
            self.transcription.model_path = Some(model);
        }
        if let Ok(endpoint) = std::env::var("CAPSCRIBE_ENDPOINT")
            && !endpoint.is_empty()
        {
            self.upload.endpoint = endpoint;
        }
        self
    }

    /// Build the recorder's runtime configuration from this config.
    ///
    /// An unrecognized encoding name falls back to the negotiation default.
    pub fn recorder_config(&self) -> RecorderConfig {
        RecorderConfig {
            chunk_interval: Duration::from_millis(self.recorder.chunk_interval_ms),
            tick_interval: Duration::from_millis(self.recorder.tick_interval_ms),
            max_duration: Duration::from_secs(self.recorder.max_duration_secs),
            preferred_encoding: AudioEncoding::from_name(&self.recorder.preferred_encoding)
                .unwrap_or_else(crate::audio::encoding::EncoderRegistry::default_encoding),
        }
    }

    /// The transcription deadline as a duration.
    pub fn transcribe_timeout(&self) -> Duration {
        Duration::from_secs(self.transcription.timeout_secs)
    }

    /// Default config file path (`~/.config/capscribe/config.toml`).
    #[cfg(feature = "cli")]
    pub fn default_path() -> std::path::PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| std::path::PathBuf::from(".config"))
            .join("capscribe")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.recorder.device, None);
        assert_eq!(config.recorder.preferred_encoding, "wav");
        assert_eq!(config.recorder.max_duration_secs, 300);
        assert_eq!(config.recorder.chunk_interval_ms, 10);
        assert_eq!(config.recorder.tick_interval_ms, 100);
        assert_eq!(config.transcription.language, "auto");
        assert_eq!(config.transcription.timeout_secs, 30);
        assert_eq!(config.upload.endpoint, "http://127.0.0.1:3000/api/audio");
        assert_eq!(config.upload.field, "audio");
    }

    #[test]
    fn test_load_full_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[recorder]
device = "pipewire"
preferred_encoding = "flac"
max_duration_secs = 120

[transcription]
model_path = "/models/ggml-base.bin"
language = "en"
timeout_secs = 45

[upload]
endpoint = "https://example.com/api/audio"
field = "voice"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.recorder.device.as_deref(), Some("pipewire"));
        assert_eq!(config.recorder.preferred_encoding, "flac");
        assert_eq!(config.recorder.max_duration_secs, 120);
        // Unspecified fields keep defaults
        assert_eq!(config.recorder.chunk_interval_ms, 10);
        assert_eq!(
            config.transcription.model_path.as_deref(),
            Some("/models/ggml-base.bin")
        );
        assert_eq!(config.transcription.timeout_secs, 45);
        assert_eq!(config.upload.endpoint, "https://example.com/api/audio");
        assert_eq!(config.upload.field, "voice");
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[transcription]\ntimeout_secs = 10\n").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.transcription.timeout_secs, 10);
        assert_eq!(config.recorder.max_duration_secs, 300);
    }

    #[test]
    fn test_load_invalid_toml_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "recorder = not valid toml").unwrap();

        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default(Path::new("/nonexistent/capscribe.toml"));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_recorder_config_mapping() {
        let config = Config::default();
        let recorder_config = config.recorder_config();
        assert_eq!(recorder_config.chunk_interval, Duration::from_millis(10));
        assert_eq!(recorder_config.tick_interval, Duration::from_millis(100));
        assert_eq!(recorder_config.max_duration, Duration::from_secs(300));
        assert_eq!(recorder_config.preferred_encoding, AudioEncoding::Wav);
    }

    #[test]
    fn test_recorder_config_unknown_encoding_falls_back() {
        let config = Config {
            recorder: RecorderSection {
                preferred_encoding: "aiff".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            config.recorder_config().preferred_encoding,
            AudioEncoding::Wav
        );
    }

    #[test]
    fn test_transcribe_timeout() {
        let config = Config::default();
        assert_eq!(config.transcribe_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }
}
