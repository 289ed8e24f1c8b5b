//! Whisper-backed speech model.
//!
//! This module provides a Whisper implementation of the SpeechModel trait
//! using whisper-rs.
//!
//! # Feature Gate
//!
//! This module requires the `whisper` feature to be enabled and cmake to be
//! installed. To build with Whisper support:
//!
//! ```bash
//! cargo build --features whisper
//! ```

use crate::defaults;
use crate::error::{CapscribeError, Result};
use crate::transcribe::model::SpeechModel;
use crate::transcribe::protocol::CancelToken;
use std::io::Cursor;
use std::path::PathBuf;

#[cfg(feature = "whisper")]
use std::sync::Once;
#[cfg(feature = "whisper")]
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, install_logging_hooks,
};

#[cfg(feature = "whisper")]
static LOGGING_HOOKS_INSTALLED: Once = Once::new();

/// Configuration for the Whisper speech model.
#[derive(Debug, Clone)]
pub struct WhisperConfig {
    /// Path to the Whisper model file
    pub model_path: PathBuf,
    /// Language code (e.g., "en", "es", "fr"), or "auto"
    pub language: String,
    /// Number of threads for inference (None = auto-detect)
    pub threads: Option<usize>,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/ggml-base.bin"),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            threads: None,
        }
    }
}

/// Whisper-backed speech model.
///
/// Warm-up loads the model weights; transcription decodes the submitted WAV
/// artifact bytes and runs inference. The load is deferred to `warm_up` so a
/// worker can be spawned cheaply and the first job pays the cost, reporting
/// progress along the way.
pub struct WhisperModel {
    config: WhisperConfig,
    model_name: String,
    #[cfg(feature = "whisper")]
    context: Option<WhisperContext>,
}

impl std::fmt::Debug for WhisperModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperModel")
            .field("config", &self.config)
            .field("model_name", &self.model_name)
            .finish()
    }
}

impl WhisperModel {
    /// Create a new Whisper model.
    ///
    /// Validates that the model file exists; the weights are not loaded
    /// until `warm_up`.
    ///
    /// # Errors
    /// Returns `CapscribeError::ModelNotFound` if the model file doesn't exist
    pub fn new(config: WhisperConfig) -> Result<Self> {
        if !config.model_path.exists() {
            return Err(CapscribeError::ModelNotFound {
                path: config.model_path.to_string_lossy().to_string(),
            });
        }

        let model_name = config
            .model_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();

        Ok(Self {
            config,
            model_name,
            #[cfg(feature = "whisper")]
            context: None,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &WhisperConfig {
        &self.config
    }

    /// Decode WAV artifact bytes into f32 samples normalized to [-1.0, 1.0].
    ///
    /// Whisper expects audio in f32 format normalized to the range [-1.0, 1.0].
    pub fn decode_audio(bytes: &[u8]) -> Result<Vec<f32>> {
        let mut reader =
            hound::WavReader::new(Cursor::new(bytes)).map_err(|e| CapscribeError::Processing {
                message: format!("Failed to parse WAV audio: {}", e),
            })?;

        let spec = reader.spec();
        if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
            return Err(CapscribeError::Processing {
                message: format!(
                    "Unsupported WAV format: {:?}/{} bits",
                    spec.sample_format, spec.bits_per_sample
                ),
            });
        }

        let mut samples = Vec::new();
        for sample in reader.samples::<i16>() {
            let sample = sample.map_err(|e| CapscribeError::Processing {
                message: format!("Failed to read WAV sample: {}", e),
            })?;
            samples.push(sample as f32 / 32768.0);
        }
        Ok(samples)
    }
}

#[cfg(feature = "whisper")]
impl SpeechModel for WhisperModel {
    fn warm_up(&mut self, progress: &mut dyn FnMut(f32), cancel: &CancelToken) -> Result<()> {
        if self.context.is_some() {
            return Ok(());
        }

        // Install logging hooks to suppress whisper.cpp output (only once)
        LOGGING_HOOKS_INSTALLED.call_once(|| {
            install_logging_hooks();
        });

        if cancel.is_cancelled() {
            return Err(CapscribeError::Cancelled);
        }
        progress(0.0);

        let mut context_params = WhisperContextParameters::default();
        context_params.flash_attn(true);
        let path = self
            .config
            .model_path
            .to_str()
            .ok_or_else(|| CapscribeError::ModelLoad {
                message: "Invalid UTF-8 in model path".to_string(),
            })?;

        let context = WhisperContext::new_with_params(path, context_params).map_err(|e| {
            CapscribeError::ModelLoad {
                message: format!("Failed to load Whisper model: {}", e),
            }
        })?;

        if cancel.is_cancelled() {
            return Err(CapscribeError::Cancelled);
        }

        self.context = Some(context);
        progress(1.0);
        Ok(())
    }

    fn transcribe(&mut self, audio: &[u8]) -> Result<String> {
        let context = self.context.as_ref().ok_or_else(|| CapscribeError::Processing {
            message: "model not warmed up".to_string(),
        })?;

        let samples = Self::decode_audio(audio)?;

        let mut state = context
            .create_state()
            .map_err(|e| CapscribeError::Processing {
                message: format!("Failed to create Whisper state: {}", e),
            })?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

        if self.config.language == defaults::AUTO_LANGUAGE {
            params.set_language(None);
        } else {
            params.set_language(Some(&self.config.language));
        }

        if let Some(threads) = self.config.threads {
            params.set_n_threads(threads as i32);
        }

        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        state
            .full(params, &samples)
            .map_err(|e| CapscribeError::Processing {
                message: format!("Whisper inference failed: {}", e),
            })?;

        let mut transcription = String::new();
        for segment in state.as_iter() {
            transcription.push_str(&segment.to_string());
        }

        Ok(transcription.trim().to_string())
    }

    fn is_ready(&self) -> bool {
        self.context.is_some()
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(not(feature = "whisper"))]
impl SpeechModel for WhisperModel {
    fn warm_up(&mut self, _progress: &mut dyn FnMut(f32), _cancel: &CancelToken) -> Result<()> {
        Err(CapscribeError::ModelLoad {
            message: concat!(
                "Whisper feature not enabled. This binary was built without speech recognition.\n",
                "To fix: cargo build --features whisper\n",
                "If build fails with cmake errors, install: sudo apt install cmake"
            )
            .to_string(),
        })
    }

    fn transcribe(&mut self, _audio: &[u8]) -> Result<String> {
        Err(CapscribeError::Processing {
            message: "Whisper feature not enabled".to_string(),
        })
    }

    fn is_ready(&self) -> bool {
        false
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::encoding::{ArtifactEncoder, WavEncoder};

    #[test]
    fn test_whisper_config_default() {
        let config = WhisperConfig::default();
        assert_eq!(config.model_path, PathBuf::from("models/ggml-base.bin"));
        assert_eq!(config.language, crate::defaults::AUTO_LANGUAGE);
        assert_eq!(config.threads, None);
    }

    #[test]
    fn test_whisper_model_new_fails_for_missing_model() {
        let config = WhisperConfig {
            model_path: PathBuf::from("/nonexistent/model.bin"),
            language: "en".to_string(),
            threads: None,
        };

        match WhisperModel::new(config) {
            Err(CapscribeError::ModelNotFound { path }) => {
                assert_eq!(path, "/nonexistent/model.bin");
            }
            _ => panic!("Expected ModelNotFound error"),
        }
    }

    #[test]
    fn test_model_name_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("ggml-base.bin");
        std::fs::write(&model_path, b"fake model data").unwrap();

        let config = WhisperConfig {
            model_path,
            language: "en".to_string(),
            threads: None,
        };

        let model = WhisperModel::new(config).unwrap();
        assert_eq!(model.model_name(), "ggml-base");
        assert!(!model.is_ready(), "weights load is deferred to warm_up");
    }

    #[test]
    fn test_decode_audio_roundtrip() {
        let samples: Vec<i16> = vec![0, 16384, -16384, 32767];
        let pcm: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        let wav = WavEncoder.encode(&pcm, 16000).unwrap();

        let decoded = WhisperModel::decode_audio(&wav).unwrap();
        assert_eq!(decoded.len(), samples.len());
        assert!((decoded[1] - 0.5).abs() < 0.001);
        assert!((decoded[2] + 0.5).abs() < 0.001);
    }

    #[test]
    fn test_decode_audio_rejects_garbage() {
        match WhisperModel::decode_audio(b"not a wav file") {
            Err(CapscribeError::Processing { message }) => {
                assert!(message.contains("Failed to parse WAV audio"));
            }
            _ => panic!("Expected Processing error"),
        }
    }

    #[cfg(not(feature = "whisper"))]
    #[test]
    fn test_stub_warm_up_reports_missing_feature() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("ggml-tiny.bin");
        std::fs::write(&model_path, b"fake").unwrap();

        let mut model = WhisperModel::new(WhisperConfig {
            model_path,
            language: "en".to_string(),
            threads: None,
        })
        .unwrap();

        let mut progress = |_f: f32| {};
        match model.warm_up(&mut progress, &CancelToken::new()) {
            Err(CapscribeError::ModelLoad { message }) => {
                assert!(message.contains("Whisper feature not enabled"));
            }
            _ => panic!("Expected ModelLoad error"),
        }
    }
}
