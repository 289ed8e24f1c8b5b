//! The opaque speech model capability.

use crate::error::{CapscribeError, Result};
use crate::transcribe::protocol::CancelToken;
use std::time::Duration;

/// Trait for speech-to-text capabilities run inside the worker boundary.
///
/// This trait allows swapping implementations (real Whisper vs mock).
/// The capability is treated as an oracle: given raw audio bytes it
/// eventually produces text or fails.
pub trait SpeechModel: Send {
    /// One-time warm-up (e.g. loading model weights).
    ///
    /// Implementations report progress as fractions in [0, 1] and should
    /// observe `cancel` between steps, returning
    /// `CapscribeError::Cancelled` when it is set.
    fn warm_up(&mut self, progress: &mut dyn FnMut(f32), cancel: &CancelToken) -> Result<()>;

    /// Transcribe raw audio bytes to text.
    ///
    /// This call is not preemptible; abort latency at the worker boundary
    /// is bounded by its duration.
    fn transcribe(&mut self, audio: &[u8]) -> Result<String>;

    /// Whether warm-up has completed.
    fn is_ready(&self) -> bool;

    /// Get the name of the model
    fn model_name(&self) -> &str;
}

/// Factory producing a fresh model instance for each spawned worker.
///
/// A factory failure surfaces as `CapscribeError::Initialization` from
/// worker spawn.
pub type ModelFactory = Box<dyn Fn() -> Result<Box<dyn SpeechModel>> + Send + Sync>;

/// Mock speech model for testing
#[derive(Debug, Clone)]
pub struct MockSpeechModel {
    model_name: String,
    response: String,
    ready: bool,
    warm_up_steps: u32,
    should_fail_warm_up: bool,
    should_cancel_warm_up: bool,
    should_fail: bool,
    delay: Duration,
    error_message: String,
}

impl MockSpeechModel {
    /// Create a new mock model with default settings
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            response: "mock transcription".to_string(),
            ready: false,
            warm_up_steps: 2,
            should_fail_warm_up: false,
            should_cancel_warm_up: false,
            should_fail: false,
            delay: Duration::ZERO,
            error_message: "mock transcription failure".to_string(),
        }
    }

    /// Configure the mock to return a specific response
    pub fn with_response(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    /// Configure the number of warm-up progress steps
    pub fn with_warm_up_steps(mut self, steps: u32) -> Self {
        self.warm_up_steps = steps;
        self
    }

    /// Configure the mock to fail during warm-up
    pub fn with_warm_up_failure(mut self) -> Self {
        self.should_fail_warm_up = true;
        self
    }

    /// Configure the mock to abort its own warm-up, simulating an internal
    /// abort inside the capability
    pub fn with_warm_up_cancel(mut self) -> Self {
        self.should_cancel_warm_up = true;
        self
    }

    /// Configure the mock to fail on transcribe
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Configure a blocking delay inside transcribe, simulating a slow or
    /// hanging capability
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Configure the error message for failures
    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    /// A factory producing clones of this mock, for coordinator construction.
    pub fn factory(self) -> ModelFactory {
        Box::new(move || Ok(Box::new(self.clone()) as Box<dyn SpeechModel>))
    }
}

impl SpeechModel for MockSpeechModel {
    fn warm_up(&mut self, progress: &mut dyn FnMut(f32), cancel: &CancelToken) -> Result<()> {
        if self.should_cancel_warm_up {
            return Err(CapscribeError::Cancelled);
        }
        if self.should_fail_warm_up {
            return Err(CapscribeError::ModelLoad {
                message: self.error_message.clone(),
            });
        }
        for step in 1..=self.warm_up_steps {
            if cancel.is_cancelled() {
                return Err(CapscribeError::Cancelled);
            }
            progress(step as f32 / self.warm_up_steps as f32);
        }
        self.ready = true;
        Ok(())
    }

    fn transcribe(&mut self, _audio: &[u8]) -> Result<String> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if self.should_fail {
            Err(CapscribeError::Processing {
                message: self.error_message.clone(),
            })
        } else {
            Ok(self.response.clone())
        }
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
