//! Capture device abstraction.

use crate::defaults;
use crate::error::{CapscribeError, Result};

/// Trait for audio capture devices.
///
/// This trait allows swapping implementations (real input device vs mock).
/// Acquiring and releasing the physical device are the only externally
/// observable side effects of the recorder besides its emitted events.
pub trait CaptureDevice: Send {
    /// Start capturing audio from the device.
    ///
    /// # Returns
    /// Ok(()) if the device started successfully, or an error
    fn start(&mut self) -> Result<()>;

    /// Stop capturing and release the device.
    ///
    /// # Returns
    /// Ok(()) if the device stopped successfully, or an error
    fn stop(&mut self) -> Result<()>;

    /// Drain buffered audio samples from the device.
    ///
    /// # Returns
    /// Vector of 16-bit PCM audio samples, or an error
    fn read_samples(&mut self) -> Result<Vec<i16>>;

    /// Sample rate the device delivers samples at.
    fn sample_rate(&self) -> u32;
}

/// Factory producing a fresh capture device for each recording session.
pub type DeviceFactory = Box<dyn Fn() -> Result<Box<dyn CaptureDevice>> + Send + Sync>;

/// Mock capture device for testing
#[derive(Debug, Clone)]
pub struct MockCaptureDevice {
    is_started: bool,
    samples: Vec<i16>,
    sample_rate: u32,
    should_fail_start: bool,
    should_fail_stop: bool,
    should_fail_read: bool,
    error_message: String,
}

impl MockCaptureDevice {
    /// Create a new mock capture device with default settings
    pub fn new() -> Self {
        Self {
            is_started: false,
            samples: vec![0i16; 160],
            sample_rate: defaults::SAMPLE_RATE,
            should_fail_start: false,
            should_fail_stop: false,
            should_fail_read: false,
            error_message: "mock capture error".to_string(),
        }
    }

    /// Configure the mock to return specific samples on every read
    pub fn with_samples(mut self, samples: Vec<i16>) -> Self {
        self.samples = samples;
        self
    }

    /// Configure the mock's reported sample rate
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Configure the mock to fail on start
    pub fn with_start_failure(mut self) -> Self {
        self.should_fail_start = true;
        self
    }

    /// Configure the mock to fail on stop
    pub fn with_stop_failure(mut self) -> Self {
        self.should_fail_stop = true;
        self
    }

    /// Configure the mock to fail on read
    pub fn with_read_failure(mut self) -> Self {
        self.should_fail_read = true;
        self
    }

    /// Configure the error message for failures
    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    /// Check if the device is started
    pub fn is_started(&self) -> bool {
        self.is_started
    }

    /// A factory producing clones of this mock, for recorder construction.
    pub fn factory(self) -> DeviceFactory {
        Box::new(move || Ok(Box::new(self.clone()) as Box<dyn CaptureDevice>))
    }
}

impl Default for MockCaptureDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureDevice for MockCaptureDevice {
    fn start(&mut self) -> Result<()> {
        if self.should_fail_start {
            Err(CapscribeError::DeviceUnavailable {
                message: self.error_message.clone(),
            })
        } else {
            self.is_started = true;
            Ok(())
        }
    }

    fn stop(&mut self) -> Result<()> {
        if self.should_fail_stop {
            Err(CapscribeError::AudioCapture {
                message: self.error_message.clone(),
            })
        } else {
            self.is_started = false;
            Ok(())
        }
    }

    fn read_samples(&mut self) -> Result<Vec<i16>> {
        if self.should_fail_read {
            Err(CapscribeError::AudioCapture {
                message: self.error_message.clone(),
            })
        } else {
            Ok(self.samples.clone())
        }
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_device_returns_configured_samples() {
        let test_samples = vec![100i16, 200, 300, 400, 500];
        let mut device = MockCaptureDevice::new().with_samples(test_samples.clone());

        let result = device.read_samples();

        assert!(result.is_ok());
        assert_eq!(result.unwrap(), test_samples);
    }

    #[test]
    fn test_mock_device_returns_default_samples() {
        let mut device = MockCaptureDevice::new();

        let samples = device.read_samples().unwrap();
        assert_eq!(samples.len(), 160);
        assert!(samples.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_mock_device_start_failure_is_device_unavailable() {
        let mut device = MockCaptureDevice::new()
            .with_start_failure()
            .with_error_message("permission denied");

        let result = device.start();

        assert!(!device.is_started());
        match result {
            Err(CapscribeError::DeviceUnavailable { message }) => {
                assert_eq!(message, "permission denied");
            }
            _ => panic!("Expected DeviceUnavailable error"),
        }
    }

    #[test]
    fn test_mock_device_read_failure() {
        let mut device = MockCaptureDevice::new().with_read_failure();

        match device.read_samples() {
            Err(CapscribeError::AudioCapture { message }) => {
                assert_eq!(message, "mock capture error");
            }
            _ => panic!("Expected AudioCapture error"),
        }
    }

    #[test]
    fn test_mock_device_stop_failure_keeps_started_state() {
        let mut device = MockCaptureDevice::new().with_stop_failure();

        device.start().unwrap();
        assert!(device.is_started());

        assert!(device.stop().is_err());
        assert!(device.is_started());
    }

    #[test]
    fn test_mock_device_start_stop_state_management() {
        let mut device = MockCaptureDevice::new();

        assert!(!device.is_started());
        device.start().unwrap();
        assert!(device.is_started());
        device.stop().unwrap();
        assert!(!device.is_started());
    }

    #[test]
    fn test_mock_device_sample_rate() {
        let device = MockCaptureDevice::new();
        assert_eq!(device.sample_rate(), 16000);

        let device = MockCaptureDevice::new().with_sample_rate(48000);
        assert_eq!(device.sample_rate(), 48000);
    }

    #[test]
    fn test_capture_device_trait_is_object_safe() {
        let mut device: Box<dyn CaptureDevice> =
            Box::new(MockCaptureDevice::new().with_samples(vec![1i16, 2, 3]));

        assert!(device.start().is_ok());
        assert_eq!(device.read_samples().unwrap(), vec![1i16, 2, 3]);
        assert!(device.stop().is_ok());
    }

    #[test]
    fn test_mock_device_factory_produces_independent_devices() {
        let factory = MockCaptureDevice::new()
            .with_samples(vec![7i16, 8, 9])
            .factory();

        let mut first = factory().unwrap();
        let mut second = factory().unwrap();

        first.start().unwrap();
        assert_eq!(second.read_samples().unwrap(), vec![7i16, 8, 9]);
        assert_eq!(first.read_samples().unwrap(), vec![7i16, 8, 9]);
    }

    #[test]
    fn test_mock_device_failing_factory() {
        let factory = MockCaptureDevice::new().with_start_failure().factory();
        let mut device = factory().unwrap();
        assert!(device.start().is_err());
    }
}
