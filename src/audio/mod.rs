//! Audio capture devices and artifact encodings.
//!
//! The capture side of the pipeline: a `CaptureDevice` delivers raw PCM
//! samples, and an `ArtifactEncoder` packages accumulated samples into a
//! deliverable artifact under a negotiated media type.

#[cfg(feature = "cpal-audio")]
pub mod capture;
pub mod device;
pub mod encoding;

#[cfg(feature = "cpal-audio")]
pub use capture::{CpalCaptureDevice, list_devices};
pub use device::{CaptureDevice, DeviceFactory, MockCaptureDevice};
pub use encoding::{
    ArtifactEncoder, AudioArtifact, AudioEncoding, EncoderRegistry, WavEncoder,
};
