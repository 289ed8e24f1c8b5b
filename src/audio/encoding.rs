//! Artifact encodings and format negotiation.
//!
//! The recorder accumulates raw PCM fragments; at stop time an
//! `ArtifactEncoder` wraps them into a deliverable artifact under a declared
//! media type. Which encoding is used is negotiated once, at recorder
//! construction, by probing a preference-ordered list against the registry
//! of available encoders.

use crate::error::{CapscribeError, Result};
use std::io::Cursor;
use std::sync::Arc;

/// Audio artifact encodings, in order of general preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioEncoding {
    Wav,
    Flac,
    Ogg,
    Mp3,
}

impl AudioEncoding {
    /// Media type declared on artifacts with this encoding.
    pub fn media_type(&self) -> &'static str {
        match self {
            AudioEncoding::Wav => "audio/wav",
            AudioEncoding::Flac => "audio/flac",
            AudioEncoding::Ogg => "audio/ogg",
            AudioEncoding::Mp3 => "audio/mpeg",
        }
    }

    /// File extension for artifacts with this encoding.
    pub fn extension(&self) -> &'static str {
        match self {
            AudioEncoding::Wav => "wav",
            AudioEncoding::Flac => "flac",
            AudioEncoding::Ogg => "ogg",
            AudioEncoding::Mp3 => "mp3",
        }
    }

    /// Parse an encoding name as used in configuration files.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "wav" => Some(AudioEncoding::Wav),
            "flac" => Some(AudioEncoding::Flac),
            "ogg" => Some(AudioEncoding::Ogg),
            "mp3" => Some(AudioEncoding::Mp3),
            _ => None,
        }
    }
}

/// Fallback probe order when the preferred encoding is unsupported.
pub const ENCODING_PREFERENCES: &[AudioEncoding] = &[
    AudioEncoding::Wav,
    AudioEncoding::Flac,
    AudioEncoding::Ogg,
    AudioEncoding::Mp3,
];

/// A finalized recording: encoded bytes plus their declared media type.
///
/// Artifacts are cheap to clone; the encoded data is shared.
#[derive(Debug, Clone)]
pub struct AudioArtifact {
    data: Arc<[u8]>,
    encoding: AudioEncoding,
}

impl AudioArtifact {
    pub fn new(data: Vec<u8>, encoding: AudioEncoding) -> Self {
        Self {
            data: data.into(),
            encoding,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn encoding(&self) -> AudioEncoding {
        self.encoding
    }

    pub fn media_type(&self) -> &'static str {
        self.encoding.media_type()
    }

    /// Build a file name for this artifact from a stem, e.g. `recording.wav`.
    pub fn file_name(&self, stem: &str) -> String {
        format!("{}.{}", stem, self.encoding.extension())
    }
}

/// Trait for encoders that turn raw PCM bytes into a finished artifact.
///
/// PCM input is 16-bit little-endian mono samples.
pub trait ArtifactEncoder: Send + Sync {
    /// The encoding this encoder produces.
    fn encoding(&self) -> AudioEncoding;

    /// Encode PCM bytes captured at `sample_rate` into artifact bytes.
    fn encode(&self, pcm: &[u8], sample_rate: u32) -> Result<Vec<u8>>;
}

/// WAV encoder backed by hound.
#[derive(Debug, Clone, Copy, Default)]
pub struct WavEncoder;

impl ArtifactEncoder for WavEncoder {
    fn encoding(&self) -> AudioEncoding {
        AudioEncoding::Wav
    }

    fn encode(&self, pcm: &[u8], sample_rate: u32) -> Result<Vec<u8>> {
        if pcm.len() % 2 != 0 {
            return Err(CapscribeError::Encode {
                message: format!("PCM byte stream not sample aligned ({} bytes)", pcm.len()),
            });
        }

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| CapscribeError::Encode {
                message: format!("Failed to create WAV writer: {}", e),
            })?;

        for pair in pcm.chunks_exact(2) {
            let sample = i16::from_le_bytes([pair[0], pair[1]]);
            writer.write_sample(sample).map_err(|e| CapscribeError::Encode {
                message: format!("Failed to write WAV sample: {}", e),
            })?;
        }

        writer.finalize().map_err(|e| CapscribeError::Encode {
            message: format!("Failed to finalize WAV data: {}", e),
        })?;

        Ok(cursor.into_inner())
    }
}

/// Registry of available artifact encoders.
///
/// Doubles as the capability probe: an encoding is "supported" iff an encoder
/// for it is registered. The builtin registry carries WAV only; additional
/// encoders can be registered by the caller (or by tests).
pub struct EncoderRegistry {
    encoders: Vec<Box<dyn ArtifactEncoder>>,
}

impl EncoderRegistry {
    /// Registry with the builtin encoders.
    pub fn builtin() -> Self {
        Self {
            encoders: vec![Box::new(WavEncoder)],
        }
    }

    /// Empty registry, for callers that want full control.
    pub fn empty() -> Self {
        Self {
            encoders: Vec::new(),
        }
    }

    /// Register an additional encoder.
    pub fn with_encoder(mut self, encoder: Box<dyn ArtifactEncoder>) -> Self {
        self.encoders.push(encoder);
        self
    }

    /// The encoding used when nothing in the preference list is supported.
    pub fn default_encoding() -> AudioEncoding {
        AudioEncoding::Wav
    }

    /// Whether an encoder for the given encoding is registered.
    pub fn supports(&self, encoding: AudioEncoding) -> bool {
        self.encoders.iter().any(|e| e.encoding() == encoding)
    }

    /// Look up the encoder for an encoding.
    pub fn encoder_for(&self, encoding: AudioEncoding) -> Option<&dyn ArtifactEncoder> {
        self.encoders
            .iter()
            .find(|e| e.encoding() == encoding)
            .map(|e| e.as_ref())
    }

    /// Select the encoding to record with.
    ///
    /// Probes the preferred encoding first, then the remaining preference
    /// order, and falls back to the default encoding when nothing matches.
    /// This runs once at recorder construction; the selection is immutable
    /// for the recorder's lifetime.
    pub fn negotiate(&self, preferred: AudioEncoding) -> AudioEncoding {
        if self.supports(preferred) {
            return preferred;
        }
        for &candidate in ENCODING_PREFERENCES {
            if self.supports(candidate) {
                return candidate;
            }
        }
        Self::default_encoding()
    }
}

impl Default for EncoderRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test encoder that claims an arbitrary encoding and emits raw PCM.
    struct StubEncoder(AudioEncoding);

    impl ArtifactEncoder for StubEncoder {
        fn encoding(&self) -> AudioEncoding {
            self.0
        }

        fn encode(&self, pcm: &[u8], _sample_rate: u32) -> Result<Vec<u8>> {
            Ok(pcm.to_vec())
        }
    }

    #[test]
    fn test_media_types() {
        assert_eq!(AudioEncoding::Wav.media_type(), "audio/wav");
        assert_eq!(AudioEncoding::Flac.media_type(), "audio/flac");
        assert_eq!(AudioEncoding::Ogg.media_type(), "audio/ogg");
        assert_eq!(AudioEncoding::Mp3.media_type(), "audio/mpeg");
    }

    #[test]
    fn test_from_name() {
        assert_eq!(AudioEncoding::from_name("wav"), Some(AudioEncoding::Wav));
        assert_eq!(AudioEncoding::from_name("WAV"), Some(AudioEncoding::Wav));
        assert_eq!(AudioEncoding::from_name("flac"), Some(AudioEncoding::Flac));
        assert_eq!(AudioEncoding::from_name("aiff"), None);
    }

    #[test]
    fn test_artifact_accessors() {
        let artifact = AudioArtifact::new(vec![1, 2, 3, 4], AudioEncoding::Wav);
        assert_eq!(artifact.data(), &[1, 2, 3, 4]);
        assert_eq!(artifact.len(), 4);
        assert!(!artifact.is_empty());
        assert_eq!(artifact.media_type(), "audio/wav");
        assert_eq!(artifact.file_name("recording"), "recording.wav");
    }

    #[test]
    fn test_artifact_clone_shares_data() {
        let artifact = AudioArtifact::new(vec![0u8; 1024], AudioEncoding::Wav);
        let clone = artifact.clone();
        assert_eq!(artifact.data().as_ptr(), clone.data().as_ptr());
    }

    #[test]
    fn test_wav_encoder_header_and_length() {
        let samples: Vec<i16> = vec![100, -100, 200, -200];
        let pcm: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();

        let encoded = WavEncoder.encode(&pcm, 16000).unwrap();

        // RIFF header + 44-byte canonical header, then one data byte pair per sample
        assert_eq!(&encoded[..4], b"RIFF");
        assert_eq!(&encoded[8..12], b"WAVE");
        assert_eq!(encoded.len(), 44 + pcm.len());
    }

    #[test]
    fn test_wav_encoder_empty_input() {
        let encoded = WavEncoder.encode(&[], 16000).unwrap();
        assert_eq!(encoded.len(), 44);
    }

    #[test]
    fn test_wav_encoder_rejects_unaligned_input() {
        let result = WavEncoder.encode(&[0u8; 3], 16000);
        match result {
            Err(CapscribeError::Encode { message }) => {
                assert!(message.contains("not sample aligned"));
            }
            _ => panic!("Expected Encode error"),
        }
    }

    #[test]
    fn test_wav_roundtrip_preserves_samples() {
        let samples: Vec<i16> = vec![0, 1000, -1000, i16::MAX, i16::MIN];
        let pcm: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        let encoded = WavEncoder.encode(&pcm, 16000).unwrap();

        let mut reader = hound::WavReader::new(Cursor::new(encoded)).unwrap();
        let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, samples);
        assert_eq!(reader.spec().sample_rate, 16000);
        assert_eq!(reader.spec().channels, 1);
    }

    #[test]
    fn test_builtin_registry_supports_wav_only() {
        let registry = EncoderRegistry::builtin();
        assert!(registry.supports(AudioEncoding::Wav));
        assert!(!registry.supports(AudioEncoding::Flac));
        assert!(!registry.supports(AudioEncoding::Ogg));
        assert!(!registry.supports(AudioEncoding::Mp3));
    }

    #[test]
    fn test_negotiate_preferred_when_supported() {
        let registry = EncoderRegistry::builtin().with_encoder(Box::new(StubEncoder(
            AudioEncoding::Ogg,
        )));
        assert_eq!(
            registry.negotiate(AudioEncoding::Ogg),
            AudioEncoding::Ogg
        );
    }

    #[test]
    fn test_negotiate_falls_through_preference_order() {
        // Preferred Mp3 is unsupported; Flac is the first supported entry
        // in the preference list after Wav is removed.
        let registry = EncoderRegistry::empty()
            .with_encoder(Box::new(StubEncoder(AudioEncoding::Flac)))
            .with_encoder(Box::new(StubEncoder(AudioEncoding::Ogg)));
        assert_eq!(
            registry.negotiate(AudioEncoding::Mp3),
            AudioEncoding::Flac
        );
    }

    #[test]
    fn test_negotiate_falls_back_to_default() {
        let registry = EncoderRegistry::empty();
        assert_eq!(
            registry.negotiate(AudioEncoding::Mp3),
            EncoderRegistry::default_encoding()
        );
    }

    #[test]
    fn test_encoder_for_returns_matching_encoder() {
        let registry = EncoderRegistry::builtin();
        assert!(registry.encoder_for(AudioEncoding::Wav).is_some());
        assert!(registry.encoder_for(AudioEncoding::Mp3).is_none());
    }
}
