//! Recording sessions: device lifecycle, chunk capture, and artifact assembly.
//!
//! A `Recorder` owns one capture attempt at a time. `start()` acquires a
//! fresh device from the factory and spawns a capture thread that drains the
//! device at a fixed small interval, appending raw PCM fragments while the
//! session is recording and not paused. `stop()` concatenates the fragments
//! and encodes them into an artifact under the negotiated media type;
//! `cancel()` discards everything and returns to idle. Sessions are
//! self-bounding: the capture loop finalizes on its own once elapsed
//! (non-paused) time reaches the configured ceiling.

use crate::audio::device::{CaptureDevice, DeviceFactory};
use crate::audio::encoding::{AudioArtifact, AudioEncoding, EncoderRegistry};
use crate::clock::{Clock, SystemClock};
use crate::defaults;
use crate::error::{CapscribeError, Result};
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Recorder lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    /// No session; nothing captured.
    Idle,
    /// Capturing audio.
    Recording,
    /// Session alive, capture and elapsed clock suspended, device held.
    Paused,
    /// Session finalized; artifact available.
    Stopped,
}

/// Lifecycle events emitted by the recorder.
#[derive(Debug, Clone)]
pub enum RecorderEvent {
    /// Capture started.
    Started,
    /// Elapsed (non-paused) time advanced past another tick boundary.
    Tick { elapsed: Duration },
    /// Session finalized with its artifact and total elapsed duration.
    Stopped {
        artifact: AudioArtifact,
        duration: Duration,
    },
    /// Session discarded.
    Cancelled,
}

/// Configuration for a recorder.
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Interval between capture-device polls.
    pub chunk_interval: Duration,
    /// Granularity of `Tick` events.
    pub tick_interval: Duration,
    /// Ceiling on elapsed recording time before automatic stop.
    pub max_duration: Duration,
    /// Encoding to request during format negotiation.
    pub preferred_encoding: AudioEncoding,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            chunk_interval: Duration::from_millis(defaults::CHUNK_INTERVAL_MS),
            tick_interval: Duration::from_millis(defaults::TICK_INTERVAL_MS),
            max_duration: Duration::from_millis(defaults::MAX_RECORDING_MS),
            preferred_encoding: EncoderRegistry::default_encoding(),
        }
    }
}

/// State shared between the recorder and its capture thread.
struct CaptureShared {
    running: AtomicBool,
    paused: AtomicBool,
    cancelled: AtomicBool,
    elapsed_us: AtomicU64,
    chunks: Mutex<Vec<Vec<u8>>>,
    finished: Mutex<Option<(AudioArtifact, Duration)>>,
}

impl CaptureShared {
    fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            paused: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            elapsed_us: AtomicU64::new(0),
            chunks: Mutex::new(Vec::new()),
            finished: Mutex::new(None),
        }
    }
}

/// A live capture attempt.
struct CaptureSession {
    shared: Arc<CaptureShared>,
    thread: Option<JoinHandle<()>>,
    sample_rate: u32,
}

/// Recorder: drives the capture device lifecycle and assembles artifacts.
pub struct Recorder {
    config: RecorderConfig,
    factory: DeviceFactory,
    registry: Arc<EncoderRegistry>,
    encoding: AudioEncoding,
    clock: Arc<dyn Clock>,
    event_tx: Option<Sender<RecorderEvent>>,
    session: Option<CaptureSession>,
    artifact: Option<AudioArtifact>,
    final_duration: Duration,
}

impl Recorder {
    /// Create a new recorder.
    ///
    /// Format negotiation happens here, once: the preferred encoding is
    /// probed against the encoder registry and the selection is immutable
    /// for the recorder's lifetime.
    pub fn new(config: RecorderConfig, factory: DeviceFactory) -> Self {
        let registry = Arc::new(EncoderRegistry::builtin());
        let encoding = registry.negotiate(config.preferred_encoding);
        Self {
            config,
            factory,
            registry,
            encoding,
            clock: Arc::new(SystemClock),
            event_tx: None,
            session: None,
            artifact: None,
            final_duration: Duration::ZERO,
        }
    }

    /// Create a recorder capturing from a system input device.
    #[cfg(feature = "cpal-audio")]
    pub fn from_input_device(config: RecorderConfig, device_name: Option<String>) -> Self {
        let factory: DeviceFactory = Box::new(move || {
            crate::audio::capture::CpalCaptureDevice::new(device_name.as_deref())
                .map(|d| Box::new(d) as Box<dyn CaptureDevice>)
        });
        Self::new(config, factory)
    }

    /// Replace the encoder registry and re-run format negotiation.
    pub fn with_registry(mut self, registry: EncoderRegistry) -> Self {
        let registry = Arc::new(registry);
        self.encoding = registry.negotiate(self.config.preferred_encoding);
        self.registry = registry;
        self
    }

    /// Sets a custom clock (for deterministic testing).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets a sender for lifecycle events.
    pub fn with_event_sender(mut self, tx: Sender<RecorderEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// The encoding selected at construction.
    pub fn encoding(&self) -> AudioEncoding {
        self.encoding
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RecorderState {
        match &self.session {
            Some(session) => {
                let finished = session
                    .shared
                    .finished
                    .lock()
                    .map(|f| f.is_some())
                    .unwrap_or(false);
                if finished {
                    RecorderState::Stopped
                } else if session.shared.paused.load(Ordering::SeqCst) {
                    RecorderState::Paused
                } else {
                    RecorderState::Recording
                }
            }
            None => {
                if self.artifact.is_some() {
                    RecorderState::Stopped
                } else {
                    RecorderState::Idle
                }
            }
        }
    }

    /// Whether a session is currently capturing (recording or paused).
    pub fn is_active(&self) -> bool {
        matches!(
            self.state(),
            RecorderState::Recording | RecorderState::Paused
        )
    }

    /// Elapsed non-paused capture time.
    ///
    /// Live while a session is running, the final duration after stop,
    /// zero after cancel or before the first start.
    pub fn elapsed(&self) -> Duration {
        match &self.session {
            Some(session) => {
                Duration::from_micros(session.shared.elapsed_us.load(Ordering::SeqCst))
            }
            None => self.final_duration,
        }
    }

    /// The finalized artifact. Present iff the state is `Stopped`,
    /// including when the session finalized itself at the duration ceiling.
    pub fn artifact(&self) -> Option<AudioArtifact> {
        if let Some(session) = &self.session
            && let Ok(finished) = session.shared.finished.lock()
            && let Some((artifact, _)) = finished.as_ref()
        {
            return Some(artifact.clone());
        }
        self.artifact.clone()
    }

    /// Start a new capture session.
    ///
    /// # Errors
    /// Returns `CapscribeError::DeviceUnavailable` if the device cannot be
    /// acquired or a session is already active.
    pub fn start(&mut self) -> Result<()> {
        if self.is_active() {
            return Err(CapscribeError::DeviceUnavailable {
                message: "capture already in progress".to_string(),
            });
        }

        // Reap a session that already finalized itself (duration ceiling)
        self.reap_session();

        let mut device = (self.factory)().map_err(as_device_unavailable)?;
        device.start().map_err(as_device_unavailable)?;
        let sample_rate = device.sample_rate();

        self.artifact = None;
        self.final_duration = Duration::ZERO;

        let shared = Arc::new(CaptureShared::new());
        let thread = {
            let shared = Arc::clone(&shared);
            let clock = Arc::clone(&self.clock);
            let registry = Arc::clone(&self.registry);
            let config = self.config.clone();
            let encoding = self.encoding;
            let event_tx = self.event_tx.clone();
            thread::Builder::new()
                .name("capscribe-capture".to_string())
                .spawn(move || {
                    capture_loop(
                        device, shared, clock, config, encoding, registry, sample_rate, event_tx,
                    )
                })
                .map_err(|e| CapscribeError::AudioCapture {
                    message: format!("Failed to spawn capture thread: {}", e),
                })?
        };

        self.session = Some(CaptureSession {
            shared,
            thread: Some(thread),
            sample_rate,
        });

        if let Some(tx) = &self.event_tx {
            let _ = tx.send(RecorderEvent::Started);
        }
        Ok(())
    }

    /// Suspend chunk accumulation and the elapsed clock without releasing
    /// the device. Ignored unless currently recording.
    pub fn pause(&mut self) {
        if self.state() == RecorderState::Recording
            && let Some(session) = &self.session
        {
            session.shared.paused.store(true, Ordering::SeqCst);
        }
    }

    /// Resume a paused session. Ignored unless currently paused.
    pub fn resume(&mut self) {
        if self.state() == RecorderState::Paused
            && let Some(session) = &self.session
        {
            session.shared.paused.store(false, Ordering::SeqCst);
        }
    }

    /// Stop the session and finalize the artifact.
    ///
    /// Concatenates all accumulated chunks, encodes them under the
    /// negotiated media type, releases the device, and emits
    /// `RecorderEvent::Stopped`. Idempotent no-op (returns `None`) when no
    /// session is active.
    pub fn stop(&mut self) -> Result<Option<AudioArtifact>> {
        let Some(mut session) = self.session.take() else {
            return Ok(None);
        };

        session.shared.running.store(false, Ordering::SeqCst);
        join_capture_thread(&mut session);

        // If the capture loop hit the duration ceiling it already finalized
        // and emitted Stopped; adopt its artifact instead of encoding twice.
        if let Ok(mut finished) = session.shared.finished.lock()
            && let Some((artifact, duration)) = finished.take()
        {
            self.artifact = Some(artifact.clone());
            self.final_duration = duration;
            return Ok(Some(artifact));
        }

        let duration = Duration::from_micros(session.shared.elapsed_us.load(Ordering::SeqCst));
        let artifact = finalize_artifact(
            &session.shared,
            &self.registry,
            self.encoding,
            session.sample_rate,
        )?;

        self.artifact = Some(artifact.clone());
        self.final_duration = duration;
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(RecorderEvent::Stopped {
                artifact: artifact.clone(),
                duration,
            });
        }
        Ok(Some(artifact))
    }

    /// Discard the session: chunks, artifact, and elapsed time.
    ///
    /// Valid from any state; releases the device if held and returns to
    /// `Idle`. Does nothing when there is nothing to discard.
    pub fn cancel(&mut self) {
        if self.session.is_none() && self.artifact.is_none() {
            return;
        }

        if let Some(mut session) = self.session.take() {
            session.shared.cancelled.store(true, Ordering::SeqCst);
            session.shared.running.store(false, Ordering::SeqCst);
            join_capture_thread(&mut session);
        }

        self.artifact = None;
        self.final_duration = Duration::ZERO;
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(RecorderEvent::Cancelled);
        }
    }

    /// Join a finished/auto-stopped session, keeping its artifact if any.
    fn reap_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.shared.running.store(false, Ordering::SeqCst);
            join_capture_thread(&mut session);
            if let Ok(mut finished) = session.shared.finished.lock()
                && let Some((artifact, duration)) = finished.take()
            {
                self.artifact = Some(artifact);
                self.final_duration = duration;
            }
        }
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.shared.cancelled.store(true, Ordering::SeqCst);
            session.shared.running.store(false, Ordering::SeqCst);
            join_capture_thread(&mut session);
        }
    }
}

/// Format an elapsed duration as mm:ss.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_secs = elapsed.as_secs();
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}

fn as_device_unavailable(e: CapscribeError) -> CapscribeError {
    match e {
        e @ CapscribeError::DeviceUnavailable { .. } => e,
        other => CapscribeError::DeviceUnavailable {
            message: other.to_string(),
        },
    }
}

fn join_capture_thread(session: &mut CaptureSession) {
    if let Some(thread) = session.thread.take()
        && thread.join().is_err()
    {
        eprintln!("capscribe: capture thread panicked");
    }
}

/// Concatenate accumulated chunks and encode them into an artifact.
fn finalize_artifact(
    shared: &CaptureShared,
    registry: &EncoderRegistry,
    encoding: AudioEncoding,
    sample_rate: u32,
) -> Result<AudioArtifact> {
    let pcm: Vec<u8> = shared
        .chunks
        .lock()
        .map_err(|e| CapscribeError::Encode {
            message: format!("Failed to lock chunk buffer: {}", e),
        })?
        .iter()
        .flat_map(|chunk| chunk.iter().copied())
        .collect();

    let encoder = registry
        .encoder_for(encoding)
        .ok_or_else(|| CapscribeError::Encode {
            message: format!("no encoder registered for {:?}", encoding),
        })?;

    let data = encoder.encode(&pcm, sample_rate)?;
    Ok(AudioArtifact::new(data, encoding))
}

/// The capture loop: drains the device at the chunk interval, accumulates
/// PCM fragments and clock-derived elapsed time while not paused, emits
/// ticks, and finalizes on its own at the duration ceiling.
#[allow(clippy::too_many_arguments)]
fn capture_loop(
    mut device: Box<dyn CaptureDevice>,
    shared: Arc<CaptureShared>,
    clock: Arc<dyn Clock>,
    config: RecorderConfig,
    encoding: AudioEncoding,
    registry: Arc<EncoderRegistry>,
    sample_rate: u32,
    event_tx: Option<Sender<RecorderEvent>>,
) {
    const MAX_CONSECUTIVE_ERRORS: u32 = 10;

    let poll = config.chunk_interval;
    let tick_us = config.tick_interval.as_micros() as u64;
    let max_us = config.max_duration.as_micros() as u64;

    let mut last = clock.now();
    let mut last_tick_us: u64 = 0;
    let mut consecutive_errors: u32 = 0;
    let mut auto_stop = false;

    while shared.running.load(Ordering::SeqCst) {
        let samples = match device.read_samples() {
            Ok(s) => {
                consecutive_errors = 0;
                s
            }
            Err(e) => {
                consecutive_errors += 1;
                if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                    eprintln!(
                        "capscribe: audio capture failed {consecutive_errors} times in a row: {e}"
                    );
                    break;
                }
                thread::sleep(poll);
                continue;
            }
        };

        let now = clock.now();
        let delta = now.saturating_duration_since(last);
        last = now;

        if shared.paused.load(Ordering::SeqCst) {
            // Keep draining the device so stale audio is not delivered on
            // resume, but discard the samples and freeze the elapsed clock.
            thread::sleep(poll);
            continue;
        }

        let elapsed_us = shared
            .elapsed_us
            .fetch_add(delta.as_micros() as u64, Ordering::SeqCst)
            + delta.as_micros() as u64;

        if !samples.is_empty()
            && let Ok(mut chunks) = shared.chunks.lock()
        {
            let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
            chunks.push(bytes);
        }

        if tick_us > 0 && elapsed_us >= last_tick_us + tick_us {
            last_tick_us = elapsed_us - elapsed_us % tick_us;
            if let Some(tx) = &event_tx {
                let _ = tx.send(RecorderEvent::Tick {
                    elapsed: Duration::from_micros(elapsed_us),
                });
            }
        }

        if elapsed_us >= max_us {
            auto_stop = true;
            break;
        }

        thread::sleep(poll);
    }

    if let Err(e) = device.stop() {
        eprintln!("capscribe: failed to stop capture device: {e}");
    }

    if auto_stop && !shared.cancelled.load(Ordering::SeqCst) {
        // Duration ceiling reached: finalize here so the session is
        // self-bounding even if the owner never calls stop().
        let duration = Duration::from_micros(shared.elapsed_us.load(Ordering::SeqCst));
        match finalize_artifact(&shared, &registry, encoding, sample_rate) {
            Ok(artifact) => {
                if let Ok(mut finished) = shared.finished.lock() {
                    *finished = Some((artifact.clone(), duration));
                }
                shared.running.store(false, Ordering::SeqCst);
                if let Some(tx) = &event_tx {
                    let _ = tx.send(RecorderEvent::Stopped { artifact, duration });
                }
            }
            Err(e) => eprintln!("capscribe: failed to finalize artifact: {e}"),
        }
    }
}
