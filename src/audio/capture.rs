use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::mpsc;

/// PCM format of a captured chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChunkFormat {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of interleaved channels
    pub channels: u16,
}

impl ChunkFormat {
    pub fn mono_16khz() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
        }
    }
}

/// One fixed-size slice of captured audio.
///
/// Chunks are produced by an [`AudioCapture`] backend and handed off by value;
/// nothing downstream shares the sample buffer with the capture path.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Raw samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// PCM format of `samples`
    pub format: ChunkFormat,
    /// Monotonic position of this chunk within the capture session
    pub sequence: u64,
}

impl AudioChunk {
    /// Duration covered by this chunk in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        let frames = self.samples.len() as u64 / self.format.channels.max(1) as u64;
        frames * 1000 / self.format.sample_rate.max(1) as u64
    }
}

/// Configuration for capture backends.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Target sample rate in Hz
    pub sample_rate: u32,
    /// Target channel count (1 = mono)
    pub channels: u16,
    /// Samples per delivered chunk
    pub chunk_samples: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // 16kHz for speech recognition
            channels: 1,        // Mono
            chunk_samples: 1024,
        }
    }
}

/// Errors raised when acquiring or running the capture device.
#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    #[error("microphone permission denied: {0}")]
    PermissionDenied(String),
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("capture configuration failed: {0}")]
    ConfigFailed(String),
}

/// Audio capture backend trait.
///
/// Implementations:
/// - [`MicCapture`](super::MicCapture): cpal input device (all platforms)
/// - [`FileCapture`](super::FileCapture): WAV playback at real-time cadence,
///   for offline runs and tests
///
/// `open` acquires the device and returns the chunk delivery channel; the
/// backend keeps delivering fixed-size chunks on its own cadence until
/// `close` is called or the device fails. `close` is idempotent: closing an
/// already-closed or never-opened backend is a no-op, so it is safe to call
/// from teardown paths that race with each other.
#[async_trait::async_trait]
pub trait AudioCapture: Send {
    /// Start capturing audio.
    ///
    /// A configuration or activation failure is an error here; the backend
    /// must never begin delivery half-configured.
    async fn open(&mut self) -> Result<mpsc::Receiver<AudioChunk>, CaptureError>;

    /// Stop capturing and release the device.
    async fn close(&mut self);

    /// Whether the backend currently holds an open device.
    fn is_open(&self) -> bool;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// Capture source selection.
#[derive(Debug, Clone)]
pub enum CaptureSource {
    /// Input device; `None` picks the system default
    Microphone { device: Option<String> },
    /// WAV file played back as if it were live input
    File(PathBuf),
}

/// Capture backend factory.
pub struct CaptureFactory;

impl CaptureFactory {
    /// Create a capture backend for the given source.
    pub fn create(
        source: CaptureSource,
        config: CaptureConfig,
    ) -> Result<Box<dyn AudioCapture>, CaptureError> {
        match source {
            CaptureSource::Microphone { device } => {
                let backend = super::mic::MicCapture::new(device, config);
                Ok(Box::new(backend))
            }
            CaptureSource::File(path) => {
                let backend = super::file::FileCapture::new(path, config)?;
                Ok(Box::new(backend))
            }
        }
    }
}
