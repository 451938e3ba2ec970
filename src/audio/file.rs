// WAV file capture backend, for offline runs and tests

use hound::WavReader;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::capture::{AudioCapture, AudioChunk, CaptureConfig, CaptureError, ChunkFormat};

/// Plays a WAV file back as if it were a live input device.
///
/// Chunks are delivered at real-time cadence so the rest of the pipeline
/// behaves exactly as it does with a microphone. After the file runs out
/// the channel stays open and idle; the session keeps running until it is
/// stopped, matching a microphone that has gone quiet.
pub struct FileCapture {
    path: PathBuf,
    config: CaptureConfig,
    worker: Option<FileWorker>,
}

struct FileWorker {
    stop: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl FileCapture {
    pub fn new(path: PathBuf, config: CaptureConfig) -> Result<Self, CaptureError> {
        if !path.is_file() {
            return Err(CaptureError::DeviceUnavailable(format!(
                "audio file not found: {}",
                path.display()
            )));
        }
        Ok(Self {
            path,
            config,
            worker: None,
        })
    }

    fn load(&self) -> Result<(Vec<i16>, ChunkFormat), CaptureError> {
        let reader = WavReader::open(&self.path)
            .map_err(|e| CaptureError::ConfigFailed(format!("failed to open WAV: {e}")))?;
        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CaptureError::ConfigFailed(format!("failed to read WAV samples: {e}")))?;

        let (samples, format) = convert(samples, spec.sample_rate, spec.channels, &self.config);

        info!(
            "Audio file loaded: {} ({:.1}s, {}Hz, {} channels)",
            self.path.display(),
            samples.len() as f64 / (format.sample_rate as f64 * format.channels as f64),
            format.sample_rate,
            format.channels
        );
        Ok((samples, format))
    }
}

#[async_trait::async_trait]
impl AudioCapture for FileCapture {
    async fn open(&mut self) -> Result<mpsc::Receiver<AudioChunk>, CaptureError> {
        if self.worker.is_some() {
            return Err(CaptureError::ConfigFailed("file capture already open".into()));
        }

        let (samples, format) = self.load()?;
        let (chunk_tx, chunk_rx) = mpsc::channel(32);
        let stop = Arc::new(AtomicBool::new(false));

        let chunk_samples = self.config.chunk_samples;
        let task_stop = Arc::clone(&stop);
        let task = tokio::spawn(async move {
            deliver(samples, format, chunk_samples, chunk_tx, task_stop).await;
        });

        self.worker = Some(FileWorker { stop, task });
        Ok(chunk_rx)
    }

    async fn close(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        worker.stop.store(true, Ordering::Release);
        let _ = worker.task.await;
        info!("File capture closed");
    }

    fn is_open(&self) -> bool {
        self.worker.is_some()
    }

    fn name(&self) -> &str {
        "wav file"
    }
}

/// Paced chunk delivery at the cadence a live device would have.
async fn deliver(
    samples: Vec<i16>,
    format: ChunkFormat,
    chunk_samples: usize,
    chunk_tx: mpsc::Sender<AudioChunk>,
    stop: Arc<AtomicBool>,
) {
    let rate = format.sample_rate.max(1) as u64 * format.channels.max(1) as u64;
    let chunk_ms = (chunk_samples as u64 * 1000 / rate).max(1);
    let mut ticker = tokio::time::interval(Duration::from_millis(chunk_ms));

    let mut sequence = 0u64;
    for window in samples.chunks(chunk_samples) {
        if stop.load(Ordering::Acquire) || chunk_tx.is_closed() {
            return;
        }
        ticker.tick().await;
        let chunk = AudioChunk {
            samples: window.to_vec(),
            format,
            sequence,
        };
        sequence += 1;
        if chunk_tx.send(chunk).await.is_err() {
            return;
        }
    }

    debug!("Audio file exhausted after {} chunks, idling", sequence);
    while !stop.load(Ordering::Acquire) && !chunk_tx.is_closed() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

/// Downmix stereo to mono and decimate toward the configured rate.
fn convert(
    samples: Vec<i16>,
    file_rate: u32,
    file_channels: u16,
    config: &CaptureConfig,
) -> (Vec<i16>, ChunkFormat) {
    let (samples, channels) = if config.channels == 1 && file_channels == 2 {
        let mono = samples
            .chunks_exact(2)
            .map(|pair| {
                let sum = pair[0] as i32 + pair[1] as i32;
                sum.clamp(i16::MIN as i32, i16::MAX as i32) as i16
            })
            .collect();
        (mono, 1)
    } else {
        (samples, file_channels)
    };

    let ratio = (file_rate / config.sample_rate.max(1)).max(1) as usize;
    let samples: Vec<i16> = if ratio > 1 {
        // Step by whole frames so interleaved channels stay aligned.
        samples
            .chunks_exact(channels.max(1) as usize)
            .step_by(ratio)
            .flatten()
            .copied()
            .collect()
    } else {
        samples
    };

    (
        samples,
        ChunkFormat {
            sample_rate: file_rate / ratio as u32,
            channels,
        },
    )
}
