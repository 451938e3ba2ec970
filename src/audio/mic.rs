// Microphone capture backend using cpal

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::capture::{AudioCapture, AudioChunk, CaptureConfig, CaptureError, ChunkFormat};

/// How many chunks may queue between the capture thread and the consumer.
const CHUNK_QUEUE: usize = 32;

/// Microphone capture backend.
///
/// The cpal stream is not `Send`, so a dedicated thread owns it for the
/// lifetime of the capture. Samples are converted to i16, downmixed and
/// decimated frame by frame toward the configured format, and delivered as
/// fixed-size chunks over a bounded channel.
pub struct MicCapture {
    device_name: Option<String>,
    config: CaptureConfig,
    worker: Option<Worker>,
}

struct Worker {
    stop: Arc<AtomicBool>,
    thread: std::thread::JoinHandle<()>,
}

impl MicCapture {
    pub fn new(device_name: Option<String>, config: CaptureConfig) -> Self {
        Self {
            device_name,
            config,
            worker: None,
        }
    }

    /// List input device names, default device first.
    pub fn list_devices() -> Result<Vec<String>, CaptureError> {
        let host = cpal::default_host();
        let default_name = host
            .default_input_device()
            .and_then(|d| d.name().ok());

        let mut names = Vec::new();
        if let Some(name) = &default_name {
            names.push(name.clone());
        }
        let devices = host
            .input_devices()
            .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;
        for device in devices {
            if let Ok(name) = device.name() {
                if Some(&name) != default_name.as_ref() {
                    names.push(name);
                }
            }
        }
        Ok(names)
    }
}

#[async_trait::async_trait]
impl AudioCapture for MicCapture {
    async fn open(&mut self) -> Result<mpsc::Receiver<AudioChunk>, CaptureError> {
        if self.worker.is_some() {
            return Err(CaptureError::ConfigFailed(
                "microphone capture already open".into(),
            ));
        }

        let (chunk_tx, chunk_rx) = mpsc::channel(CHUNK_QUEUE);
        let (ready_tx, ready_rx) = oneshot::channel();
        let stop = Arc::new(AtomicBool::new(false));

        let device_name = self.device_name.clone();
        let config = self.config.clone();
        let thread_stop = Arc::clone(&stop);

        let thread = std::thread::Builder::new()
            .name("mic-capture".into())
            .spawn(move || run_capture(device_name, config, chunk_tx, ready_tx, thread_stop))
            .map_err(|e| CaptureError::ConfigFailed(format!("capture thread spawn: {e}")))?;

        match ready_rx.await {
            Ok(Ok(format)) => {
                info!(
                    "Microphone capture open ({}Hz, {} channels, {} samples/chunk)",
                    format.sample_rate, format.channels, self.config.chunk_samples
                );
                self.worker = Some(Worker { stop, thread });
                Ok(chunk_rx)
            }
            Ok(Err(e)) => Err(e),
            // Thread died before reporting; treat as a configuration failure.
            Err(_) => Err(CaptureError::ConfigFailed(
                "capture thread exited during setup".into(),
            )),
        }
    }

    async fn close(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        info!("Closing microphone capture");
        worker.stop.store(true, Ordering::Release);
        let handle = worker.thread;
        let _ = tokio::task::spawn_blocking(move || {
            let _ = handle.join();
        })
        .await;
        info!("Microphone capture closed");
    }

    fn is_open(&self) -> bool {
        self.worker.is_some()
    }

    fn name(&self) -> &str {
        "cpal microphone"
    }
}

impl Drop for MicCapture {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.stop.store(true, Ordering::Release);
        }
    }
}

/// Capture thread body: owns the cpal stream from creation to teardown.
fn run_capture(
    device_name: Option<String>,
    config: CaptureConfig,
    chunk_tx: mpsc::Sender<AudioChunk>,
    ready_tx: oneshot::Sender<Result<ChunkFormat, CaptureError>>,
    stop: Arc<AtomicBool>,
) {
    let setup = open_stream(device_name, &config, chunk_tx, Arc::clone(&stop));
    let stream = match setup {
        Ok((stream, format)) => {
            let _ = ready_tx.send(Ok(format));
            stream
        }
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    while !stop.load(Ordering::Acquire) {
        std::thread::park_timeout(Duration::from_millis(50));
    }

    // Dropping the stream stops the device callbacks and releases the device.
    drop(stream);
}

fn open_stream(
    device_name: Option<String>,
    config: &CaptureConfig,
    chunk_tx: mpsc::Sender<AudioChunk>,
    stop: Arc<AtomicBool>,
) -> Result<(cpal::Stream, ChunkFormat), CaptureError> {
    let host = cpal::default_host();

    let device = match &device_name {
        Some(name) => host
            .input_devices()
            .map_err(|e| classify(e.to_string(), Fallback::Device))?
            .find(|d| d.name().map(|n| &n == name).unwrap_or(false))
            .ok_or_else(|| {
                CaptureError::DeviceUnavailable(format!("input device '{name}' not found"))
            })?,
        None => host.default_input_device().ok_or_else(|| {
            CaptureError::DeviceUnavailable("no default input device".into())
        })?,
    };

    let device_label = device.name().unwrap_or_else(|_| "unknown".into());
    debug!("Using input device: {}", device_label);

    let supported = device
        .default_input_config()
        .map_err(|e| classify(e.to_string(), Fallback::Config))?;
    let native_rate = supported.sample_rate().0;
    let native_channels = supported.channels();
    let stream_config: StreamConfig = supported.config();

    let format = delivered_format(native_rate, native_channels, config);
    let conv = Converter::new(native_rate, native_channels, config, format, chunk_tx);

    let err_stop = Arc::clone(&stop);
    let on_error = move |err: cpal::StreamError| {
        warn!("Capture stream error: {}", err);
        // The run loop sees the flag, drops the stream, and the chunk
        // channel closes; the consumer treats that as capture failure.
        err_stop.store(true, Ordering::Release);
    };

    let stream = match supported.sample_format() {
        SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, conv, on_error),
        SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, conv, on_error),
        SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, conv, on_error),
        other => {
            return Err(CaptureError::ConfigFailed(format!(
                "unsupported input sample format {other:?}"
            )))
        }
    }
    .map_err(|e| classify(e.to_string(), Fallback::Config))?;

    // A play failure means the device never activated; surface it instead
    // of proceeding half-configured.
    stream
        .play()
        .map_err(|e| classify(e.to_string(), Fallback::Config))?;

    info!(
        "Capture running on '{}' ({}Hz {}ch native -> {}Hz {}ch delivered)",
        device_label, native_rate, native_channels, format.sample_rate, format.channels
    );

    Ok((stream, format))
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    mut conv: Converter,
    on_error: impl FnMut(cpal::StreamError) + Send + 'static,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::Sample + cpal::SizedSample + Send + 'static,
    f32: cpal::FromSample<T>,
{
    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            conv.push(data.iter().map(|&s| {
                let f: f32 = cpal::Sample::from_sample(s);
                (f * i16::MAX as f32) as i16
            }));
        },
        on_error,
        None,
    )
}

/// Format actually delivered after downmix and decimation.
fn delivered_format(native_rate: u32, native_channels: u16, config: &CaptureConfig) -> ChunkFormat {
    let channels = if config.channels == 1 && native_channels == 2 {
        1
    } else {
        native_channels
    };
    let ratio = (native_rate / config.sample_rate.max(1)).max(1);
    ChunkFormat {
        sample_rate: native_rate / ratio,
        channels,
    }
}

/// Converts native-format samples into delivery chunks.
///
/// Samples are regrouped into whole frames so interleaved channels stay
/// aligned: decimation keeps or drops entire frames, and a kept frame is
/// either emitted with all its channel samples or summed to one mono sample
/// with clamping when mono is requested. Upsampling is never attempted.
struct Converter {
    native_channels: usize,
    downmix: bool,
    decimate: u32,
    phase: u32,
    frame: Vec<i16>,
    buffer: Vec<i16>,
    chunk_samples: usize,
    format: ChunkFormat,
    sequence: u64,
    chunk_tx: mpsc::Sender<AudioChunk>,
}

impl Converter {
    fn new(
        native_rate: u32,
        native_channels: u16,
        config: &CaptureConfig,
        format: ChunkFormat,
        chunk_tx: mpsc::Sender<AudioChunk>,
    ) -> Self {
        let native_channels = native_channels.max(1) as usize;
        Self {
            native_channels,
            downmix: config.channels == 1 && native_channels == 2,
            decimate: (native_rate / config.sample_rate.max(1)).max(1),
            phase: 0,
            frame: Vec::with_capacity(native_channels),
            buffer: Vec::with_capacity(config.chunk_samples),
            chunk_samples: config.chunk_samples,
            format,
            sequence: 0,
            chunk_tx,
        }
    }

    fn push(&mut self, samples: impl Iterator<Item = i16>) {
        for sample in samples {
            // A frame may span callback boundaries; hold partial frames
            // until every channel sample has arrived.
            self.frame.push(sample);
            if self.frame.len() < self.native_channels {
                continue;
            }

            // The decimation phase advances once per frame, never per
            // sample, so channel interleaving survives any ratio.
            let keep = self.phase == 0;
            self.phase = (self.phase + 1) % self.decimate;

            if keep {
                if self.downmix {
                    let sum = self.frame[0] as i32 + self.frame[1] as i32;
                    self.buffer
                        .push(sum.clamp(i16::MIN as i32, i16::MAX as i32) as i16);
                } else {
                    self.buffer.extend_from_slice(&self.frame);
                }
                if self.buffer.len() >= self.chunk_samples {
                    self.flush();
                }
            }
            self.frame.clear();
        }
    }

    fn flush(&mut self) {
        let samples = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.chunk_samples));
        let chunk = AudioChunk {
            samples,
            format: self.format,
            sequence: self.sequence,
        };
        self.sequence += 1;

        // try_send keeps the audio callback non-blocking; a full queue means
        // the consumer fell behind and the chunk is dropped.
        if let Err(mpsc::error::TrySendError::Full(_)) = self.chunk_tx.try_send(chunk) {
            debug!("Chunk queue full, dropping chunk {}", self.sequence - 1);
        }
    }
}

enum Fallback {
    Device,
    Config,
}

/// Best-effort classification of cpal's stringly backend errors.
fn classify(message: String, fallback: Fallback) -> CaptureError {
    let lower = message.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("not permitted") {
        return CaptureError::PermissionDenied(message);
    }
    if lower.contains("in use") || lower.contains("busy") || lower.contains("unavailable") {
        return CaptureError::DeviceUnavailable(message);
    }
    match fallback {
        Fallback::Device => CaptureError::DeviceUnavailable(message),
        Fallback::Config => CaptureError::ConfigFailed(message),
    }
}
