use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::warn;

use super::capture::{AudioChunk, ChunkFormat};

/// Writes captured chunks to a WAV file.
///
/// Used by the debug dump path: when configured, every chunk the session
/// consumes is also appended here, so a recording can be replayed through
/// [`FileCapture`](super::FileCapture) later.
pub struct WavSink {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    path: PathBuf,
    format: ChunkFormat,
    samples_written: usize,
}

impl WavSink {
    pub fn create(path: PathBuf, format: ChunkFormat) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create dump directory: {:?}", parent))?;
        }

        let spec = hound::WavSpec {
            channels: format.channels,
            sample_rate: format.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let writer = hound::WavWriter::create(&path, spec)
            .with_context(|| format!("Failed to create WAV file: {:?}", path))?;

        Ok(Self {
            writer: Some(writer),
            path,
            format,
            samples_written: 0,
        })
    }

    pub fn write_chunk(&mut self, chunk: &AudioChunk) -> Result<()> {
        if chunk.format != self.format {
            // Format drift would corrupt the file; skip rather than abort
            // the session over a debug artifact.
            warn!(
                "Chunk format {:?} differs from sink format {:?}, skipping",
                chunk.format, self.format
            );
            return Ok(());
        }
        if let Some(writer) = &mut self.writer {
            for &sample in &chunk.samples {
                writer
                    .write_sample(sample)
                    .context("Failed to write sample to WAV")?;
            }
            self.samples_written += chunk.samples.len();
        }
        Ok(())
    }

    pub fn samples_written(&self) -> usize {
        self.samples_written
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn finish(mut self) -> Result<PathBuf> {
        if let Some(writer) = self.writer.take() {
            writer.finalize().context("Failed to finalize WAV file")?;
        }
        Ok(self.path.clone())
    }
}

impl Drop for WavSink {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                warn!("Failed to finalize WAV sink on drop: {}", e);
            }
        }
    }
}
