use anyhow::{Context, Result};
use async_nats::Client;
use base64::Engine;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::messages::{AudioFrameMessage, TranscriptMessage};
use super::stream::{StreamError, StreamItem, TranscriptionResult, TranscriptionStream};
use crate::audio::AudioChunk;

/// Subject carrying recognition output, partial and final.
/// The STT service publishes to stt.text.partial and stt.text.final;
/// messages are filtered by session_id in the payload.
const TRANSCRIPT_SUBJECT: &str = "stt.text.>";

/// How many results may queue before the consumer picks them up.
const RESULT_QUEUE: usize = 64;

/// Streaming transcription over NATS.
///
/// Each `open` starts a fresh backend session under a new id: audio frames
/// go out on `audio.frame.<session_id>` and recognition results come back
/// on [`TRANSCRIPT_SUBJECT`], filtered to this session. `finish` publishes
/// an empty frame with the final marker set so the backend flushes its last
/// result.
pub struct NatsTranscriber {
    client: Client,
    session: Option<OpenSession>,
}

struct OpenSession {
    session_id: String,
    forwarder: JoinHandle<()>,
    chunk_index: u64,
    /// (sample_rate, channels) of the last fed chunk, for the final marker
    format: (u32, u16),
    finished: bool,
}

impl NatsTranscriber {
    /// Connect to the NATS server backing the STT service.
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self {
            client,
            session: None,
        })
    }

    fn frame_subject(session_id: &str) -> String {
        format!("audio.frame.{session_id}")
    }
}

#[async_trait::async_trait]
impl TranscriptionStream for NatsTranscriber {
    async fn open(&mut self) -> Result<mpsc::Receiver<StreamItem>, StreamError> {
        if self.session.is_some() {
            // No two backend sessions may be live at once; a leftover from
            // a session that was never canceled gets canceled now.
            warn!("Previous transcription session still open, canceling it");
            self.cancel().await;
        }

        let session_id = Uuid::new_v4().to_string();

        let mut subscriber = self
            .client
            .subscribe(TRANSCRIPT_SUBJECT)
            .await
            .map_err(|e| StreamError::BackendUnavailable(e.to_string()))?;

        let (tx, rx) = mpsc::channel(RESULT_QUEUE);
        let sid = session_id.clone();
        let forwarder = tokio::spawn(async move {
            let mut local_seq = 0u64;
            while let Some(msg) = subscriber.next().await {
                let parsed: TranscriptMessage = match serde_json::from_slice(&msg.payload) {
                    Ok(m) => m,
                    Err(e) => {
                        debug!("Ignoring malformed transcript message: {}", e);
                        continue;
                    }
                };
                if parsed.session_id != sid {
                    continue;
                }

                let sequence = if parsed.sequence > 0 {
                    parsed.sequence
                } else {
                    local_seq
                };
                local_seq = sequence + 1;

                if parsed.confidence > 0.0 {
                    debug!(
                        "Transcript confidence {:.2} (partial={})",
                        parsed.confidence, parsed.partial
                    );
                }

                let result = TranscriptionResult {
                    text: parsed.text,
                    is_final: !parsed.partial,
                    sequence,
                };
                if tx.send(Ok(result)).await.is_err() {
                    // Consumer is gone; nothing left to forward to.
                    return;
                }
            }

            // The subscription only ends early if the connection dropped.
            let _ = tx
                .send(Err(StreamError::BackendUnavailable(
                    "transcript subscription closed".into(),
                )))
                .await;
        });

        info!("Opened transcription session {}", session_id);

        self.session = Some(OpenSession {
            session_id,
            forwarder,
            chunk_index: 0,
            format: (16000, 1),
            finished: false,
        });

        Ok(rx)
    }

    async fn feed(&mut self, chunk: &AudioChunk) -> Result<(), StreamError> {
        // The capture path races with teardown; audio arriving after finish
        // or cancel is dropped silently per the stream contract.
        let Some(session) = self.session.as_mut() else {
            debug!("Dropping chunk {}: no open session", chunk.sequence);
            return Ok(());
        };
        if session.finished {
            debug!("Dropping chunk {}: session finalizing", chunk.sequence);
            return Ok(());
        }

        let mut pcm = Vec::with_capacity(chunk.samples.len() * 2);
        for sample in &chunk.samples {
            pcm.extend_from_slice(&sample.to_le_bytes());
        }

        let message = AudioFrameMessage {
            session_id: session.session_id.clone(),
            pcm: base64::engine::general_purpose::STANDARD.encode(&pcm),
            sample_rate: chunk.format.sample_rate,
            channels: chunk.format.channels,
            timestamp: chrono::Utc::now().to_rfc3339(),
            final_frame: false,
            chunk_index: session.chunk_index,
        };

        let payload = serde_json::to_vec(&message)
            .map_err(|e| StreamError::BackendUnavailable(e.to_string()))?;

        self.client
            .publish(Self::frame_subject(&session.session_id), payload.into())
            .await
            .map_err(|e| StreamError::BackendUnavailable(e.to_string()))?;

        debug!(
            "Published audio frame (chunk={}, samples={})",
            session.chunk_index,
            chunk.samples.len()
        );

        session.chunk_index += 1;
        session.format = (chunk.format.sample_rate, chunk.format.channels);
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), StreamError> {
        let Some(session) = self.session.as_mut() else {
            debug!("Finish requested with no open session");
            return Ok(());
        };
        if session.finished {
            return Ok(());
        }

        // Empty frame with the final marker tells the backend to flush
        // its last result for this session.
        let message = AudioFrameMessage {
            session_id: session.session_id.clone(),
            pcm: String::new(),
            sample_rate: session.format.0,
            channels: session.format.1,
            timestamp: chrono::Utc::now().to_rfc3339(),
            final_frame: true,
            chunk_index: session.chunk_index,
        };

        let payload = serde_json::to_vec(&message)
            .map_err(|e| StreamError::BackendUnavailable(e.to_string()))?;

        self.client
            .publish(Self::frame_subject(&session.session_id), payload.into())
            .await
            .map_err(|e| StreamError::BackendUnavailable(e.to_string()))?;

        session.finished = true;
        info!(
            "Requested finalization for session {} after {} chunks",
            session.session_id, session.chunk_index
        );
        Ok(())
    }

    async fn cancel(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        session.forwarder.abort();
        info!("Canceled transcription session {}", session.session_id);
    }

    fn is_open(&self) -> bool {
        self.session.is_some()
    }

    fn name(&self) -> &str {
        "nats-stt"
    }
}
