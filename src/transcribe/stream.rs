use thiserror::Error;
use tokio::sync::mpsc;

use crate::audio::AudioChunk;

/// One recognition result from the backend.
///
/// Results arrive in sequence order. A partial result replaces the previous
/// partial; a final result commits the utterance and ends the stream's
/// output for this session.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionResult {
    /// Recognized text, cumulative for the session so far
    pub text: String,
    /// True when the backend will not revise this text further
    pub is_final: bool,
    /// Backend-assigned position of this result
    pub sequence: u64,
}

/// Errors raised by a transcription stream.
#[derive(Debug, Clone, Error)]
pub enum StreamError {
    #[error("transcription backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("transcription timed out: {0}")]
    Timeout(String),
    #[error("transcription canceled")]
    Canceled,
}

/// Item type of the result channel: recognition output or stream failure.
pub type StreamItem = Result<TranscriptionResult, StreamError>;

/// Streaming speech-to-text session.
///
/// `open` acquires a backend session and returns the result channel.
/// `feed` ships captured audio to the backend; `finish` signals end of
/// audio while results keep flowing until the backend emits its final.
/// `cancel` abandons the session immediately and is idempotent: canceling
/// a closed or never-opened stream is a no-op, so teardown paths can call
/// it unconditionally.
#[async_trait::async_trait]
pub trait TranscriptionStream: Send {
    /// Open a recognition session with the backend.
    async fn open(&mut self) -> Result<mpsc::Receiver<StreamItem>, StreamError>;

    /// Ship one captured chunk to the backend.
    async fn feed(&mut self, chunk: &AudioChunk) -> Result<(), StreamError>;

    /// Signal end of audio. The backend finalizes and emits its last result.
    async fn finish(&mut self) -> Result<(), StreamError>;

    /// Abandon the session without waiting for finalization.
    async fn cancel(&mut self);

    /// Whether a backend session is currently open.
    fn is_open(&self) -> bool;

    /// Backend name for logging.
    fn name(&self) -> &str;
}
