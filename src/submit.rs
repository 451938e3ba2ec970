use thiserror::Error;
use tracing::info;

/// Errors from the downstream transcript consumer.
#[derive(Debug, Clone, Error)]
pub enum SubmitError {
    #[error("submission rejected: {0}")]
    Rejected(String),
    #[error("submission target unavailable: {0}")]
    Unavailable(String),
}

/// Downstream consumer of finalized transcripts.
///
/// Observers call this when a session ends; the session core never submits
/// anything itself.
#[async_trait::async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, text: &str) -> Result<(), SubmitError>;
}

/// Submitter that logs the finalized text instead of shipping it anywhere.
pub struct LogSubmitter;

#[async_trait::async_trait]
impl Submitter for LogSubmitter {
    async fn submit(&self, text: &str) -> Result<(), SubmitError> {
        if text.is_empty() {
            info!("Session ended with an empty transcript; nothing to submit");
        } else {
            info!("Transcript submitted: {}", text);
        }
        Ok(())
    }
}
