use chrono::{DateTime, Utc};
use serde::Serialize;

use super::events::SessionState;
use super::transcript::Transcript;

/// Counters for one session attempt.
///
/// Numbers survive until the next start, so a snapshot taken after a
/// session ends still describes the finished session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionStats {
    /// When the current (or last) session started
    pub started_at: Option<DateTime<Utc>>,

    /// Session duration in seconds, still ticking while active
    pub duration_secs: f64,

    /// Audio chunks forwarded to the transcription stream
    pub chunks_forwarded: u64,

    /// Recognition results that updated the transcript
    pub results_applied: u64,
}

/// Point-in-time view of the controller, served by the HTTP surface.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionState,

    /// Id of the current (or last) session attempt
    pub session_id: Option<String>,

    pub transcript: Transcript,

    pub stats: SessionStats,
}
