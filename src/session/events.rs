use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::audio::CaptureError;
use crate::transcribe::StreamError;

/// Lifecycle states of a recording session.
///
/// The controller owns exactly one state at a time and is the single source
/// of truth for whether capture and stream resources exist. At most one
/// capture and one stream are open while the state is `Starting` or
/// `Active`; both are confirmed closed before the state returns to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Starting,
    Active,
    Stopping,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Idle => "idle",
            SessionState::Starting => "starting",
            SessionState::Active => "active",
            SessionState::Stopping => "stopping",
        };
        f.write_str(s)
    }
}

/// What failed while bringing a session up.
#[derive(Debug, Clone, Error)]
pub enum StartReason {
    #[error("audio capture: {0}")]
    Capture(#[from] CaptureError),
    #[error("transcription stream: {0}")]
    Stream(#[from] StreamError),
}

/// Session-level errors.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// A session is already starting, active, or stopping.
    #[error("a session is already active")]
    AlreadyActive,
    /// The start attempt failed and the session rolled back to idle.
    #[error("session start failed: {0}")]
    StartFailed(StartReason),
    /// The controller task is gone; no further commands can be served.
    #[error("session controller is shut down")]
    Shutdown,
}

/// Events published to session observers.
///
/// Observers receive these on a broadcast channel and pump them on whatever
/// context suits them; the controller never blocks on an observer. Every
/// exit from `Starting`/`Active`/`Stopping` produces exactly one `Ended` or
/// `StartFailed`, except a stop issued during `Starting`, which cancels the
/// attempt with state changes only.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The session moved to a new lifecycle state.
    StateChanged(SessionState),
    /// The running transcript changed; carries the full current text.
    TranscriptUpdated(String),
    /// The session is over; carries the final accumulated transcript.
    Ended { transcript: String },
    /// The start attempt failed; the session is back to idle.
    StartFailed(SessionError),
}
