use std::path::PathBuf;
use std::time::Duration;

/// Controller tuning for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a stop waits for the backend's final result before
    /// force-closing capture
    pub stop_grace: Duration,

    /// Capacity of the observer event channel; slow observers that fall
    /// further behind than this lose the oldest events
    pub event_capacity: usize,

    /// When set, every captured chunk is also written to
    /// `<dump_dir>/<session_id>.wav` for replay and debugging
    pub dump_dir: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            stop_grace: Duration::from_secs(3),
            event_capacity: 64,
            dump_dir: None,
        }
    }
}
