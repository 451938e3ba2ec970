use serde::Serialize;
use tracing::debug;

use crate::transcribe::TranscriptionResult;

/// The controller's accumulated view of recognition output.
///
/// Mutated only by applying [`TranscriptionResult`]s; observers read it
/// through published events and snapshots, never write it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Transcript {
    /// Best text so far, partial until `is_final`
    pub current_text: String,
    /// Whether the backend has committed this text
    pub is_final: bool,
    #[serde(skip)]
    last_sequence: Option<u64>,
}

impl Transcript {
    /// Apply one recognition result; returns whether observers should be
    /// notified of a text update.
    ///
    /// Empty-text results never overwrite the accumulated text, so a
    /// backend that flickers to a blank hypothesis cannot blank the
    /// display. Results older than the last applied sequence are dropped.
    pub fn apply(&mut self, result: &TranscriptionResult) -> bool {
        if let Some(last) = self.last_sequence {
            if result.sequence < last {
                debug!(
                    "Dropping stale result (sequence {} < {})",
                    result.sequence, last
                );
                return false;
            }
        }
        self.last_sequence = Some(result.sequence);

        if result.is_final {
            self.is_final = true;
        }
        if result.text.is_empty() {
            return false;
        }

        self.current_text = result.text.clone();
        true
    }

    /// Clear everything for the next session.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
