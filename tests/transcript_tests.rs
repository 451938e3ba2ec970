// Unit tests for transcript reconciliation
//
// The Transcript type folds a stream of partial and final recognition
// results into one displayable text. These tests cover the rules that
// matter for the UI: empty hypotheses never blank accumulated text,
// stale results are dropped, and a final result latches the state.

use voiceline::session::Transcript;
use voiceline::transcribe::TranscriptionResult;

fn partial(text: &str, sequence: u64) -> TranscriptionResult {
    TranscriptionResult {
        text: text.to_string(),
        is_final: false,
        sequence,
    }
}

fn final_result(text: &str, sequence: u64) -> TranscriptionResult {
    TranscriptionResult {
        text: text.to_string(),
        is_final: true,
        sequence,
    }
}

#[test]
fn test_partial_updates_text() {
    let mut transcript = Transcript::default();

    let applied = transcript.apply(&partial("hel", 0));

    assert!(applied, "non-empty partial should notify observers");
    assert_eq!(transcript.current_text, "hel");
    assert!(!transcript.is_final);
}

#[test]
fn test_later_partial_replaces_earlier() {
    let mut transcript = Transcript::default();

    transcript.apply(&partial("hel", 0));
    transcript.apply(&partial("hello", 1));

    assert_eq!(transcript.current_text, "hello");
}

#[test]
fn test_empty_partial_is_suppressed() {
    let mut transcript = Transcript::default();

    transcript.apply(&partial("hello", 0));
    let applied = transcript.apply(&partial("", 1));

    assert!(!applied, "empty hypothesis must not notify observers");
    assert_eq!(
        transcript.current_text, "hello",
        "empty hypothesis must not blank accumulated text"
    );
}

#[test]
fn test_empty_partial_on_fresh_transcript() {
    let mut transcript = Transcript::default();

    let applied = transcript.apply(&partial("", 0));

    assert!(!applied);
    assert_eq!(transcript.current_text, "");
}

#[test]
fn test_final_latches_state() {
    let mut transcript = Transcript::default();

    transcript.apply(&partial("hello", 0));
    let applied = transcript.apply(&final_result("hello world", 1));

    assert!(applied);
    assert!(transcript.is_final);
    assert_eq!(transcript.current_text, "hello world");
}

#[test]
fn test_empty_final_keeps_last_partial() {
    // A final with no text still commits the session, but the last
    // good partial remains the transcript.
    let mut transcript = Transcript::default();

    transcript.apply(&partial("almost done", 0));
    let applied = transcript.apply(&final_result("", 1));

    assert!(!applied, "empty final carries no text update");
    assert!(transcript.is_final, "final flag still latches");
    assert_eq!(transcript.current_text, "almost done");
}

#[test]
fn test_stale_sequence_is_dropped() {
    let mut transcript = Transcript::default();

    transcript.apply(&partial("newer", 5));
    let applied = transcript.apply(&partial("older", 3));

    assert!(!applied, "result older than the last applied must be dropped");
    assert_eq!(transcript.current_text, "newer");
}

#[test]
fn test_stale_final_does_not_latch() {
    let mut transcript = Transcript::default();

    transcript.apply(&partial("current", 10));
    let applied = transcript.apply(&final_result("ghost", 2));

    assert!(!applied);
    assert!(!transcript.is_final, "stale results must not latch the final flag");
    assert_eq!(transcript.current_text, "current");
}

#[test]
fn test_equal_sequence_is_applied() {
    // Sequences are non-decreasing, not strictly increasing; a backend
    // may re-emit the same ordinal with refined text.
    let mut transcript = Transcript::default();

    transcript.apply(&partial("first", 7));
    let applied = transcript.apply(&partial("first pass", 7));

    assert!(applied);
    assert_eq!(transcript.current_text, "first pass");
}

#[test]
fn test_reset_clears_everything() {
    let mut transcript = Transcript::default();

    transcript.apply(&final_result("done", 12));
    transcript.reset();

    assert_eq!(transcript.current_text, "");
    assert!(!transcript.is_final);

    // After reset, low sequences from a new session apply again
    let applied = transcript.apply(&partial("fresh start", 0));
    assert!(applied);
    assert_eq!(transcript.current_text, "fresh start");
}
