// Wire format tests for the NATS STT contract
//
// These tests pin the JSON shapes exchanged with the transcription
// service: audio frames published per session and transcript results
// coming back. The field names are part of the protocol, so the
// assertions check raw JSON text, not just round-trips.

use base64::{engine::general_purpose, Engine as _};
use voiceline::transcribe::{AudioFrameMessage, TranscriptMessage};

#[test]
fn test_audio_frame_serialization() {
    let samples: Vec<i16> = vec![100, -200, 300, -400];
    let pcm_bytes: Vec<u8> = samples.iter().flat_map(|&s| s.to_le_bytes()).collect();

    let frame = AudioFrameMessage {
        session_id: "session-test-123".to_string(),
        pcm: general_purpose::STANDARD.encode(&pcm_bytes),
        sample_rate: 16000,
        channels: 1,
        timestamp: "2025-01-15T10:30:00Z".to_string(),
        final_frame: false,
        chunk_index: 3,
    };

    let json = serde_json::to_string(&frame).unwrap();

    assert!(json.contains("\"session_id\":\"session-test-123\""));
    assert!(json.contains("\"sample_rate\":16000"));
    assert!(json.contains("\"channels\":1"));
    assert!(json.contains("\"chunk_index\":3"));
    // The wire field is "final", not "final_frame"
    assert!(json.contains("\"final\":false"));
    assert!(!json.contains("final_frame"));
}

#[test]
fn test_audio_frame_final_marker() {
    // The end-of-session marker carries no audio, only the flag
    let frame = AudioFrameMessage {
        session_id: "session-test-456".to_string(),
        pcm: String::new(),
        sample_rate: 16000,
        channels: 1,
        timestamp: "2025-01-15T10:31:00Z".to_string(),
        final_frame: true,
        chunk_index: 17,
    };

    let json = serde_json::to_string(&frame).unwrap();

    assert!(json.contains("\"final\":true"));
    assert!(json.contains("\"pcm\":\"\""));
}

#[test]
fn test_audio_frame_roundtrip() {
    let frame = AudioFrameMessage {
        session_id: "session-rt".to_string(),
        pcm: "AAEAAg==".to_string(),
        sample_rate: 44100,
        channels: 2,
        timestamp: "2025-01-15T10:32:00Z".to_string(),
        final_frame: false,
        chunk_index: 9,
    };

    let json = serde_json::to_string(&frame).unwrap();
    let parsed: AudioFrameMessage = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed.session_id, frame.session_id);
    assert_eq!(parsed.pcm, frame.pcm);
    assert_eq!(parsed.sample_rate, frame.sample_rate);
    assert_eq!(parsed.channels, frame.channels);
    assert_eq!(parsed.final_frame, frame.final_frame);
    assert_eq!(parsed.chunk_index, frame.chunk_index);
}

#[test]
fn test_transcript_message_deserialization() {
    let json = r#"{
        "session_id": "session-test-789",
        "text": "hello world",
        "partial": true,
        "timestamp": "2025-01-15T10:33:00Z",
        "confidence": 0.92,
        "sequence": 4
    }"#;

    let msg: TranscriptMessage = serde_json::from_str(json).unwrap();

    assert_eq!(msg.session_id, "session-test-789");
    assert_eq!(msg.text, "hello world");
    assert!(msg.partial);
    assert!((msg.confidence - 0.92).abs() < f32::EPSILON);
    assert_eq!(msg.sequence, 4);
}

#[test]
fn test_transcript_message_optional_fields_default() {
    // Older STT builds omit confidence and sequence entirely
    let json = r#"{
        "session_id": "session-test-old",
        "text": "legacy result",
        "partial": false,
        "timestamp": "2025-01-15T10:34:00Z"
    }"#;

    let msg: TranscriptMessage = serde_json::from_str(json).unwrap();

    assert_eq!(msg.text, "legacy result");
    assert!(!msg.partial);
    assert_eq!(msg.confidence, 0.0);
    assert_eq!(msg.sequence, 0);
}

#[test]
fn test_pcm_base64_roundtrip() {
    let original: Vec<i16> = vec![0, 1000, -1000, i16::MAX, i16::MIN, 42];

    let bytes: Vec<u8> = original.iter().flat_map(|&s| s.to_le_bytes()).collect();
    let encoded = general_purpose::STANDARD.encode(&bytes);
    let decoded_bytes = general_purpose::STANDARD.decode(&encoded).unwrap();
    let decoded: Vec<i16> = decoded_bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect();

    assert_eq!(decoded, original);
}
