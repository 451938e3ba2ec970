pub mod audio;
pub mod config;
pub mod http;
pub mod session;
pub mod submit;
pub mod transcribe;

pub use audio::{
    AudioCapture, AudioChunk, CaptureConfig, CaptureError, CaptureFactory, CaptureSource,
    ChunkFormat, FileCapture, MicCapture, WavSink,
};
pub use config::Config;
pub use http::{create_router, AppState};
pub use session::{
    SessionConfig, SessionController, SessionError, SessionEvent, SessionSnapshot, SessionState,
    SessionStats, StartReason, Transcript,
};
pub use submit::{LogSubmitter, SubmitError, Submitter};
pub use transcribe::{
    AudioFrameMessage, NatsTranscriber, StreamError, StreamItem, TranscriptMessage,
    TranscriptionResult, TranscriptionStream,
};
