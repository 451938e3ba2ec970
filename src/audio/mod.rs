pub mod capture;
pub mod file;
pub mod mic;
pub mod wav;

pub use capture::{
    AudioCapture, AudioChunk, CaptureConfig, CaptureError, CaptureFactory, CaptureSource,
    ChunkFormat,
};
pub use file::FileCapture;
pub use mic::MicCapture;
pub use wav::WavSink;
