pub mod messages;
pub mod nats;
pub mod stream;

pub use messages::{AudioFrameMessage, TranscriptMessage};
pub use nats::NatsTranscriber;
pub use stream::{StreamError, StreamItem, TranscriptionResult, TranscriptionStream};
