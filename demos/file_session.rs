// File Session Example: WAV playback through the full session path
//
// Plays a WAV file as if it were live microphone input, streaming it to the
// STT backend at real-time cadence. Useful for testing the pipeline without
// a capture device or for replaying dumped sessions.
//
// Prerequisites:
// - NATS server running: docker run -p 4222:4222 nats
// - An STT service consuming audio.frame.* and publishing stt.text.*
//
// Usage: cargo run --example file_session -- --input recording.wav

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

use voiceline::audio::{CaptureConfig, CaptureFactory, CaptureSource};
use voiceline::session::{SessionConfig, SessionController, SessionEvent, SessionState};
use voiceline::transcribe::NatsTranscriber;

#[derive(Parser)]
#[command(name = "file_session")]
#[command(about = "Transcribe a WAV file through the live session path")]
struct Args {
    /// WAV file to play back as live input
    #[arg(short, long)]
    input: PathBuf,

    /// How long to let the session run, in seconds
    #[arg(short, long, default_value = "30")]
    duration: u64,

    /// NATS server URL
    #[arg(long, default_value = "nats://localhost:4222")]
    nats_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    info!("🎧 File-backed transcription session: {}", args.input.display());

    let transcriber = NatsTranscriber::connect(&args.nats_url).await?;

    let capture = CaptureFactory::create(
        CaptureSource::File(args.input.clone()),
        CaptureConfig::default(),
    )?;

    let controller =
        SessionController::spawn(capture, Box::new(transcriber), SessionConfig::default());

    let mut events = controller.subscribe();

    controller.start().await?;
    info!("▶️  Streaming file audio for up to {} seconds", args.duration);

    let outcome = timeout(Duration::from_secs(args.duration), async {
        loop {
            match events.recv().await {
                Ok(SessionEvent::TranscriptUpdated(text)) => info!("📝 {}", text),
                Ok(SessionEvent::Ended { transcript }) => return Some(transcript),
                Ok(SessionEvent::StartFailed(e)) => {
                    warn!("❌ {}", e);
                    return None;
                }
                Ok(_) => {}
                Err(_) => return None,
            }
        }
    })
    .await;

    match outcome {
        Ok(Some(transcript)) => info!("🏁 Final transcript: {}", transcript),
        Ok(None) => warn!("Session ended without a transcript"),
        Err(_) => {
            info!("⏰ Time limit reached; stopping session");
            controller.stop().await?;
            let _ = timeout(Duration::from_secs(8), async {
                loop {
                    match events.recv().await {
                        Ok(SessionEvent::Ended { transcript }) => {
                            info!("🏁 Final transcript: {}", transcript);
                            break;
                        }
                        Ok(SessionEvent::StateChanged(SessionState::Idle)) | Err(_) => break,
                        _ => {}
                    }
                }
            })
            .await;
        }
    }

    info!("Done");
    Ok(())
}
