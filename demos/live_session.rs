// Live Session Example: microphone to real-time transcript
//
// This example runs the complete session pipeline:
// 1. cpal captures microphone audio as fixed-size chunks
// 2. The session controller feeds chunks to the NATS STT backend
// 3. Partial transcripts stream back and overwrite the current line
// 4. Stop finalizes the transcript and hands it to the submitter
//
// Prerequisites:
// - NATS server running: docker run -p 4222:4222 nats
// - An STT service consuming audio.frame.* and publishing stt.text.*
//
// Usage: cargo run --example live_session -- --duration 15

use anyhow::Result;
use clap::Parser;
use std::io::Write;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::timeout;
use tracing::{info, warn};

use voiceline::audio::{CaptureConfig, CaptureFactory, CaptureSource};
use voiceline::session::{SessionConfig, SessionController, SessionEvent, SessionState};
use voiceline::submit::{LogSubmitter, Submitter};
use voiceline::transcribe::NatsTranscriber;

#[derive(Parser)]
#[command(name = "live_session")]
#[command(about = "Record and transcribe from the microphone")]
struct Args {
    /// Duration to record in seconds
    #[arg(short, long, default_value = "15")]
    duration: u64,

    /// Input device name; system default when omitted
    #[arg(long)]
    device: Option<String>,

    /// NATS server URL
    #[arg(long, default_value = "nats://localhost:4222")]
    nats_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    info!("🎙️  Live transcription session");

    let transcriber = NatsTranscriber::connect(&args.nats_url).await?;
    info!("✅ Connected to NATS at {}", args.nats_url);

    let capture = CaptureFactory::create(
        CaptureSource::Microphone {
            device: args.device.clone(),
        },
        CaptureConfig::default(),
    )?;
    info!("✅ Capture backend ready: {}", capture.name());

    let controller =
        SessionController::spawn(capture, Box::new(transcriber), SessionConfig::default());

    // Terminal observer: partials overwrite the line, finals commit it.
    let mut events = controller.subscribe();
    let observer = tokio::spawn(async move {
        let submitter = LogSubmitter;
        loop {
            match events.recv().await {
                Ok(SessionEvent::StateChanged(state)) => info!("Session state: {}", state),
                Ok(SessionEvent::TranscriptUpdated(text)) => {
                    print!("\r{}", text);
                    std::io::stdout().flush().ok();
                }
                Ok(SessionEvent::Ended { transcript }) => {
                    println!();
                    info!("🏁 Session ended ({} chars)", transcript.len());
                    if let Err(e) = submitter.submit(&transcript).await {
                        warn!("Submission failed: {}", e);
                    }
                    break;
                }
                Ok(SessionEvent::StartFailed(e)) => {
                    warn!("❌ {}", e);
                    break;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Observer lagged, {} events dropped", n)
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Watch for the end of the session on a second subscription so the
    // observer task keeps its own pace.
    let mut lifecycle = controller.subscribe();

    controller.start().await?;
    info!(
        "🎤 Recording for {} seconds; speak into your microphone!",
        args.duration
    );

    tokio::time::sleep(Duration::from_secs(args.duration)).await;

    info!("⏹️  Stopping session");
    controller.stop().await?;

    let wound_down = timeout(Duration::from_secs(8), async {
        loop {
            match lifecycle.recv().await {
                Ok(SessionEvent::StateChanged(SessionState::Idle)) | Err(_) => break,
                _ => {}
            }
        }
    })
    .await;
    if wound_down.is_err() {
        warn!("⏱️  Session did not wind down in time");
    }

    let _ = timeout(Duration::from_secs(2), observer).await;

    info!("Done");
    Ok(())
}
