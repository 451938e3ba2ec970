use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use voiceline::audio::{CaptureConfig, CaptureFactory, CaptureSource, MicCapture};
use voiceline::session::{SessionConfig, SessionController, SessionEvent, SessionState};
use voiceline::submit::{LogSubmitter, Submitter};
use voiceline::transcribe::NatsTranscriber;
use voiceline::{create_router, AppState, Config};

#[derive(Parser)]
#[command(name = "voiceline")]
#[command(about = "Live microphone transcription session service")]
struct Args {
    /// Config file name, without extension
    #[arg(short, long, default_value = "config/voiceline")]
    config: String,

    /// Input device name; system default when omitted
    #[arg(short, long)]
    device: Option<String>,

    /// List input devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Directory for per-session WAV dumps of captured audio
    #[arg(long)]
    dump_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    if args.list_devices {
        for name in MicCapture::list_devices()? {
            println!("{name}");
        }
        return Ok(());
    }

    let cfg = Config::load(&args.config)
        .with_context(|| format!("Failed to load config '{}'", args.config))?;

    info!("{} starting", cfg.service.name);
    info!("STT backend: {}", cfg.stt.nats_url);

    let transcriber = NatsTranscriber::connect(&cfg.stt.nats_url).await?;

    let capture_config = CaptureConfig {
        sample_rate: cfg.audio.sample_rate,
        channels: cfg.audio.channels,
        chunk_samples: cfg.audio.chunk_samples,
    };
    let device = args.device.or_else(|| cfg.audio.device.clone());
    let capture = CaptureFactory::create(CaptureSource::Microphone { device }, capture_config)?;

    let session_config = SessionConfig {
        stop_grace: Duration::from_secs(cfg.session.stop_grace_secs),
        dump_dir: args.dump_dir,
        ..SessionConfig::default()
    };
    let controller = SessionController::spawn(capture, Box::new(transcriber), session_config);

    // Observer: log lifecycle, hand finalized transcripts to the submitter.
    let mut events = controller.subscribe();
    tokio::spawn(async move {
        let submitter = LogSubmitter;
        loop {
            match events.recv().await {
                Ok(SessionEvent::StateChanged(state)) => info!("Session state: {}", state),
                Ok(SessionEvent::TranscriptUpdated(text)) => info!("Transcript: {}", text),
                Ok(SessionEvent::Ended { transcript }) => {
                    if let Err(e) = submitter.submit(&transcript).await {
                        warn!("Transcript submission failed: {}", e);
                    }
                }
                Ok(SessionEvent::StartFailed(e)) => error!("{}", e),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Observer lagged, {} events dropped", n)
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let state = AppState::new(controller.clone());
    let app = create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(controller))
        .await?;

    info!("Shut down cleanly");
    Ok(())
}

/// Waits for ctrl-c, then stops any live session and lets it wind down
/// before the server exits.
async fn shutdown_signal(controller: SessionController) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received; stopping session");

    let mut events = controller.subscribe();
    let snapshot = match controller.snapshot().await {
        Ok(snapshot) => snapshot,
        Err(_) => return,
    };
    if snapshot.state == SessionState::Idle {
        return;
    }
    if controller.stop().await.is_err() {
        return;
    }

    // Bounded wait so shutdown can never hang on a silent backend.
    let wound_down = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match events.recv().await {
                Ok(SessionEvent::StateChanged(SessionState::Idle)) | Err(_) => break,
                _ => {}
            }
        }
    })
    .await;
    if wound_down.is_err() {
        warn!("Session did not wind down in time");
    }
}
