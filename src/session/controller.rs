use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::config::SessionConfig;
use super::events::{SessionError, SessionEvent, SessionState, StartReason};
use super::stats::{SessionSnapshot, SessionStats};
use super::transcript::Transcript;
use crate::audio::{AudioCapture, AudioChunk, WavSink};
use crate::transcribe::{StreamError, StreamItem, TranscriptionStream};

enum Command {
    Start {
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
}

/// Handle to the session controller actor.
///
/// The actor owns the capture backend, the transcription stream, the
/// session state, and the transcript; commands and the two delivery
/// channels are serialized through one select loop, so a chunk arrival and
/// a result arrival can never interleave a state transition.
///
/// The handle is cheap to clone and every clone talks to the same session.
/// `start`/`stop` return as soon as the actor accepts the request; progress
/// and completion arrive as [`SessionEvent`]s on the broadcast channel from
/// [`subscribe`](Self::subscribe). When the last handle drops, the actor
/// tears down any live session and exits.
#[derive(Clone)]
pub struct SessionController {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionController {
    /// Spawn the controller actor owning the given backends.
    pub fn spawn(
        capture: Box<dyn AudioCapture>,
        stream: Box<dyn TranscriptionStream>,
        config: SessionConfig,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::channel(16);
        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));

        let actor = SessionActor {
            state: SessionState::Idle,
            transcript: Transcript::default(),
            meter: SessionMeter::default(),
            config,
            events: event_tx.clone(),
            commands: command_rx,
            capture: Some(capture),
            stream: Some(stream),
            chunks: None,
            results: None,
            opening: None,
            cancel_requested: false,
            grace_deadline: None,
            dump_target: None,
            dump: None,
        };
        tokio::spawn(actor.run());

        Self {
            commands: command_tx,
            events: event_tx,
        }
    }

    /// Request a session start.
    ///
    /// `Ok` means the attempt is underway; the outcome arrives as events
    /// (`StateChanged(Active)` or `StartFailed`). Fails with
    /// [`SessionError::AlreadyActive`] when a session is already underway.
    pub async fn start(&self) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Start { reply: tx })
            .await
            .map_err(|_| SessionError::Shutdown)?;
        rx.await.map_err(|_| SessionError::Shutdown)?
    }

    /// Request a stop.
    ///
    /// No-op while idle. During `Starting` the in-flight open is canceled;
    /// during `Active` the stream is asked to finalize and capture keeps
    /// running until the final result or the grace deadline.
    pub async fn stop(&self) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Stop { reply: tx })
            .await
            .map_err(|_| SessionError::Shutdown)?;
        rx.await.map_err(|_| SessionError::Shutdown)
    }

    /// Current state, transcript, and counters.
    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Snapshot { reply: tx })
            .await
            .map_err(|_| SessionError::Shutdown)?;
        rx.await.map_err(|_| SessionError::Shutdown)
    }

    /// Subscribe to session events. Each observer pumps its own receiver on
    /// whatever context suits it; the controller never blocks on observers.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

/// What the open task hands back: the backends return to the actor whether
/// the open succeeded or not.
struct OpenOutcome {
    capture: Box<dyn AudioCapture>,
    stream: Box<dyn TranscriptionStream>,
    result: Result<(mpsc::Receiver<AudioChunk>, mpsc::Receiver<StreamItem>), StartReason>,
}

/// Opens the transcription stream, then capture, rolling the stream back
/// if capture fails so nothing stays half-open. Runs as its own task so the
/// actor stays responsive to a cancel while hardware and network opens are
/// in flight.
async fn open_resources(
    mut stream: Box<dyn TranscriptionStream>,
    mut capture: Box<dyn AudioCapture>,
) -> OpenOutcome {
    let results = match stream.open().await {
        Ok(rx) => rx,
        Err(e) => {
            return OpenOutcome {
                capture,
                stream,
                result: Err(StartReason::Stream(e)),
            }
        }
    };

    match capture.open().await {
        Ok(chunks) => OpenOutcome {
            capture,
            stream,
            result: Ok((chunks, results)),
        },
        Err(e) => {
            stream.cancel().await;
            OpenOutcome {
                capture,
                stream,
                result: Err(StartReason::Capture(e)),
            }
        }
    }
}

struct SessionActor {
    state: SessionState,
    transcript: Transcript,
    meter: SessionMeter,
    config: SessionConfig,
    events: broadcast::Sender<SessionEvent>,
    commands: mpsc::Receiver<Command>,

    // Backends live here except while the open task holds them.
    capture: Option<Box<dyn AudioCapture>>,
    stream: Option<Box<dyn TranscriptionStream>>,

    // Present only while a session is up.
    chunks: Option<mpsc::Receiver<AudioChunk>>,
    results: Option<mpsc::Receiver<StreamItem>>,

    // Present only while `Starting`.
    opening: Option<JoinHandle<OpenOutcome>>,
    cancel_requested: bool,

    // Present only while `Stopping` after a user stop.
    grace_deadline: Option<Instant>,

    dump_target: Option<std::path::PathBuf>,
    dump: Option<WavSink>,
}

impl SessionActor {
    async fn run(mut self) {
        debug!("Session controller running");
        loop {
            tokio::select! {
                cmd = self.commands.recv() => {
                    match cmd {
                        Some(cmd) => self.handle_command(cmd).await,
                        None => break,
                    }
                }
                outcome = join_open(&mut self.opening), if self.opening.is_some() => {
                    self.opening = None;
                    self.handle_open_outcome(outcome).await;
                }
                chunk = next_chunk(&mut self.chunks), if self.chunks.is_some() => {
                    self.handle_chunk(chunk).await;
                }
                item = next_result(&mut self.results), if self.results.is_some() => {
                    self.handle_result(item).await;
                }
                _ = wait_deadline(self.grace_deadline), if self.grace_deadline.is_some() => {
                    self.handle_grace_expired().await;
                }
            }
        }
        self.shutdown().await;
        debug!("Session controller stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Start { reply } => {
                if self.state != SessionState::Idle {
                    let _ = reply.send(Err(SessionError::AlreadyActive));
                    return;
                }
                let _ = reply.send(Ok(()));
                self.begin_start().await;
            }
            Command::Stop { reply } => {
                let _ = reply.send(());
                self.request_stop().await;
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    async fn begin_start(&mut self) {
        let session_id = format!("session-{}", Uuid::new_v4());
        info!("Starting {}", session_id);
        // The previous session's transcript and counters stay readable
        // until a new attempt begins.
        self.transcript.reset();
        self.meter.begin(session_id);
        self.cancel_requested = false;
        self.set_state(SessionState::Starting);

        let (stream, capture) = match (self.stream.take(), self.capture.take()) {
            (Some(stream), Some(capture)) => (stream, capture),
            (stream, capture) => {
                self.stream = stream;
                self.capture = capture;
                error!("Session backends missing; a previous open task was lost");
                self.fail_start(
                    StreamError::BackendUnavailable("session backends lost".into()).into(),
                )
                .await;
                return;
            }
        };

        self.opening = Some(tokio::spawn(open_resources(stream, capture)));
    }

    async fn handle_open_outcome(&mut self, outcome: Result<OpenOutcome, tokio::task::JoinError>) {
        let OpenOutcome {
            capture,
            stream,
            result,
        } = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Session open task failed: {}", e);
                self.fail_start(
                    StreamError::BackendUnavailable("session open task failed".into()).into(),
                )
                .await;
                return;
            }
        };

        self.capture = Some(capture);
        self.stream = Some(stream);

        if self.cancel_requested {
            // A stop arrived mid-open: whatever opened gets closed and the
            // attempt vanishes without an Ended or StartFailed.
            drop(result);
            self.abort_start().await;
            return;
        }

        match result {
            Ok((chunks, results)) => {
                self.chunks = Some(chunks);
                self.results = Some(results);
                if let (Some(dir), Some(id)) = (&self.config.dump_dir, &self.meter.session_id) {
                    self.dump_target = Some(dir.join(format!("{id}.wav")));
                }
                info!(
                    "Session {} active",
                    self.meter.session_id.as_deref().unwrap_or("?")
                );
                self.set_state(SessionState::Active);
            }
            Err(reason) => self.fail_start(reason).await,
        }
    }

    async fn request_stop(&mut self) {
        match self.state {
            SessionState::Idle => debug!("Stop requested while idle; nothing to do"),
            SessionState::Starting => {
                info!("Stop requested during startup; canceling open");
                self.cancel_requested = true;
            }
            SessionState::Active => {
                info!("Stop requested; waiting for the final result");
                self.set_state(SessionState::Stopping);
                let finished = match self.stream.as_mut() {
                    Some(stream) => stream.finish().await,
                    None => Ok(()),
                };
                match finished {
                    Ok(()) => {
                        // Capture keeps running until the backend confirms
                        // or the grace deadline passes.
                        self.grace_deadline = Some(Instant::now() + self.config.stop_grace);
                    }
                    Err(e) => {
                        warn!("Finalization request failed: {}", e);
                        self.end_session().await;
                    }
                }
            }
            SessionState::Stopping => debug!("Stop requested while already stopping"),
        }
    }

    async fn handle_chunk(&mut self, chunk: Option<AudioChunk>) {
        let Some(chunk) = chunk else {
            self.chunks = None;
            match self.state {
                SessionState::Active => {
                    warn!("Capture chunk channel closed while active");
                    self.set_state(SessionState::Stopping);
                    self.end_session().await;
                }
                SessionState::Stopping => {
                    // The grace deadline still bounds the wait for a final.
                    debug!("Capture channel closed during stop");
                }
                _ => {}
            }
            return;
        };

        if self.state != SessionState::Active {
            // Chunks racing a teardown are dropped.
            return;
        }

        self.maybe_dump(&chunk);

        let fed = match self.stream.as_mut() {
            Some(stream) => stream.feed(&chunk).await,
            None => Ok(()),
        };
        match fed {
            Ok(()) => self.meter.chunks_forwarded += 1,
            Err(e) => {
                warn!("Feeding transcription stream failed: {}", e);
                self.set_state(SessionState::Stopping);
                self.end_session().await;
            }
        }
    }

    async fn handle_result(&mut self, item: Option<StreamItem>) {
        let Some(item) = item else {
            self.results = None;
            match self.state {
                SessionState::Active => {
                    warn!("Result channel closed without a final result");
                    self.set_state(SessionState::Stopping);
                    self.end_session().await;
                }
                SessionState::Stopping => {
                    debug!("Result channel closed during stop");
                    self.end_session().await;
                }
                _ => {}
            }
            return;
        };

        match item {
            Ok(result) => {
                let is_final = result.is_final;
                debug!(
                    "Result {} (final={}, {} chars)",
                    result.sequence,
                    is_final,
                    result.text.len()
                );
                if self.transcript.apply(&result) {
                    self.meter.results_applied += 1;
                    self.publish(SessionEvent::TranscriptUpdated(
                        self.transcript.current_text.clone(),
                    ));
                }
                if is_final {
                    info!("Final transcript received");
                    if self.state == SessionState::Active {
                        self.set_state(SessionState::Stopping);
                    }
                    self.end_session().await;
                }
            }
            Err(e) => {
                warn!("Transcription stream error: {}", e);
                if self.state == SessionState::Active {
                    self.set_state(SessionState::Stopping);
                }
                self.end_session().await;
            }
        }
    }

    async fn handle_grace_expired(&mut self) {
        self.grace_deadline = None;
        warn!(
            "No final result within {:?}; force-closing capture",
            self.config.stop_grace
        );
        self.end_session().await;
    }

    /// The one teardown path. Everything that brings a session down goes
    /// through here, whatever the trigger was.
    async fn close_resources(&mut self) {
        self.grace_deadline = None;
        self.chunks = None;
        self.results = None;
        self.dump_target = None;
        if let Some(sink) = self.dump.take() {
            let samples = sink.samples_written();
            match sink.finish() {
                Ok(path) => info!("Audio dump written: {} ({} samples)", path.display(), samples),
                Err(e) => warn!("Audio dump finalize failed: {:#}", e),
            }
        }
        if let Some(capture) = self.capture.as_mut() {
            capture.close().await;
        }
        if let Some(stream) = self.stream.as_mut() {
            stream.cancel().await;
        }
    }

    async fn end_session(&mut self) {
        self.close_resources().await;
        self.meter.freeze();
        let transcript = self.transcript.current_text.clone();
        info!(
            "Session {} ended ({} chars, {} chunks forwarded)",
            self.meter.session_id.as_deref().unwrap_or("?"),
            transcript.len(),
            self.meter.chunks_forwarded
        );
        self.publish(SessionEvent::Ended { transcript });
        self.set_state(SessionState::Idle);
    }

    async fn fail_start(&mut self, reason: StartReason) {
        warn!("Session start failed: {}", reason);
        self.close_resources().await;
        self.meter.freeze();
        self.publish(SessionEvent::StartFailed(SessionError::StartFailed(reason)));
        self.set_state(SessionState::Idle);
    }

    async fn abort_start(&mut self) {
        info!("Start canceled before completion");
        self.close_resources().await;
        self.meter.freeze();
        self.set_state(SessionState::Idle);
    }

    async fn shutdown(&mut self) {
        if let Some(handle) = self.opening.take() {
            if let Ok(OpenOutcome {
                capture,
                stream,
                result,
            }) = handle.await
            {
                self.capture = Some(capture);
                self.stream = Some(stream);
                drop(result);
            }
        }
        match self.state {
            SessionState::Idle => {}
            SessionState::Starting => {
                info!("Shutting down with a start in flight");
                self.close_resources().await;
                self.set_state(SessionState::Idle);
            }
            SessionState::Active | SessionState::Stopping => {
                info!("Shutting down with an active session");
                self.end_session().await;
            }
        }
    }

    fn maybe_dump(&mut self, chunk: &AudioChunk) {
        if self.dump.is_none() {
            // The sink is created on the first chunk, once the delivered
            // format is known.
            let Some(path) = self.dump_target.take() else {
                return;
            };
            match WavSink::create(path, chunk.format) {
                Ok(sink) => self.dump = Some(sink),
                Err(e) => {
                    warn!("Could not create WAV dump: {:#}", e);
                    return;
                }
            }
        }
        if let Some(sink) = self.dump.as_mut() {
            if let Err(e) = sink.write_chunk(chunk) {
                warn!("WAV dump failed, disabling: {:#}", e);
                self.dump = None;
            }
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            session_id: self.meter.session_id.clone(),
            transcript: self.transcript.clone(),
            stats: self.meter.stats(),
        }
    }

    fn set_state(&mut self, next: SessionState) {
        if self.state == next {
            return;
        }
        debug!("Session state {} -> {}", self.state, next);
        self.state = next;
        self.publish(SessionEvent::StateChanged(next));
    }

    fn publish(&self, event: SessionEvent) {
        // Send only fails when nobody is subscribed, which is fine.
        let _ = self.events.send(event);
    }
}

#[derive(Default)]
struct SessionMeter {
    session_id: Option<String>,
    started_at: Option<DateTime<Utc>>,
    started_instant: Option<std::time::Instant>,
    finished_secs: Option<f64>,
    chunks_forwarded: u64,
    results_applied: u64,
}

impl SessionMeter {
    fn begin(&mut self, session_id: String) {
        *self = Self {
            session_id: Some(session_id),
            started_at: Some(Utc::now()),
            started_instant: Some(std::time::Instant::now()),
            ..Self::default()
        };
    }

    fn freeze(&mut self) {
        if self.finished_secs.is_none() {
            self.finished_secs = self.started_instant.map(|s| s.elapsed().as_secs_f64());
        }
    }

    fn stats(&self) -> SessionStats {
        let duration_secs = self.finished_secs.unwrap_or_else(|| {
            self.started_instant
                .map(|s| s.elapsed().as_secs_f64())
                .unwrap_or(0.0)
        });
        SessionStats {
            started_at: self.started_at,
            duration_secs,
            chunks_forwarded: self.chunks_forwarded,
            results_applied: self.results_applied,
        }
    }
}

async fn join_open(
    opening: &mut Option<JoinHandle<OpenOutcome>>,
) -> Result<OpenOutcome, tokio::task::JoinError> {
    match opening {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

async fn next_chunk(chunks: &mut Option<mpsc::Receiver<AudioChunk>>) -> Option<AudioChunk> {
    match chunks {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn next_result(results: &mut Option<mpsc::Receiver<StreamItem>>) -> Option<StreamItem> {
    match results {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn wait_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
