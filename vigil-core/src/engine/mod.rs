//! `ScreeningEngine` — top-level lifecycle controller.
//!
//! ## Lifecycle
//!
//! ```text
//! ScreeningEngine::new()
//!     └─► start()        → source opened, session spawned, phase = Running
//!         ├─► (loop decides / budget expires)   → phase = Finalizing → Idle
//!         └─► stop()     → cancel token set, session finalizes within one
//!                          chunk interval using accumulated evidence
//! ```
//!
//! Exactly one session may run at a time. `start()` while Running and
//! `stop()` while Idle both return an error rather than queueing or
//! panicking. Occupancy and cancellation are separate: `start()` wins the
//! `running` slot with a compare-exchange and only the session's own
//! finalization tail releases it, while `stop()` raises a per-session cancel
//! token. A `start()` issued between `stop()` and the old session's exit
//! therefore fails with `AlreadyRunning` instead of overlapping it.
//!
//! ## Threading
//!
//! The session loop is blocking (chunk capture and transcription are
//! synchronous I/O), so `start()` moves it onto a `spawn_blocking` thread
//! and returns once the audio source confirms it opened. A sync mpsc ack
//! carries the open result back to the caller; the Decision itself travels
//! over a oneshot whose consumed sender makes exactly-once delivery
//! structural.

pub(crate) mod cascade;
pub mod session;

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use parking_lot::Mutex;
use tokio::sync::{broadcast, oneshot};
use tracing::info;

use crate::{
    audio::AudioChunkSource,
    error::{Result, VigilError},
    events::{ActivityEvent, Decision, SessionPhase, StatusEvent, TranscriptEvent},
    transcribe::TranscriberHandle,
};

/// Broadcast channel capacity: 256 events buffered for slow consumers.
const BROADCAST_CAP: usize = 256;

/// Analysis budget bounds, milliseconds.
const MIN_BUDGET_MS: u64 = 5_000;
const MAX_BUDGET_MS: u64 = 20_000;
/// Chunk interval bounds, milliseconds.
const MIN_CHUNK_INTERVAL_MS: u64 = 500;
const MAX_CHUNK_INTERVAL_MS: u64 = 5_000;

/// Per-session configuration for `ScreeningEngine`.
///
/// Supplied once when a session starts and immutable for its lifetime.
#[derive(Debug, Clone)]
pub struct ScreeningConfig {
    /// Hard time budget for the whole session (ms). Clamped to
    /// [5000, 20000] at the public boundary. Default: 12000.
    pub budget_ms: u64,
    /// Duration of each captured chunk (ms). Default: 2000.
    pub chunk_interval_ms: u64,
    /// The user's display name; a caller saying it is strong legitimacy
    /// evidence. May be empty.
    pub user_name: String,
    /// Family names; any of them spoken is near-decisive legitimacy evidence.
    pub family_names: Vec<String>,
    /// User-supplied emergency keywords checked ahead of the built-in sets.
    pub custom_keywords: Vec<String>,
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            budget_ms: 12_000,
            chunk_interval_ms: 2_000,
            user_name: String::new(),
            family_names: Vec::new(),
            custom_keywords: Vec::new(),
        }
    }
}

impl ScreeningConfig {
    /// Copy of this config with out-of-range timings clamped.
    ///
    /// Applied by `start()`; interior session code takes whatever it is
    /// given, so tests can run with millisecond budgets.
    pub fn normalized(&self) -> Self {
        Self {
            budget_ms: self.budget_ms.clamp(MIN_BUDGET_MS, MAX_BUDGET_MS),
            chunk_interval_ms: self
                .chunk_interval_ms
                .clamp(MIN_CHUNK_INTERVAL_MS, MAX_CHUNK_INTERVAL_MS),
            user_name: self.user_name.clone(),
            family_names: self.family_names.clone(),
            custom_keywords: self.custom_keywords.clone(),
        }
    }
}

/// Receives the one Decision a session produces.
///
/// Returned by `ScreeningEngine::start`. The sender is consumed on delivery,
/// so a second decision for the same session cannot exist.
#[derive(Debug)]
pub struct SessionHandle {
    rx: oneshot::Receiver<Decision>,
}

impl SessionHandle {
    /// Wait for the session's Decision.
    ///
    /// # Errors
    /// Returns an error if the session thread died without delivering one.
    pub async fn decision(self) -> Result<Decision> {
        self.rx
            .await
            .map_err(|_| VigilError::Other(anyhow::anyhow!("session ended without a decision")))
    }

    /// Blocking variant of [`decision`](Self::decision) for synchronous hosts
    /// and tests. Must not be called from an async context.
    pub fn blocking_decision(self) -> Result<Decision> {
        self.rx
            .blocking_recv()
            .map_err(|_| VigilError::Other(anyhow::anyhow!("session ended without a decision")))
    }
}

/// The top-level engine handle.
///
/// `ScreeningEngine` is `Send + Sync` — all fields use interior mutability.
/// Wrap in `Arc<ScreeningEngine>` to share between the call-control side
/// (which calls `stop()` when the caller hangs up) and event consumers.
pub struct ScreeningEngine {
    config: ScreeningConfig,
    transcriber: TranscriberHandle,
    /// Occupancy slot: `true` from a winning `start()` until that session's
    /// finalization tail releases it.
    running: Arc<AtomicBool>,
    /// Cancel token of the current session; replaced on every `start()`.
    cancel: Mutex<Option<Arc<AtomicBool>>>,
    /// Canonical phase (written by the session thread, read from hosts).
    phase: Arc<Mutex<SessionPhase>>,
    /// Broadcast sender for transcript events.
    transcript_tx: broadcast::Sender<TranscriptEvent>,
    /// Broadcast sender for phase change events.
    status_tx: broadcast::Sender<StatusEvent>,
    /// Broadcast sender for per-chunk activity events.
    activity_tx: broadcast::Sender<ActivityEvent>,
    /// Monotonically increasing transcript sequence counter.
    seq: Arc<AtomicU64>,
    /// Shared session diagnostics counters.
    diagnostics: Arc<session::SessionDiagnostics>,
}

impl ScreeningEngine {
    /// Create a new engine. Does not start screening — call `start()` when a
    /// call comes in.
    pub fn new(config: ScreeningConfig, transcriber: TranscriberHandle) -> Self {
        let (transcript_tx, _) = broadcast::channel(BROADCAST_CAP);
        let (status_tx, _) = broadcast::channel(BROADCAST_CAP);
        let (activity_tx, _) = broadcast::channel(BROADCAST_CAP);
        let diagnostics = Arc::new(session::SessionDiagnostics::default());

        Self {
            config,
            transcriber,
            running: Arc::new(AtomicBool::new(false)),
            cancel: Mutex::new(None),
            phase: Arc::new(Mutex::new(SessionPhase::Idle)),
            transcript_tx,
            status_tx,
            activity_tx,
            seq: Arc::new(AtomicU64::new(0)),
            diagnostics,
        }
    }

    /// Start screening one call with the engine's configuration.
    ///
    /// Blocks until the audio source confirms it opened (or fails), then
    /// returns a [`SessionHandle`] for the Decision. The session continues
    /// in a background blocking thread.
    ///
    /// # Errors
    /// - `VigilError::AlreadyRunning` if a session is active; the running
    ///   session is unaffected.
    /// - Whatever `AudioChunkSource::start` returned, if the source failed
    ///   to open; no session is created and no Decision will be delivered.
    pub fn start(
        &self,
        phone_number: impl Into<String>,
        source: Box<dyn AudioChunkSource>,
    ) -> Result<SessionHandle> {
        self.start_with_config(phone_number, self.config.clone(), source)
    }

    /// Start screening with a per-call configuration override.
    pub fn start_with_config(
        &self,
        phone_number: impl Into<String>,
        config: ScreeningConfig,
        source: Box<dyn AudioChunkSource>,
    ) -> Result<SessionHandle> {
        // Occupancy guard: the slot stays held until the winning session's
        // finalization tail clears it, so a stopped-but-still-finalizing
        // session blocks its successor.
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(VigilError::AlreadyRunning);
        }

        let phone_number = phone_number.into();
        self.diagnostics.reset();
        session::set_phase(&self.phase, &self.status_tx, SessionPhase::Running, None);

        // Fresh cancel token per session: a stop() aimed at the previous
        // session can never cancel this one.
        let cancel = Arc::new(AtomicBool::new(false));
        *self.cancel.lock() = Some(Arc::clone(&cancel));

        let (decision_tx, decision_rx) = oneshot::channel();
        let ctx = session::SessionContext {
            config: config.normalized(),
            caller: phone_number.clone(),
            source,
            transcriber: self.transcriber.clone(),
            running: Arc::clone(&self.running),
            cancel,
            phase: Arc::clone(&self.phase),
            transcript_tx: self.transcript_tx.clone(),
            status_tx: self.status_tx.clone(),
            activity_tx: self.activity_tx.clone(),
            seq: Arc::clone(&self.seq),
            decision_tx,
            diagnostics: Arc::clone(&self.diagnostics),
        };

        // Sync ack: the session thread reports the source-open result so a
        // dead audio path fails start() instead of a doomed session.
        let (open_tx, open_rx) = std::sync::mpsc::channel::<Result<()>>();

        tokio::task::spawn_blocking(move || {
            let mut ctx = ctx;
            match ctx.source.start() {
                Ok(()) => {
                    let _ = open_tx.send(Ok(()));
                }
                Err(e) => {
                    let _ = open_tx.send(Err(e));
                    return;
                }
            }
            session::run(ctx);
        });

        match open_rx.recv() {
            Ok(Ok(())) => {
                info!(caller = %phone_number, "screening session started");
                Ok(SessionHandle { rx: decision_rx })
            }
            Ok(Err(e)) => {
                self.running.store(false, Ordering::SeqCst);
                session::set_phase(
                    &self.phase,
                    &self.status_tx,
                    SessionPhase::Idle,
                    Some(e.to_string()),
                );
                Err(e)
            }
            Err(_) => {
                // Channel closed before a message was sent — session task panicked?
                self.running.store(false, Ordering::SeqCst);
                session::set_phase(
                    &self.phase,
                    &self.status_tx,
                    SessionPhase::Idle,
                    Some("session failed to start".into()),
                );
                Err(VigilError::Other(anyhow::anyhow!(
                    "session task died unexpectedly"
                )))
            }
        }
    }

    /// Request cancellation of the running session.
    ///
    /// Cooperative: the loop observes the raised cancel token within one
    /// chunk interval and finalizes with the evidence accumulated so far.
    /// The Decision still arrives on the session's `SessionHandle`. The
    /// engine stays occupied until that finalization completes, so a
    /// `start()` in the meantime fails with `AlreadyRunning`.
    ///
    /// # Errors
    /// - `VigilError::NotRunning` if no session is active.
    pub fn stop(&self) -> Result<()> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(VigilError::NotRunning);
        }

        if let Some(cancel) = self.cancel.lock().as_ref() {
            cancel.store(true, Ordering::SeqCst);
        }
        info!("session stop requested");
        Ok(())
    }

    /// Current session phase (snapshot).
    pub fn phase(&self) -> SessionPhase {
        *self.phase.lock()
    }

    /// Subscribe to transcript fragment events.
    pub fn subscribe_transcripts(&self) -> broadcast::Receiver<TranscriptEvent> {
        self.transcript_tx.subscribe()
    }

    /// Subscribe to phase change events.
    pub fn subscribe_status(&self) -> broadcast::Receiver<StatusEvent> {
        self.status_tx.subscribe()
    }

    /// Subscribe to per-chunk activity events (RMS, beep score, spam best).
    pub fn subscribe_activity(&self) -> broadcast::Receiver<ActivityEvent> {
        self.activity_tx.subscribe()
    }

    /// Snapshot of session counters for observability.
    pub fn diagnostics_snapshot(&self) -> session::DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_clamps_budget_and_interval() {
        let config = ScreeningConfig {
            budget_ms: 500,
            chunk_interval_ms: 60_000,
            ..ScreeningConfig::default()
        };
        let normalized = config.normalized();
        assert_eq!(normalized.budget_ms, 5_000);
        assert_eq!(normalized.chunk_interval_ms, 5_000);

        let config = ScreeningConfig {
            budget_ms: 90_000,
            chunk_interval_ms: 1,
            ..ScreeningConfig::default()
        };
        let normalized = config.normalized();
        assert_eq!(normalized.budget_ms, 20_000);
        assert_eq!(normalized.chunk_interval_ms, 500);
    }

    #[test]
    fn normalized_keeps_in_range_values() {
        let config = ScreeningConfig::default();
        let normalized = config.normalized();
        assert_eq!(normalized.budget_ms, 12_000);
        assert_eq!(normalized.chunk_interval_ms, 2_000);
    }

    #[test]
    fn stop_without_a_session_is_an_error() {
        let engine = ScreeningEngine::new(
            ScreeningConfig::default(),
            TranscriberHandle::new(crate::transcribe::ScriptedTranscriber::new(Vec::new())),
        );
        assert!(matches!(engine.stop(), Err(VigilError::NotRunning)));
        assert_eq!(engine.phase(), SessionPhase::Idle);
    }
}
