//! Blocking session loop.
//!
//! ## Loop stages (per chunk)
//!
//! ```text
//! 1. Capture one chunk from the AudioChunkSource (bounded by the interval)
//! 2. Frequency beep detection          → positive decides Robot, exit
//! 3. Transcribe; append any fragment to the running transcript
//! 4. Text-pattern robot detection      → positive decides Robot, exit
//! 5. Evidence cascade (names, custom keywords, emergency, legitimacy)
//!                                      → first hit decides, exit
//! 6. Spam classification               → recorded, never decisive mid-loop
//! 7. Short pause, then back to 1 while inside the time budget
//! ```
//!
//! The whole loop runs in `spawn_blocking`, keeping the Tokio executor free
//! for the host's own I/O. Cancellation is cooperative: the session's cancel
//! token is checked at loop entry and again after the blocking capture call,
//! so a stop request is honoured within one chunk interval. Every exit path —
//! decided, budget exhausted, cancelled, capture failure — funnels through
//! the same finalization tail, which releases the audio source, resets the
//! transcriber, frees the engine's occupancy slot, and delivers the Decision
//! exactly once.

use std::sync::{
    atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, error, info, warn};

use crate::audio::AudioChunkSource;
use crate::classify::{ClassificationEvidence, RobotTextDetector, SpamClassifier};
use crate::engine::cascade::{CascadeHit, EvidenceCascade};
use crate::engine::ScreeningConfig;
use crate::error::VigilError;
use crate::events::{
    ActivityEvent, Classification, Decision, SessionPhase, StatusEvent, TranscriptEvent,
};
use crate::tone;
use crate::transcribe::TranscriberHandle;

/// Pause between loop iterations, independent of chunk-capture latency.
const LOOP_PAUSE_MS: u64 = 100;
/// A beeping autodialer is called with this fixed confidence.
const BEEP_ROBOT_CONFIDENCE: f64 = 0.95;
/// Per-chunk spam evidence below this is noted but never recorded.
const SPAM_RECORD_CONFIDENCE: f64 = 0.75;
/// Recorded spam evidence must still clear this at finalization.
const SPAM_FINAL_CONFIDENCE: f64 = 0.6;
/// Unrecorded spam evidence surfaces in an Uncertain decision at this factor.
const PARTIAL_EVIDENCE_FACTOR: f64 = 0.5;

const ROBOT_CATEGORY: &str = "robot";
const BEEP_REASON: &str = "signaling tone";
const ROBOT_TEXT_REASON: &str = "automated speech patterns";
const CAPTURE_FAILED_REASON: &str = "audio capture failed";

pub struct SessionDiagnostics {
    pub chunks_captured: AtomicUsize,
    pub capture_failures: AtomicUsize,
    pub transcription_failures: AtomicUsize,
    pub transcription_empty: AtomicUsize,
    pub cascade_evaluations: AtomicUsize,
    pub spam_recordings: AtomicUsize,
}

impl Default for SessionDiagnostics {
    fn default() -> Self {
        Self {
            chunks_captured: AtomicUsize::new(0),
            capture_failures: AtomicUsize::new(0),
            transcription_failures: AtomicUsize::new(0),
            transcription_empty: AtomicUsize::new(0),
            cascade_evaluations: AtomicUsize::new(0),
            spam_recordings: AtomicUsize::new(0),
        }
    }
}

impl SessionDiagnostics {
    pub fn reset(&self) {
        self.chunks_captured.store(0, Ordering::Relaxed);
        self.capture_failures.store(0, Ordering::Relaxed);
        self.transcription_failures.store(0, Ordering::Relaxed);
        self.transcription_empty.store(0, Ordering::Relaxed);
        self.cascade_evaluations.store(0, Ordering::Relaxed);
        self.spam_recordings.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            chunks_captured: self.chunks_captured.load(Ordering::Relaxed),
            capture_failures: self.capture_failures.load(Ordering::Relaxed),
            transcription_failures: self.transcription_failures.load(Ordering::Relaxed),
            transcription_empty: self.transcription_empty.load(Ordering::Relaxed),
            cascade_evaluations: self.cascade_evaluations.load(Ordering::Relaxed),
            spam_recordings: self.spam_recordings.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DiagnosticsSnapshot {
    pub chunks_captured: usize,
    pub capture_failures: usize,
    pub transcription_failures: usize,
    pub transcription_empty: usize,
    pub cascade_evaluations: usize,
    pub spam_recordings: usize,
}

/// All context one session needs, passed as one struct so the closure stays tidy.
pub(crate) struct SessionContext {
    pub config: ScreeningConfig,
    /// Caller's phone number, carried for logging only.
    pub caller: String,
    pub source: Box<dyn AudioChunkSource>,
    pub transcriber: TranscriberHandle,
    /// Engine occupancy slot. Held for the whole session; cleared only by
    /// the finalization tail so a successor cannot start before this session
    /// has fully wound down.
    pub running: Arc<AtomicBool>,
    /// Session-local cancel token raised by `ScreeningEngine::stop`.
    pub cancel: Arc<AtomicBool>,
    pub phase: Arc<Mutex<SessionPhase>>,
    pub transcript_tx: broadcast::Sender<TranscriptEvent>,
    pub status_tx: broadcast::Sender<StatusEvent>,
    pub activity_tx: broadcast::Sender<ActivityEvent>,
    pub seq: Arc<AtomicU64>,
    pub decision_tx: oneshot::Sender<Decision>,
    pub diagnostics: Arc<SessionDiagnostics>,
}

enum LoopExit {
    Decided(CascadeHit),
    BudgetExhausted,
    Cancelled,
    CaptureFailed(VigilError),
}

/// Run the blocking session loop to its Decision.
pub(crate) fn run(mut ctx: SessionContext) {
    let started = Instant::now();
    let budget = Duration::from_millis(ctx.config.budget_ms);

    // A broken built-in pattern set would be a bug, but it must degrade to
    // "no evidence" rather than killing the loop.
    let robot_detector = match RobotTextDetector::new() {
        Ok(detector) => Some(detector),
        Err(err) => {
            error!(error = %err, "robot text detector unavailable; continuing without it");
            None
        }
    };
    let spam_classifier = SpamClassifier::new();
    let cascade = EvidenceCascade::from_config(&ctx.config);

    let mut transcript = String::new();
    // Spam evidence at or above the recording bar, best confidence wins.
    let mut best_spam: Option<ClassificationEvidence> = None;
    // Positive but unrecorded spam evidence, kept for the Uncertain report.
    let mut partial_spam: Option<ClassificationEvidence> = None;
    // Independent sequence for activity events.
    let mut activity_seq = 0u64;

    info!(
        caller = %ctx.caller,
        budget_ms = ctx.config.budget_ms,
        chunk_ms = ctx.config.chunk_interval_ms,
        "session loop started"
    );

    let exit = loop {
        // ── 0. Cancellation and budget gates ──────────────────────────────
        if ctx.cancel.load(Ordering::Relaxed) {
            break LoopExit::Cancelled;
        }
        if started.elapsed() >= budget {
            break LoopExit::BudgetExhausted;
        }

        // ── 1. Capture one chunk (blocking, bounded by the interval) ──────
        let chunk = match ctx.source.capture_chunk(ctx.config.chunk_interval_ms) {
            Ok(chunk) => chunk,
            Err(err) => {
                ctx.diagnostics
                    .capture_failures
                    .fetch_add(1, Ordering::Relaxed);
                error!(error = %err, "chunk capture failed — aborting session");
                break LoopExit::CaptureFailed(err);
            }
        };
        ctx.diagnostics
            .chunks_captured
            .fetch_add(1, Ordering::Relaxed);
        debug!(
            duration_s = format_args!("{:.2}", chunk.duration_secs()),
            "chunk captured"
        );
        if ctx.cancel.load(Ordering::Relaxed) {
            break LoopExit::Cancelled;
        }

        // ── 2. Frequency beep detection — decisive on its own ─────────────
        let beep = tone::detect(&chunk);
        let activity = ActivityEvent {
            seq: activity_seq,
            rms: chunk.rms(),
            beep_score: beep.energy_score,
            spam_best: best_spam.as_ref().map(|evidence| evidence.confidence),
        };
        activity_seq = activity_seq.saturating_add(1);
        let _ = ctx.activity_tx.send(activity);

        if beep.detected {
            info!(score = beep.energy_score, "signaling tone detected");
            break LoopExit::Decided(CascadeHit {
                classification: Classification::Robot,
                evidence: ClassificationEvidence::new(BEEP_ROBOT_CONFIDENCE)
                    .with_category(ROBOT_CATEGORY)
                    .with_reason(BEEP_REASON),
            });
        }

        // ── 3. Transcribe and accumulate ───────────────────────────────────
        let mut text_usable = true;
        match ctx.transcriber.0.lock().transcribe(&chunk) {
            Ok(Some(fragment)) => {
                let fragment = fragment.trim();
                if fragment.is_empty() {
                    ctx.diagnostics
                        .transcription_empty
                        .fetch_add(1, Ordering::Relaxed);
                } else {
                    if !transcript.is_empty() {
                        transcript.push(' ');
                    }
                    transcript.push_str(fragment);
                    let seq = ctx.seq.fetch_add(1, Ordering::Relaxed);
                    let _ = ctx.transcript_tx.send(TranscriptEvent {
                        seq,
                        fragment: fragment.to_string(),
                        transcript_chars: transcript.chars().count(),
                    });
                    debug!(fragment, "transcript fragment appended");
                }
            }
            Ok(None) => {
                ctx.diagnostics
                    .transcription_empty
                    .fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                // One bad decode skips text classification for this chunk
                // only; beep detection and the loop itself continue.
                ctx.diagnostics
                    .transcription_failures
                    .fetch_add(1, Ordering::Relaxed);
                warn!(error = %err, "transcription failed for this chunk");
                text_usable = false;
            }
        }

        if text_usable {
            // ── 4. Text-pattern robot detection on the full transcript ────
            if let Some(detector) = &robot_detector {
                let verdict = detector.detect(&transcript);
                if verdict.detected {
                    info!(confidence = verdict.confidence, "robot speech detected");
                    break LoopExit::Decided(CascadeHit {
                        classification: Classification::Robot,
                        evidence: ClassificationEvidence::new(verdict.confidence)
                            .with_category(ROBOT_CATEGORY)
                            .with_reason(ROBOT_TEXT_REASON)
                            .with_terms(verdict.matched),
                    });
                }
            }

            // ── 5. Evidence cascade — first hit finalizes ──────────────────
            ctx.diagnostics
                .cascade_evaluations
                .fetch_add(1, Ordering::Relaxed);
            if let Some(hit) = cascade.evaluate(&transcript) {
                info!(
                    classification = ?hit.classification,
                    reason = ?hit.evidence.reason,
                    "cascade rule hit"
                );
                break LoopExit::Decided(hit);
            }

            // ── 6. Spam: record, never exit — emergency/legitimacy evidence
            //       in a later chunk must still be able to take precedence ──
            if let Some(evidence) = spam_classifier.classify(&transcript) {
                if evidence.confidence >= SPAM_RECORD_CONFIDENCE {
                    let replaces = best_spam
                        .as_ref()
                        .map_or(true, |current| evidence.confidence > current.confidence);
                    if replaces {
                        ctx.diagnostics
                            .spam_recordings
                            .fetch_add(1, Ordering::Relaxed);
                        debug!(
                            confidence = evidence.confidence,
                            category = ?evidence.category,
                            "spam evidence recorded"
                        );
                        best_spam = Some(evidence);
                    }
                } else {
                    let replaces = partial_spam
                        .as_ref()
                        .map_or(true, |current| evidence.confidence > current.confidence);
                    if replaces {
                        partial_spam = Some(evidence);
                    }
                }
            }
        }

        // ── 7. Pause so classification overhead never busy-spins ──────────
        std::thread::sleep(Duration::from_millis(LOOP_PAUSE_MS));
    };

    // ── Finalization — single tail for every exit path ────────────────────
    let detail = match &exit {
        LoopExit::Decided(_) => None,
        LoopExit::BudgetExhausted => Some("budget exhausted".to_string()),
        LoopExit::Cancelled => Some("cancelled".to_string()),
        LoopExit::CaptureFailed(err) => Some(err.to_string()),
    };
    set_phase(&ctx.phase, &ctx.status_tx, SessionPhase::Finalizing, detail);

    let elapsed_ms = started.elapsed().as_millis() as u64;
    let decision = match exit {
        LoopExit::Decided(hit) => Decision {
            classification: hit.classification,
            category: hit.evidence.category,
            reason: hit.evidence.reason,
            confidence: hit.evidence.confidence,
            transcript,
            matched_terms: hit.evidence.matched_terms,
            elapsed_ms,
        },
        LoopExit::CaptureFailed(_) => Decision {
            classification: Classification::Uncertain,
            category: None,
            reason: Some(CAPTURE_FAILED_REASON.to_string()),
            confidence: 0.0,
            transcript,
            matched_terms: Vec::new(),
            elapsed_ms,
        },
        LoopExit::BudgetExhausted | LoopExit::Cancelled => {
            let strong = best_spam.filter(|e| e.confidence >= SPAM_FINAL_CONFIDENCE);
            if let Some(evidence) = strong {
                Decision {
                    classification: Classification::Spam,
                    category: evidence.category,
                    reason: evidence.reason,
                    confidence: evidence.confidence,
                    transcript,
                    matched_terms: evidence.matched_terms,
                    elapsed_ms,
                }
            } else if let Some(evidence) = partial_spam {
                // Weak evidence never blocks; it is surfaced at reduced
                // confidence so the user can see why the call looked off.
                Decision {
                    classification: Classification::Uncertain,
                    category: evidence.category,
                    reason: evidence.reason,
                    confidence: evidence.confidence * PARTIAL_EVIDENCE_FACTOR,
                    transcript,
                    matched_terms: evidence.matched_terms,
                    elapsed_ms,
                }
            } else {
                Decision {
                    classification: Classification::Uncertain,
                    category: None,
                    reason: None,
                    confidence: 0.0,
                    transcript,
                    matched_terms: Vec::new(),
                    elapsed_ms,
                }
            }
        }
    };

    // Release both resources on every exit path, then deliver.
    ctx.source.stop();
    ctx.transcriber.0.lock().reset();

    let snap = ctx.diagnostics.snapshot();
    info!(
        classification = ?decision.classification,
        confidence = decision.confidence,
        elapsed_ms,
        chunks_captured = snap.chunks_captured,
        transcription_failures = snap.transcription_failures,
        spam_recordings = snap.spam_recordings,
        "session decided"
    );

    // Only this session ever holds the slot, so a plain store releases it.
    ctx.running.store(false, Ordering::SeqCst);
    set_phase(&ctx.phase, &ctx.status_tx, SessionPhase::Idle, None);

    // Delivery last: when the Decision lands the engine is already Idle and
    // a successor session can start without racing this thread.
    if ctx.decision_tx.send(decision).is_err() {
        warn!("decision receiver dropped before delivery");
    }
}

pub(crate) fn set_phase(
    phase: &Mutex<SessionPhase>,
    status_tx: &broadcast::Sender<StatusEvent>,
    new_phase: SessionPhase,
    detail: Option<String>,
) {
    *phase.lock() = new_phase;
    let _ = status_tx.send(StatusEvent {
        phase: new_phase,
        detail,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::thread;

    use approx::assert_relative_eq;

    use crate::buffering::chunk::{AudioChunk, SAMPLE_RATE_HZ};
    use crate::error::Result;
    use crate::transcribe::TranscriptionEngine;

    struct ScriptedSource {
        chunks: Vec<AudioChunk>,
        cursor: usize,
        fail_at: Option<usize>,
        stops: Arc<AtomicUsize>,
    }

    impl ScriptedSource {
        fn new(chunks: Vec<AudioChunk>, stops: &Arc<AtomicUsize>) -> Self {
            Self {
                chunks,
                cursor: 0,
                fail_at: None,
                stops: Arc::clone(stops),
            }
        }

        fn silent(stops: &Arc<AtomicUsize>) -> Self {
            Self::new(Vec::new(), stops)
        }
    }

    impl AudioChunkSource for ScriptedSource {
        fn start(&mut self) -> Result<()> {
            Ok(())
        }

        fn capture_chunk(&mut self, duration_ms: u64) -> Result<AudioChunk> {
            if self.fail_at == Some(self.cursor) {
                return Err(VigilError::AudioSource("scripted capture failure".into()));
            }
            let chunk = self.chunks.get(self.cursor).cloned().unwrap_or_else(|| {
                AudioChunk::silence((duration_ms * u64::from(SAMPLE_RATE_HZ) / 1000) as usize)
            });
            self.cursor += 1;
            Ok(chunk)
        }

        fn stop(&mut self) {
            self.stops.fetch_add(1, Ordering::Relaxed);
        }
    }

    struct TestTranscriber {
        script: Vec<Option<String>>,
        cursor: usize,
        fail_first: bool,
        resets: Arc<AtomicUsize>,
    }

    impl TestTranscriber {
        fn new(script: Vec<Option<String>>, resets: &Arc<AtomicUsize>) -> Self {
            Self {
                script,
                cursor: 0,
                fail_first: false,
                resets: Arc::clone(resets),
            }
        }
    }

    impl TranscriptionEngine for TestTranscriber {
        fn initialize(&mut self) -> Result<()> {
            Ok(())
        }

        fn transcribe(&mut self, _chunk: &AudioChunk) -> Result<Option<String>> {
            if self.fail_first {
                self.fail_first = false;
                return Err(VigilError::Transcription("scripted decode failure".into()));
            }
            let entry = self.script.get(self.cursor).cloned().flatten();
            self.cursor += 1;
            Ok(entry)
        }

        fn reset(&mut self) {
            self.resets.fetch_add(1, Ordering::Relaxed);
        }
    }

    struct Harness {
        handle: thread::JoinHandle<()>,
        decision_rx: oneshot::Receiver<Decision>,
        running: Arc<AtomicBool>,
        cancel: Arc<AtomicBool>,
        diagnostics: Arc<SessionDiagnostics>,
    }

    impl Harness {
        fn decision(self) -> Decision {
            self.handle.join().expect("session thread panicked");
            self.decision_rx
                .blocking_recv()
                .expect("decision should be delivered")
        }
    }

    fn spawn_session(
        config: ScreeningConfig,
        source: ScriptedSource,
        transcriber: TestTranscriber,
    ) -> Harness {
        let running = Arc::new(AtomicBool::new(true));
        let cancel = Arc::new(AtomicBool::new(false));
        let (transcript_tx, _) = broadcast::channel(64);
        let (status_tx, _) = broadcast::channel(64);
        let (activity_tx, _) = broadcast::channel(64);
        let (decision_tx, decision_rx) = oneshot::channel();
        let diagnostics = Arc::new(SessionDiagnostics::default());

        let ctx = SessionContext {
            config,
            caller: "+15550100".into(),
            source: Box::new(source),
            transcriber: TranscriberHandle::new(transcriber),
            running: Arc::clone(&running),
            cancel: Arc::clone(&cancel),
            phase: Arc::new(Mutex::new(SessionPhase::Running)),
            transcript_tx,
            status_tx,
            activity_tx,
            seq: Arc::new(AtomicU64::new(0)),
            decision_tx,
            diagnostics: Arc::clone(&diagnostics),
        };

        Harness {
            handle: thread::spawn(move || run(ctx)),
            decision_rx,
            running,
            cancel,
            diagnostics,
        }
    }

    fn fast_config(budget_ms: u64) -> ScreeningConfig {
        ScreeningConfig {
            budget_ms,
            chunk_interval_ms: 40,
            ..ScreeningConfig::default()
        }
    }

    fn tone_chunk(freq: f64, len: usize) -> AudioChunk {
        let samples = (0..len)
            .map(|i| {
                let t = i as f64 / f64::from(SAMPLE_RATE_HZ);
                (20_000.0 * (2.0 * std::f64::consts::PI * freq * t).sin()) as i16
            })
            .collect();
        AudioChunk::new(samples, SAMPLE_RATE_HZ)
    }

    #[test]
    fn signaling_tone_decides_robot_immediately() {
        let stops = Arc::new(AtomicUsize::new(0));
        let resets = Arc::new(AtomicUsize::new(0));
        let source = ScriptedSource::new(vec![tone_chunk(1000.0, 4000)], &stops);
        let transcriber = TestTranscriber::new(vec![], &resets);

        let decision = spawn_session(fast_config(3_000), source, transcriber).decision();

        assert_eq!(decision.classification, Classification::Robot);
        assert_eq!(decision.category.as_deref(), Some("robot"));
        assert_relative_eq!(decision.confidence, 0.95);
        assert!(decision.transcript.is_empty());
        assert_eq!(stops.load(Ordering::Relaxed), 1);
        assert_eq!(resets.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn saying_the_user_name_finalizes_legitimate() {
        let stops = Arc::new(AtomicUsize::new(0));
        let resets = Arc::new(AtomicUsize::new(0));
        let source = ScriptedSource::silent(&stops);
        let transcriber = TestTranscriber::new(
            vec![Some("hello, am i speaking with avery quinn?".into())],
            &resets,
        );
        let config = ScreeningConfig {
            user_name: "Avery Quinn".into(),
            ..fast_config(3_000)
        };

        let decision = spawn_session(config, source, transcriber).decision();

        assert_eq!(decision.classification, Classification::Legitimate);
        assert_relative_eq!(decision.confidence, 0.9);
        assert_eq!(decision.reason.as_deref(), Some("said user name"));
        assert!(decision.transcript.contains("avery quinn"));
    }

    #[test]
    fn menu_speech_finalizes_robot_with_detector_confidence() {
        let stops = Arc::new(AtomicUsize::new(0));
        let resets = Arc::new(AtomicUsize::new(0));
        let source = ScriptedSource::silent(&stops);
        let transcriber = TestTranscriber::new(
            vec![Some("press 1 for sales, press 2 for support".into())],
            &resets,
        );

        let decision = spawn_session(fast_config(3_000), source, transcriber).decision();

        assert_eq!(decision.classification, Classification::Robot);
        assert_eq!(decision.category.as_deref(), Some("robot"));
        assert!(decision.confidence >= 0.5);
        assert!(decision
            .matched_terms
            .iter()
            .any(|term| term == "press 1"));
    }

    #[test]
    fn spam_is_recorded_but_later_legitimacy_evidence_wins() {
        let stops = Arc::new(AtomicUsize::new(0));
        let resets = Arc::new(AtomicUsize::new(0));
        let source = ScriptedSource::silent(&stops);
        let transcriber = TestTranscriber::new(
            vec![
                Some("final notice from the irs, act now or face legal action".into()),
                Some("wait, it's dana calling about something real".into()),
            ],
            &resets,
        );
        let config = ScreeningConfig {
            family_names: vec!["Dana".into()],
            ..fast_config(5_000)
        };

        let harness = spawn_session(config, source, transcriber);
        let diagnostics = Arc::clone(&harness.diagnostics);
        let decision = harness.decision();

        assert_eq!(decision.classification, Classification::Legitimate);
        assert_eq!(decision.reason.as_deref(), Some("said family name"));
        assert_relative_eq!(decision.confidence, 0.85);
        assert_eq!(diagnostics.spam_recordings.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn recorded_spam_decides_at_budget_exhaustion() {
        let stops = Arc::new(AtomicUsize::new(0));
        let resets = Arc::new(AtomicUsize::new(0));
        let source = ScriptedSource::silent(&stops);
        let transcriber = TestTranscriber::new(
            vec![Some(
                "final notice from the irs, act now or face legal action".into(),
            )],
            &resets,
        );

        let decision = spawn_session(fast_config(350), source, transcriber).decision();

        assert_eq!(decision.classification, Classification::Spam);
        assert_eq!(decision.category.as_deref(), Some("scam"));
        assert_relative_eq!(decision.confidence, 0.8);
        assert!(decision.elapsed_ms >= 350);
    }

    #[test]
    fn weak_spam_surfaces_as_uncertain_at_reduced_confidence() {
        let stops = Arc::new(AtomicUsize::new(0));
        let resets = Arc::new(AtomicUsize::new(0));
        let source = ScriptedSource::silent(&stops);
        let transcriber = TestTranscriber::new(
            vec![Some(
                "we're calling about your extended warranty, policy and coverage".into(),
            )],
            &resets,
        );

        let decision = spawn_session(fast_config(300), source, transcriber).decision();

        // Insurance evidence scores 0.6 — positive, but below the 0.75
        // recording bar, so the session must not emit Spam.
        assert_eq!(decision.classification, Classification::Uncertain);
        assert_eq!(decision.category.as_deref(), Some("insurance"));
        assert_relative_eq!(decision.confidence, 0.3);
        assert!(!decision.matched_terms.is_empty());
    }

    #[test]
    fn silence_runs_out_the_budget_to_uncertain() {
        let stops = Arc::new(AtomicUsize::new(0));
        let resets = Arc::new(AtomicUsize::new(0));
        let source = ScriptedSource::silent(&stops);
        let transcriber = TestTranscriber::new(vec![], &resets);

        let decision = spawn_session(fast_config(250), source, transcriber).decision();

        assert_eq!(decision.classification, Classification::Uncertain);
        assert_eq!(decision.confidence, 0.0);
        assert_eq!(decision.category, None);
        assert_eq!(decision.reason, None);
        assert!(decision.transcript.is_empty());
        assert!(decision.elapsed_ms >= 250);
        assert_eq!(stops.load(Ordering::Relaxed), 1);
        assert_eq!(resets.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn capture_failure_aborts_to_uncertain() {
        let stops = Arc::new(AtomicUsize::new(0));
        let resets = Arc::new(AtomicUsize::new(0));
        let mut source = ScriptedSource::silent(&stops);
        source.fail_at = Some(0);
        let transcriber = TestTranscriber::new(vec![], &resets);

        let harness = spawn_session(fast_config(3_000), source, transcriber);
        let diagnostics = Arc::clone(&harness.diagnostics);
        let decision = harness.decision();

        assert_eq!(decision.classification, Classification::Uncertain);
        assert_eq!(decision.reason.as_deref(), Some("audio capture failed"));
        assert_eq!(decision.confidence, 0.0);
        assert_eq!(diagnostics.capture_failures.load(Ordering::Relaxed), 1);
        assert_eq!(diagnostics.chunks_captured.load(Ordering::Relaxed), 0);
        // Resources are still released on the failure path.
        assert_eq!(stops.load(Ordering::Relaxed), 1);
        assert_eq!(resets.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn transcription_failure_skips_text_for_that_chunk_only() {
        let stops = Arc::new(AtomicUsize::new(0));
        let resets = Arc::new(AtomicUsize::new(0));
        let source = ScriptedSource::silent(&stops);
        let mut transcriber =
            TestTranscriber::new(vec![Some("hi, it's dana".into())], &resets);
        transcriber.fail_first = true;
        let config = ScreeningConfig {
            family_names: vec!["Dana".into()],
            ..fast_config(5_000)
        };

        let harness = spawn_session(config, source, transcriber);
        let diagnostics = Arc::clone(&harness.diagnostics);
        let decision = harness.decision();

        assert_eq!(decision.classification, Classification::Legitimate);
        assert_eq!(decision.reason.as_deref(), Some("said family name"));
        assert_eq!(
            diagnostics.transcription_failures.load(Ordering::Relaxed),
            1
        );
    }

    #[test]
    fn cancellation_finalizes_within_one_chunk_interval() {
        let stops = Arc::new(AtomicUsize::new(0));
        let resets = Arc::new(AtomicUsize::new(0));
        let source = ScriptedSource::silent(&stops);
        let transcriber = TestTranscriber::new(vec![], &resets);
        let config = ScreeningConfig {
            budget_ms: 10_000,
            chunk_interval_ms: 500,
            ..ScreeningConfig::default()
        };

        let harness = spawn_session(config, source, transcriber);
        thread::sleep(Duration::from_millis(150));
        harness.cancel.store(true, Ordering::SeqCst);
        let cancelled_at = Instant::now();
        let running = Arc::clone(&harness.running);
        let decision = harness.decision();

        assert!(
            cancelled_at.elapsed() <= Duration::from_millis(500),
            "finalization took {:?}",
            cancelled_at.elapsed()
        );
        assert_eq!(decision.classification, Classification::Uncertain);
        // The occupancy slot is released by the tail, not by the canceller.
        assert!(!running.load(Ordering::SeqCst));
        assert_eq!(stops.load(Ordering::Relaxed), 1);
        assert_eq!(resets.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn plain_conversation_never_reads_as_robot() {
        let stops = Arc::new(AtomicUsize::new(0));
        let resets = Arc::new(AtomicUsize::new(0));
        let source = ScriptedSource::silent(&stops);
        let transcriber = TestTranscriber::new(
            vec![Some("nice weather we're having lately, isn't it".into())],
            &resets,
        );

        let decision = spawn_session(fast_config(300), source, transcriber).decision();

        assert_eq!(decision.classification, Classification::Uncertain);
    }
}
