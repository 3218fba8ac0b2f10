//! End-to-end latency and lifecycle tests through `ScreeningEngine`.
//!
//! Sources and transcribers here simulate real pacing: capture blocks for
//! the full chunk interval and transcription adds a decode delay, so the
//! bounds below reflect what a host would actually observe.

use std::thread;
use std::time::{Duration, Instant};

use vigil_core::buffering::chunk::{AudioChunk, SAMPLE_RATE_HZ};
use vigil_core::{
    audio::AudioChunkSource, Classification, ScreeningConfig, ScreeningEngine, SessionPhase,
    TranscriberHandle, TranscriptionEngine, VigilError,
};

/// Blocks for the requested duration, then yields a silent chunk — the
/// pacing of a real call with nobody talking.
struct PacedSilence {
    fail_start: bool,
}

impl PacedSilence {
    fn new() -> Self {
        Self { fail_start: false }
    }
}

impl AudioChunkSource for PacedSilence {
    fn start(&mut self) -> Result<(), VigilError> {
        if self.fail_start {
            return Err(VigilError::AudioSource("no call audio route".into()));
        }
        Ok(())
    }

    fn capture_chunk(&mut self, duration_ms: u64) -> Result<AudioChunk, VigilError> {
        thread::sleep(Duration::from_millis(duration_ms));
        Ok(AudioChunk::silence(
            (duration_ms * u64::from(SAMPLE_RATE_HZ) / 1000) as usize,
        ))
    }

    fn stop(&mut self) {}
}

/// Replays a script with a fixed decode delay per chunk.
struct DelayTranscriber {
    delay: Duration,
    script: Vec<Option<String>>,
    cursor: usize,
}

impl DelayTranscriber {
    fn new(delay: Duration, script: Vec<Option<String>>) -> Self {
        Self {
            delay,
            script,
            cursor: 0,
        }
    }
}

impl TranscriptionEngine for DelayTranscriber {
    fn initialize(&mut self) -> Result<(), VigilError> {
        Ok(())
    }

    fn transcribe(&mut self, _chunk: &AudioChunk) -> Result<Option<String>, VigilError> {
        thread::sleep(self.delay);
        let entry = self.script.get(self.cursor).cloned().flatten();
        self.cursor += 1;
        Ok(entry)
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }
}

fn short_config() -> ScreeningConfig {
    // normalized() clamps to the 5 s budget / 500 ms interval floors, so
    // these are the fastest settings a host can actually run with.
    ScreeningConfig {
        budget_ms: 5_000,
        chunk_interval_ms: 500,
        ..ScreeningConfig::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn ivr_menu_decision_lands_within_two_chunk_intervals() {
    let transcriber = TranscriberHandle::new(DelayTranscriber::new(
        Duration::from_millis(20),
        vec![Some("press 1 for sales, press 2 for support".into())],
    ));
    let engine = ScreeningEngine::new(short_config(), transcriber);

    let start = Instant::now();
    let handle = engine
        .start("+15550100", Box::new(PacedSilence::new()))
        .expect("start should succeed");
    let decision = handle.decision().await.expect("decision should arrive");
    let elapsed = start.elapsed();

    assert_eq!(decision.classification, Classification::Robot);
    assert!(decision.confidence >= 0.5);
    assert!(
        elapsed < Duration::from_millis(1_000),
        "decision took {elapsed:?} (target < 2 × 500 ms chunk interval)"
    );
    assert_eq!(engine.phase(), SessionPhase::Idle);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn second_start_fails_fast_and_leaves_the_running_session_alone() {
    let transcriber = TranscriberHandle::new(DelayTranscriber::new(
        Duration::from_millis(5),
        vec![None, Some("am i speaking with avery quinn".into())],
    ));
    let config = ScreeningConfig {
        user_name: "Avery Quinn".into(),
        ..short_config()
    };
    let engine = ScreeningEngine::new(config, transcriber);

    let handle = engine
        .start("+15550100", Box::new(PacedSilence::new()))
        .expect("first start should succeed");

    let second = engine.start("+15550199", Box::new(PacedSilence::new()));
    assert!(matches!(second, Err(VigilError::AlreadyRunning)));

    // The original session still runs to its own decision.
    let decision = handle.decision().await.expect("decision should arrive");
    assert_eq!(decision.classification, Classification::Legitimate);
    assert_eq!(decision.reason.as_deref(), Some("said user name"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_yields_a_decision_within_one_chunk_interval() {
    let transcriber =
        TranscriberHandle::new(DelayTranscriber::new(Duration::from_millis(5), Vec::new()));
    let engine = ScreeningEngine::new(ScreeningConfig::default(), transcriber);

    let handle = engine
        .start("+15550100", Box::new(PacedSilence::new()))
        .expect("start should succeed");

    tokio::time::sleep(Duration::from_millis(700)).await;
    let stopped_at = Instant::now();
    engine.stop().expect("stop should succeed");

    let decision = handle.decision().await.expect("decision should arrive");
    let elapsed = stopped_at.elapsed();

    // One 2 s chunk interval, plus slack for the decode in flight.
    assert!(
        elapsed < Duration::from_millis(2_500),
        "finalization took {elapsed:?} after stop"
    );
    assert_eq!(decision.classification, Classification::Uncertain);
    assert_eq!(engine.phase(), SessionPhase::Idle);
    assert!(matches!(engine.stop(), Err(VigilError::NotRunning)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn start_right_after_stop_cannot_overlap_the_finalizing_session() {
    let transcriber =
        TranscriberHandle::new(DelayTranscriber::new(Duration::from_millis(5), Vec::new()));
    let engine = ScreeningEngine::new(short_config(), transcriber);

    let handle = engine
        .start("+15550100", Box::new(PacedSilence::new()))
        .expect("start should succeed");

    tokio::time::sleep(Duration::from_millis(100)).await;
    let stopped_at = Instant::now();
    engine.stop().expect("stop should succeed");

    // The stopped session holds the engine until its finalization tail runs,
    // so an immediate restart is rejected instead of running alongside it.
    let rejected = engine.start("+15550199", Box::new(PacedSilence::new()));
    assert!(matches!(rejected, Err(VigilError::AlreadyRunning)));

    let decision = handle.decision().await.expect("decision should arrive");
    assert_eq!(decision.classification, Classification::Uncertain);
    assert!(
        stopped_at.elapsed() < Duration::from_millis(1_000),
        "stopped session took {:?} to finalize (target < 500 ms interval + slack)",
        stopped_at.elapsed()
    );

    // Once the decision lands the slot is free, and the successor must not
    // inherit the earlier stop request.
    let handle = engine
        .start("+15550199", Box::new(PacedSilence::new()))
        .expect("engine should accept a new session after finalization");
    tokio::time::sleep(Duration::from_millis(650)).await;
    assert_eq!(
        engine.phase(),
        SessionPhase::Running,
        "successor session was cancelled by the previous stop"
    );
    engine.stop().expect("stop should succeed");
    let decision = handle.decision().await.expect("decision should arrive");
    assert_eq!(decision.classification, Classification::Uncertain);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn source_open_failure_surfaces_from_start_and_engine_recovers() {
    let transcriber =
        TranscriberHandle::new(DelayTranscriber::new(Duration::from_millis(5), Vec::new()));
    let engine = ScreeningEngine::new(short_config(), transcriber);

    let mut broken = PacedSilence::new();
    broken.fail_start = true;
    let err = engine
        .start("+15550100", Box::new(broken))
        .expect_err("start should fail when the source cannot open");
    assert!(matches!(err, VigilError::AudioSource(_)));
    assert_eq!(engine.phase(), SessionPhase::Idle);

    // The failed start must not leak the reentrancy guard.
    let handle = engine
        .start("+15550100", Box::new(PacedSilence::new()))
        .expect("engine should accept a new session after a failed open");
    engine.stop().expect("stop should succeed");
    let decision = handle.decision().await.expect("decision should arrive");
    assert_eq!(decision.classification, Classification::Uncertain);
}
