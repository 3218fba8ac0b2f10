//! Public event and decision types emitted by the engine.
//!
//! ## Subscriptions
//!
//! | Event | Source |
//! |-------|--------|
//! | [`TranscriptEvent`] | `ScreeningEngine::subscribe_transcripts` |
//! | [`ActivityEvent`] | `ScreeningEngine::subscribe_activity` |
//! | [`StatusEvent`] | `ScreeningEngine::subscribe_status` |
//! | [`Decision`] | the `SessionHandle` returned by `start` |
//!
//! Everything serialises to camelCase JSON so host applications can forward
//! events verbatim.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Per-chunk progress events
// ---------------------------------------------------------------------------

/// Emitted when a chunk's transcription added text to the session transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptEvent {
    /// Monotonically increasing event sequence number.
    pub seq: u64,
    /// The fragment appended by this chunk.
    pub fragment: String,
    /// Length of the accumulated transcript after appending, in characters.
    pub transcript_chars: usize,
}

/// Emitted for every captured chunk, whether or not it produced text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    /// Monotonically increasing event sequence number.
    pub seq: u64,
    /// Root-mean-square level of the chunk on the raw 16-bit sample scale.
    pub rms: f64,
    /// Beep-energy score for the chunk in [0.0, 1.0].
    pub beep_score: f64,
    /// Confidence of the best spam evidence recorded so far, if any.
    pub spam_best: Option<f64>,
}

// ---------------------------------------------------------------------------
// Session status events
// ---------------------------------------------------------------------------

/// Emitted when the session state machine changes phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    pub phase: SessionPhase,
    /// Optional human-readable detail (e.g. error message).
    pub detail: Option<String>,
}

/// Where the screening state machine currently is.
///
/// One-shot per call: `Idle → Running → Finalizing → Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    /// No session active; `start()` may be called.
    Idle,
    /// Capturing chunks and running the classifier cascade.
    Running,
    /// Evidence gathering is over; the decision is being assembled.
    Finalizing,
}

// ---------------------------------------------------------------------------
// The decision
// ---------------------------------------------------------------------------

/// Terminal classification of one screened call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// Automated system: signaling tone or IVR menu speech.
    Robot,
    /// Unsolicited pitch; safe to block or silence.
    Spam,
    /// The caller needs a human now; alert loudly.
    Emergency,
    /// A call worth ringing through.
    Legitimate,
    /// Not enough evidence either way; always alert, never block.
    Uncertain,
}

/// Immutable terminal result of one screening session. Produced exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub classification: Classification,
    /// Category label, when one applies (e.g. a spam category).
    pub category: Option<String>,
    /// Short human-readable reason for the classification.
    pub reason: Option<String>,
    /// Confidence in [0.0, 1.0].
    pub confidence: f64,
    /// Full transcript accumulated before the decision.
    pub transcript: String,
    /// The terms or snippets the deciding classifier matched.
    pub matched_terms: Vec<String>,
    /// Wall-clock time from session start to decision, in milliseconds.
    pub elapsed_ms: u64,
}
