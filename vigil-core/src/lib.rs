//! # vigil-core
//!
//! Real-time call-audio analysis engine for screening incoming calls.
//!
//! ## Architecture
//!
//! ```text
//! AudioChunkSource → SessionContext(spawn_blocking)
//!                         │
//!                   tone::detect ──────────────► Robot (tone)
//!                         │
//!              TranscriptionEngine::transcribe
//!                         │  (transcript accumulates)
//!              RobotTextDetector ──────────────► Robot (speech)
//!                         │
//!              EvidenceCascade ────────────────► Emergency / Legitimate
//!                         │
//!              SpamClassifier (recorded, decided at finalization)
//!                         │
//!              oneshot::Sender<Decision>   (exactly once)
//! ```
//!
//! The loop is strictly sequential per chunk and the classifier order is
//! load-bearing: tone beats text, names and emergencies beat everything
//! else, and spam can only win once the time budget runs out. Absence of
//! evidence never blocks a call.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod audio;
pub mod buffering;
pub mod classify;
pub mod engine;
pub mod error;
pub mod events;
pub mod tone;
pub mod transcribe;

// Convenience re-exports for downstream crates
pub use engine::{ScreeningConfig, ScreeningEngine, SessionHandle};
pub use error::VigilError;
pub use events::{
    ActivityEvent, Classification, Decision, SessionPhase, StatusEvent, TranscriptEvent,
};
pub use transcribe::{ScriptedTranscriber, TranscriberHandle, TranscriptionEngine};

#[cfg(feature = "audio-cpal")]
pub use audio::live::LiveChunkSource;
