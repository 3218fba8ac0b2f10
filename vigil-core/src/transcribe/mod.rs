//! Speech-to-text abstraction.
//!
//! The `TranscriptionEngine` trait decouples the screening loop from any
//! specific recognizer backend (on-device model, platform service, scripted
//! replay). A backend that is not ready surfaces as an `Err` from
//! `initialize` or the first `transcribe` call; there is no separate
//! "loading" state for callers to handle.
//!
//! `&mut self` on `transcribe` expresses that decoders are stateful — beam
//! caches, language-model context, etc. All mutation is serialised through
//! `TranscriberHandle`'s `parking_lot::Mutex`.

pub mod scripted;

pub use scripted::ScriptedTranscriber;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::buffering::chunk::AudioChunk;
use crate::error::Result;

/// Contract for speech recognition backends.
pub trait TranscriptionEngine: Send + 'static {
    /// One-time setup: load weights, allocate decoder state. Called before
    /// the first session that uses this engine.
    ///
    /// # Errors
    /// Returns an error if the backend cannot become ready.
    fn initialize(&mut self) -> Result<()>;

    /// Transcribe one mono 16 kHz chunk.
    ///
    /// Returns `Ok(None)` when the chunk contains no recognisable speech;
    /// `Ok(Some(text))` is never empty after trimming.
    fn transcribe(&mut self, chunk: &AudioChunk) -> Result<Option<String>>;

    /// Drop all per-call decoder state. Called when a session ends, on every
    /// exit path.
    fn reset(&mut self);
}

/// Thread-safe reference-counted handle to any `TranscriptionEngine`
/// implementor.
///
/// Uses `parking_lot::Mutex` for non-poisoning on panic, so a recognizer
/// crash in one session cannot wedge the next.
#[derive(Clone)]
pub struct TranscriberHandle(pub Arc<Mutex<dyn TranscriptionEngine>>);

impl TranscriberHandle {
    /// Wrap any `TranscriptionEngine` in a `TranscriberHandle`.
    pub fn new<E: TranscriptionEngine>(engine: E) -> Self {
        Self(Arc::new(Mutex::new(engine)))
    }
}

impl std::fmt::Debug for TranscriberHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscriberHandle").finish_non_exhaustive()
    }
}
