//! Audio chunk acquisition.
//!
//! `AudioChunkSource` is the seam between the screening session and whatever
//! delivers call audio on a given platform. The session owns its source
//! exclusively: `start` is called once before the first capture, every
//! captured chunk is consumed within the same loop iteration, and `stop` is
//! called on every exit path (normal, cancelled, error).
//!
//! The built-in [`live::LiveChunkSource`] (feature `audio-cpal`, default on)
//! captures from an input device. Hosts on platforms with call-audio
//! restrictions inject their own source instead — the engine never assumes a
//! microphone exists.

pub mod resample;

#[cfg(feature = "audio-cpal")]
pub mod live;

use crate::buffering::chunk::AudioChunk;
use crate::error::Result;

/// Produces fixed-duration audio chunks for one screening session.
pub trait AudioChunkSource: Send + 'static {
    /// Prepare the source. Called once, before the first capture.
    fn start(&mut self) -> Result<()>;

    /// Block until roughly `duration_ms` of audio is available and return it.
    ///
    /// May return early with a partial (even empty) chunk; the caller treats
    /// short chunks as inconclusive rather than as errors.
    fn capture_chunk(&mut self, duration_ms: u64) -> Result<AudioChunk>;

    /// Release the source. Idempotent; called on every session exit path.
    fn stop(&mut self);
}
