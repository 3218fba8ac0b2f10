//! Autodialer tone detection.
//!
//! ## Signals (OR-combined)
//!
//! 1. **Filter bank** — Goertzel magnitudes at seven signaling frequencies,
//!    normalized by chunk RMS; fires when the mean of magnitudes above 0.3
//!    exceeds 0.6.
//! 2. **Envelope onset** — a four-segment amplitude profile that jumps from
//!    near-silence to a plateau (click-then-tone).
//!
//! Everything here fails toward letting the call through: short chunks,
//! silence, and any non-finite intermediate all report "no tone".

pub(crate) mod envelope;
pub mod goertzel;

use tracing::debug;

use crate::buffering::chunk::AudioChunk;

/// Chunks shorter than this cannot hold a measurable tone.
const MIN_SAMPLES: usize = 1000;
/// RMS floor on the raw 16-bit scale; below it the chunk is treated as silence.
const RMS_FLOOR: f64 = 100.0;
/// A frequency bin counts toward the tone score above this magnitude.
const MAGNITUDE_FLOOR: f64 = 0.3;
/// Mean magnitude of counted bins required to flag a tone.
const MEAN_THRESHOLD: f64 = 0.6;

/// Outcome of inspecting one chunk for autodialer signaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeepReport {
    /// True when either the filter bank or the envelope pattern fired.
    pub detected: bool,
    /// Mean of the filter-bank magnitudes above the floor, clamped to [0, 1].
    /// 0.0 when no bin cleared the floor — including envelope-only positives.
    pub energy_score: f64,
}

impl BeepReport {
    fn negative() -> Self {
        Self {
            detected: false,
            energy_score: 0.0,
        }
    }
}

/// Inspect one audio chunk for autodialer signaling.
pub fn detect(chunk: &AudioChunk) -> BeepReport {
    if chunk.samples.len() < MIN_SAMPLES {
        return BeepReport::negative();
    }

    let rms = chunk.rms();
    if !rms.is_finite() || rms < RMS_FLOOR {
        return BeepReport::negative();
    }

    let magnitudes = goertzel::normalized_magnitudes(&chunk.samples, rms);
    let mut sum = 0.0;
    let mut count = 0usize;
    for &m in &magnitudes {
        if m > MAGNITUDE_FLOOR {
            sum += m;
            count += 1;
        }
    }
    let mean = if count > 0 { sum / count as f64 } else { 0.0 };
    if !mean.is_finite() {
        return BeepReport::negative();
    }

    let bank_hit = count > 0 && mean > MEAN_THRESHOLD;
    let envelope_hit = envelope::has_onset_pattern(&chunk.samples);
    let detected = bank_hit || envelope_hit;

    if detected {
        debug!(
            rms = format_args!("{rms:.1}"),
            mean = format_args!("{mean:.3}"),
            bank_hit,
            envelope_hit,
            "tone signature detected"
        );
    }

    BeepReport {
        detected,
        energy_score: mean.clamp(0.0, 1.0),
    }
}
