//! Single-bin Goertzel filters over the autodialer signaling frequencies.
//!
//! The Goertzel recurrence evaluates one DFT bin in a single pass, which is
//! much cheaper than a full FFT when only a handful of known frequencies
//! matter. Power is converted back to an amplitude estimate and normalized by
//! the chunk RMS, so a pure tone at a target frequency scores ≈ √2 and
//! ordinary speech scores near zero regardless of playback volume.

use crate::buffering::chunk::SAMPLE_RATE_HZ;

/// Frequencies the bank inspects, in Hz: the North American ringback/busy
/// pairs (440/480, 480/620), three DTMF row tones, and the 1 kHz test tone
/// predictive dialers fire before connecting an agent.
pub const TARGET_FREQUENCIES: [f64; 7] = [440.0, 480.0, 620.0, 770.0, 852.0, 941.0, 1000.0];

/// Goertzel power of `samples` at `freq` Hz.
///
/// The bin index is rounded to the nearest integer so the filter stays
/// phase-coherent over the whole block.
pub(crate) fn goertzel_power(samples: &[i16], freq: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let n = samples.len() as f64;
    let k = (0.5 + n * freq / SAMPLE_RATE_HZ as f64).floor();
    let w = 2.0 * std::f64::consts::PI * k / n;
    let coeff = 2.0 * w.cos();

    let mut s_prev = 0.0f64;
    let mut s_prev2 = 0.0f64;
    for &sample in samples {
        let s = sample as f64 + coeff * s_prev - s_prev2;
        s_prev2 = s_prev;
        s_prev = s;
    }
    s_prev2 * s_prev2 + s_prev * s_prev - coeff * s_prev * s_prev2
}

/// Per-frequency magnitudes normalized by the chunk RMS.
///
/// `2·sqrt(power)/N` recovers the per-bin amplitude estimate; dividing by the
/// RMS makes the result volume-independent.
pub(crate) fn normalized_magnitudes(samples: &[i16], rms: f64) -> [f64; TARGET_FREQUENCIES.len()] {
    let mut out = [0.0; TARGET_FREQUENCIES.len()];
    if rms <= 0.0 || samples.is_empty() {
        return out;
    }
    let n = samples.len() as f64;
    for (slot, &freq) in out.iter_mut().zip(TARGET_FREQUENCIES.iter()) {
        let power = goertzel_power(samples, freq).max(0.0);
        let amplitude = 2.0 * power.sqrt() / n;
        *slot = amplitude / rms;
    }
    out
}
