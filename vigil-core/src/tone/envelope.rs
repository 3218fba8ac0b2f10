//! Amplitude-envelope onset check.
//!
//! Autodialers often front their tone with a click or a stretch of dead air,
//! so the chunk energy jumps from near-silence to a sustained plateau.
//! Splitting the chunk into four segments and comparing adjacent mean
//! amplitudes catches that onset even when the tone frequency falls between
//! the filter bank's bins.

/// Number of equal segments the chunk is split into.
const SEGMENTS: usize = 4;
/// Fraction of the loudest segment mean that counts as "quiet".
const QUIET_FRACTION: f64 = 0.30;
/// A segment must exceed the quiet level by this factor to count as an onset.
const ONSET_FACTOR: f64 = 2.0;

/// True if any adjacent segment pair rises from below 30 % of the segment
/// maximum to more than double that threshold.
pub(crate) fn has_onset_pattern(samples: &[i16]) -> bool {
    if samples.len() < SEGMENTS {
        return false;
    }

    let seg_len = samples.len() / SEGMENTS;
    let mut means = [0.0f64; SEGMENTS];
    for (i, mean) in means.iter_mut().enumerate() {
        let seg = &samples[i * seg_len..(i + 1) * seg_len];
        let sum: f64 = seg.iter().map(|&s| (s as f64).abs()).sum();
        *mean = sum / seg_len as f64;
    }

    let max = means.iter().copied().fold(0.0f64, f64::max);
    if max <= 0.0 || !max.is_finite() {
        return false;
    }

    let quiet = max * QUIET_FRACTION;
    means
        .windows(2)
        .any(|pair| pair[0] < quiet && pair[1] > quiet * ONSET_FACTOR)
}
