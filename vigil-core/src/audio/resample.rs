//! Sample-rate conversion using a rubato `FastFixedIn` resampler.
//!
//! ## Design
//!
//! cpal captures audio at the device's native rate (commonly 48 kHz). Every
//! analysis stage operates at 16 kHz mono. `RateConverter` bridges that gap on
//! the capture-drain side, where allocation is allowed.
//!
//! When the capture rate already equals the target rate no rubato session is
//! created and `process` is a plain copy.
//!
//! ## Usage
//!
//! ```ignore
//! let mut rc = RateConverter::new(48_000, 16_000, 960)?;
//! let out = rc.process(&raw_samples); // Vec<f32> at 16 kHz
//! ```

use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use tracing::error;

use crate::error::{Result, VigilError};

/// Converts f32 mono audio from one fixed sample rate to another.
pub struct RateConverter {
    /// `None` when capture rate == target rate (passthrough mode).
    resampler: Option<FastFixedIn<f32>>,
    /// Holds partial input blocks between calls.
    pending: Vec<f32>,
    /// Input samples rubato expects per process call.
    block: usize,
    /// Pre-allocated output buffer: `[1][output_frames_max]`.
    out: Vec<Vec<f32>>,
}

impl RateConverter {
    /// Create a converter from `capture_rate` to `target_rate` Hz, feeding
    /// rubato `block` input frames at a time.
    ///
    /// # Errors
    /// Returns `VigilError::AudioSource` if rubato fails to initialise.
    pub fn new(capture_rate: u32, target_rate: u32, block: usize) -> Result<Self> {
        if capture_rate == target_rate {
            return Ok(Self {
                resampler: None,
                pending: Vec::new(),
                block,
                out: Vec::new(),
            });
        }

        let ratio = target_rate as f64 / capture_rate as f64;

        let resampler = FastFixedIn::<f32>::new(
            ratio,
            1.0, // fixed ratio — no dynamic adjustment
            PolynomialDegree::Cubic,
            block,
            1, // mono
        )
        .map_err(|e| VigilError::AudioSource(format!("resampler init: {e}")))?;

        let max_out = resampler.output_frames_max();
        let out = vec![vec![0f32; max_out]; 1];

        tracing::info!(capture_rate, target_rate, block, max_out, "resampling enabled");

        Ok(Self {
            resampler: Some(resampler),
            pending: Vec::new(),
            block,
            out,
        })
    }

    /// Feed raw samples in, get resampled samples out (possibly empty).
    ///
    /// Input accumulates internally until a full `block` is available; any
    /// remainder waits for the next call. In passthrough mode the input is
    /// returned as-is.
    pub fn process(&mut self, samples: &[f32]) -> Vec<f32> {
        let Some(ref mut resampler) = self.resampler else {
            return samples.to_vec();
        };

        self.pending.extend_from_slice(samples);

        let mut result = Vec::new();
        while self.pending.len() >= self.block {
            let input = &self.pending[..self.block];
            match resampler.process_into_buffer(&[input], &mut self.out, None) {
                Ok((_consumed, produced)) => {
                    result.extend_from_slice(&self.out[0][..produced]);
                }
                Err(e) => {
                    error!("resampler process error: {e}");
                }
            }
            self.pending.drain(..self.block);
        }

        result
    }

    /// Returns `true` when capture rate == target rate (no resampling occurs).
    pub fn is_passthrough(&self) -> bool {
        self.resampler.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_returns_input_unchanged() {
        let mut rc = RateConverter::new(16_000, 16_000, 960).unwrap();
        assert!(rc.is_passthrough());
        let samples: Vec<f32> = (0..320).map(|i| (i as f32 * 0.01).sin()).collect();
        let out = rc.process(&samples);
        assert_eq!(out, samples);
    }

    #[test]
    fn downsamples_48k_to_16k_at_one_third_length() {
        let mut rc = RateConverter::new(48_000, 16_000, 960).unwrap();
        assert!(!rc.is_passthrough());
        let out = rc.process(&vec![0.0f32; 960]);
        assert!(!out.is_empty(), "expected non-empty output");
        // 960 in at 48 kHz → ~320 out at 16 kHz
        assert!(
            (out.len() as isize - 320).unsigned_abs() <= 10,
            "output len={} expected≈320",
            out.len()
        );
    }

    #[test]
    fn short_input_is_held_until_a_full_block_arrives() {
        let mut rc = RateConverter::new(48_000, 16_000, 960).unwrap();
        assert!(rc.process(&vec![0.0f32; 600]).is_empty());
        // 600 + 600 = 1200 ≥ 960 → this call produces output
        assert!(!rc.process(&vec![0.0f32; 600]).is_empty());
    }

    #[test]
    fn upsampling_also_works() {
        let mut rc = RateConverter::new(8_000, 16_000, 320).unwrap();
        let out = rc.process(&vec![0.0f32; 320]);
        assert!(
            (out.len() as isize - 640).unsigned_abs() <= 10,
            "output len={} expected≈640",
            out.len()
        );
    }
}
