//! Typed audio chunk passed from the capture source to the analysis stages.

/// Sample rate every analysis stage operates at, in Hz.
///
/// Capture sources are responsible for delivering audio at this rate
/// (resampling from the device rate if necessary).
pub const SAMPLE_RATE_HZ: u32 = 16_000;

/// A contiguous block of 16-bit mono PCM samples at a known sample rate.
///
/// Allocated once per session iteration and owned exclusively by that
/// iteration; the loop never holds more than one chunk at a time.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Mono PCM samples, full 16-bit scale.
    pub samples: Vec<i16>,
    /// Sample rate in Hz (16 000 for everything the engine produces).
    pub sample_rate: u32,
}

impl AudioChunk {
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Chunk of `n` zero samples at the analysis rate.
    pub fn silence(n: usize) -> Self {
        Self::new(vec![0; n], SAMPLE_RATE_HZ)
    }

    /// Returns the duration of this chunk in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Root-mean-square amplitude on the raw 16-bit scale.
    ///
    /// A full-scale sine comes out around 23 170; silence is 0.
    pub fn rms(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = self
            .samples
            .iter()
            .map(|&s| {
                let s = s as f64;
                s * s
            })
            .sum();
        (sum_sq / self.samples.len() as f64).sqrt()
    }
}
