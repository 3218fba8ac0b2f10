//! WAV-backed chunk source for replaying recorded calls.
//!
//! Loads the whole file up front, mixes to mono, resamples to the 16 kHz
//! analysis rate, and hands the result out chunk by chunk. A finished
//! recording is not a capture failure: past the end of the file the source
//! pads with silent chunks and lets the budget (or a classifier) end the
//! session, the same way a caller who stopped talking would.

use std::path::Path;

use anyhow::Context;
use tracing::info;
use vigil_core::audio::resample::RateConverter;
use vigil_core::audio::AudioChunkSource;
use vigil_core::buffering::chunk::{AudioChunk, SAMPLE_RATE_HZ};
use vigil_core::VigilError;

/// Input frames per rubato call when the file needs resampling.
const RESAMPLE_BLOCK: usize = 960;

pub struct ReplayChunkSource {
    samples: Vec<i16>,
    cursor: usize,
}

impl ReplayChunkSource {
    /// Load a WAV file, converting to 16 kHz mono 16-bit.
    pub fn from_wav(path: &Path) -> anyhow::Result<Self> {
        let (mono, rate) = read_wav_mono_f32(path)
            .with_context(|| format!("reading {}", path.display()))?;

        let samples = if rate == SAMPLE_RATE_HZ {
            mono.iter().map(|&s| f32_to_i16(s)).collect()
        } else {
            let mut converter = RateConverter::new(rate, SAMPLE_RATE_HZ, RESAMPLE_BLOCK)
                .map_err(anyhow::Error::from)?;
            let mut out: Vec<i16> = converter
                .process(&mono)
                .iter()
                .map(|&s| f32_to_i16(s))
                .collect();
            // Flush the trailing partial block with silence.
            out.extend(
                converter
                    .process(&vec![0f32; RESAMPLE_BLOCK])
                    .iter()
                    .map(|&s| f32_to_i16(s)),
            );
            out
        };

        info!(
            file = %path.display(),
            source_rate = rate,
            seconds = samples.len() as f64 / f64::from(SAMPLE_RATE_HZ),
            "loaded replay audio"
        );

        Ok(Self { samples, cursor: 0 })
    }

    /// True once every file sample has been handed out.
    pub fn exhausted(&self) -> bool {
        self.cursor >= self.samples.len()
    }
}

impl AudioChunkSource for ReplayChunkSource {
    fn start(&mut self) -> Result<(), VigilError> {
        self.cursor = 0;
        Ok(())
    }

    fn capture_chunk(&mut self, duration_ms: u64) -> Result<AudioChunk, VigilError> {
        let wanted = (duration_ms * u64::from(SAMPLE_RATE_HZ) / 1000) as usize;
        let available = self.samples.len().saturating_sub(self.cursor);
        let take = available.min(wanted);

        let mut chunk = Vec::with_capacity(wanted);
        chunk.extend_from_slice(&self.samples[self.cursor..self.cursor + take]);
        chunk.resize(wanted, 0);
        self.cursor += take;

        Ok(AudioChunk::new(chunk, SAMPLE_RATE_HZ))
    }

    fn stop(&mut self) {}
}

fn read_wav_mono_f32(path: &Path) -> anyhow::Result<(Vec<f32>, u32)> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let max = ((1_i64 << (spec.bits_per_sample - 1)) - 1) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    if channels == 1 {
        return Ok((interleaved, spec.sample_rate));
    }

    let mut mono = Vec::with_capacity(interleaved.len() / channels);
    for frame in interleaved.chunks(channels) {
        let sum: f32 = frame.iter().copied().sum();
        mono.push(sum / channels as f32);
    }
    Ok((mono, spec.sample_rate))
}

fn f32_to_i16(s: f32) -> i16 {
    (s.clamp(-1.0, 1.0) * 32767.0).round() as i16
}
