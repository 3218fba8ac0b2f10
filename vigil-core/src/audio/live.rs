//! Live audio capture via the cpal backend.
//!
//! # Design constraints
//!
//! The cpal input callback runs on an OS audio thread at elevated
//! (TIME_CRITICAL on Windows) priority. It **must not**:
//! - Allocate heap memory (beyond the first warm-up invocations)
//! - Block on a mutex or condvar
//! - Perform I/O
//!
//! The callback therefore only mixes the incoming frame to mono and pushes it
//! into an SPSC ring buffer whose `push_slice` is lock-free.
//!
//! # Threading note
//!
//! `cpal::Stream` is `!Send` on most platforms (COM on Windows, CoreAudio on
//! macOS), while [`AudioChunkSource`] implementations move across threads into
//! the session task. `LiveChunkSource` squares that by confining the stream to
//! a dedicated capture thread: `start` spawns the thread, waits on an ack
//! channel for the open result, and keeps only the ring consumer; the stream
//! is created and dropped on that one thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, Stream, StreamConfig};
use tracing::{error, info, warn};

use super::resample::RateConverter;
use super::AudioChunkSource;
use crate::buffering::chunk::{AudioChunk, SAMPLE_RATE_HZ};
use crate::buffering::{create_audio_ring, AudioConsumer, AudioProducer, Consumer, Producer};
use crate::error::{Result, VigilError};

/// How long the drain loop sleeps when the ring is empty.
const DRAIN_INTERVAL: Duration = Duration::from_millis(10);
/// How often the capture thread re-checks the shutdown flag.
const KEEPALIVE_INTERVAL: Duration = Duration::from_millis(50);
/// Input frames per rubato call.
const RESAMPLE_BLOCK: usize = 960;

/// Chunk source backed by a cpal input device.
///
/// Captures at the device's native rate, resamples to 16 kHz on the calling
/// thread, and hands out 16-bit mono chunks.
pub struct LiveChunkSource {
    preferred_device: Option<String>,
    running: Arc<AtomicBool>,
    consumer: Option<AudioConsumer>,
    converter: Option<RateConverter>,
    worker: Option<JoinHandle<()>>,
    /// Resampled 16 kHz samples not yet handed out.
    pending: Vec<i16>,
}

impl LiveChunkSource {
    /// Capture from the system default input device.
    pub fn new() -> Self {
        Self::with_device(None)
    }

    /// Capture from the named input device, falling back to the default when
    /// the name does not resolve. Hosts routing call audio through a loopback
    /// or virtual device pass its name here.
    pub fn with_device(preferred_device: Option<String>) -> Self {
        Self {
            preferred_device,
            running: Arc::new(AtomicBool::new(false)),
            consumer: None,
            converter: None,
            worker: None,
            pending: Vec::new(),
        }
    }
}

impl Default for LiveChunkSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioChunkSource for LiveChunkSource {
    fn start(&mut self) -> Result<()> {
        if self.worker.is_some() {
            return Err(VigilError::AudioSource("capture already started".into()));
        }

        let (producer, consumer) = create_audio_ring();
        self.running.store(true, Ordering::Release);

        let running = Arc::clone(&self.running);
        let preferred = self.preferred_device.clone();
        let (ack_tx, ack_rx) = mpsc::channel();

        let worker = thread::Builder::new()
            .name("vigil-capture".into())
            .spawn(move || capture_thread(producer, running, preferred, ack_tx))
            .map_err(|e| VigilError::AudioSource(format!("capture thread spawn: {e}")))?;

        let device_rate = match ack_rx.recv() {
            Ok(Ok(rate)) => rate,
            Ok(Err(e)) => {
                self.running.store(false, Ordering::Release);
                let _ = worker.join();
                return Err(e);
            }
            Err(_) => {
                self.running.store(false, Ordering::Release);
                let _ = worker.join();
                return Err(VigilError::AudioSource(
                    "capture thread exited before reporting".into(),
                ));
            }
        };

        self.converter = Some(RateConverter::new(
            device_rate,
            SAMPLE_RATE_HZ,
            RESAMPLE_BLOCK,
        )?);
        self.consumer = Some(consumer);
        self.worker = Some(worker);
        Ok(())
    }

    fn capture_chunk(&mut self, duration_ms: u64) -> Result<AudioChunk> {
        let consumer = self
            .consumer
            .as_mut()
            .ok_or_else(|| VigilError::AudioSource("capture not started".into()))?;
        let converter = self
            .converter
            .as_mut()
            .ok_or_else(|| VigilError::AudioSource("capture not started".into()))?;

        let wanted = samples_for_ms(duration_ms);
        let deadline = Instant::now() + Duration::from_millis(duration_ms);
        let mut scratch = vec![0f32; 4096];

        loop {
            loop {
                let n = consumer.pop_slice(&mut scratch);
                if n == 0 {
                    break;
                }
                let resampled = converter.process(&scratch[..n]);
                self.pending.extend(resampled.iter().map(|&s| f32_to_i16(s)));
            }

            if self.pending.len() >= wanted
                || Instant::now() >= deadline
                || !self.running.load(Ordering::Acquire)
            {
                break;
            }
            thread::sleep(DRAIN_INTERVAL);
        }

        let take = self.pending.len().min(wanted);
        let samples: Vec<i16> = self.pending.drain(..take).collect();
        Ok(AudioChunk::new(samples, SAMPLE_RATE_HZ))
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("capture thread panicked during shutdown");
            }
        }
        self.consumer = None;
        self.converter = None;
        self.pending.clear();
    }
}

impl Drop for LiveChunkSource {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Body of the capture thread: open the stream, report the device rate, keep
/// the stream alive until `running` clears, then drop it on this same thread.
fn capture_thread(
    producer: AudioProducer,
    running: Arc<AtomicBool>,
    preferred: Option<String>,
    ack: mpsc::Sender<Result<u32>>,
) {
    let opened = match open_stream(producer, Arc::clone(&running), preferred.as_deref()) {
        Ok(opened) => opened,
        Err(e) => {
            let _ = ack.send(Err(e));
            return;
        }
    };
    let _ = ack.send(Ok(opened.sample_rate));

    while running.load(Ordering::Acquire) {
        thread::sleep(KEEPALIVE_INTERVAL);
    }
    // Stream drops here, on its creation thread.
    drop(opened);
}

struct OpenedStream {
    /// Kept alive so the stream is not dropped prematurely.
    _stream: Stream,
    sample_rate: u32,
}

fn open_stream(
    producer: AudioProducer,
    running: Arc<AtomicBool>,
    preferred: Option<&str>,
) -> Result<OpenedStream> {
    let host = cpal::default_host();

    let mut selected = None;
    if let Some(name) = preferred {
        match host.input_devices() {
            Ok(mut devices) => {
                selected = devices.find(|d| d.name().map(|n| n == name).unwrap_or(false));
                if selected.is_none() {
                    warn!("preferred input device '{name}' not found, falling back");
                }
            }
            Err(e) => warn!("failed to list input devices while resolving preference: {e}"),
        }
    }

    let device = if let Some(device) = selected {
        device
    } else if let Some(default) = host.default_input_device() {
        default
    } else {
        let mut devices = host
            .input_devices()
            .map_err(|e| VigilError::AudioSource(e.to_string()))?;
        let fallback = devices.next().ok_or(VigilError::NoDefaultInputDevice)?;
        warn!("no default input device, falling back to first available input");
        fallback
    };

    info!(
        device = device.name().unwrap_or_default().as_str(),
        "opening input device"
    );

    let supported = device
        .default_input_config()
        .map_err(|e| VigilError::AudioSource(e.to_string()))?;
    let sample_rate = supported.sample_rate().0;
    let channels = supported.channels();

    info!(sample_rate, channels, "audio config selected");

    let config = StreamConfig {
        channels,
        sample_rate: SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let stream = match supported.sample_format() {
        SampleFormat::F32 => build_stream::<f32, _>(&device, &config, producer, running, |s| s),
        SampleFormat::I16 => build_stream::<i16, _>(&device, &config, producer, running, |s| {
            s as f32 / 32768.0
        }),
        SampleFormat::U8 => build_stream::<u8, _>(&device, &config, producer, running, |s| {
            (s as f32 - 128.0) / 128.0
        }),
        fmt => {
            return Err(VigilError::AudioStream(format!(
                "unsupported sample format: {fmt:?}"
            )))
        }
    }?;

    stream
        .play()
        .map_err(|e| VigilError::AudioStream(e.to_string()))?;

    Ok(OpenedStream {
        _stream: stream,
        sample_rate,
    })
}

fn build_stream<T, F>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut producer: AudioProducer,
    running: Arc<AtomicBool>,
    to_f32: F,
) -> Result<Stream>
where
    T: cpal::SizedSample,
    F: Fn(T) -> f32 + Send + 'static,
{
    let channels = config.channels as usize;
    let mut mix_buf: Vec<f32> = Vec::new();

    device
        .build_input_stream(
            config,
            move |data: &[T], _info: &cpal::InputCallbackInfo| {
                if !running.load(Ordering::Relaxed) {
                    return;
                }
                mix_to_mono(data, channels, &mut mix_buf, &to_f32);
                let written = producer.push_slice(&mix_buf);
                if written < mix_buf.len() {
                    warn!("ring buffer full: dropped {} frames", mix_buf.len() - written);
                }
            },
            |err| error!("audio stream error: {err}"),
            None,
        )
        .map_err(|e| VigilError::AudioStream(e.to_string()))
}

/// Average interleaved frames down to one mono f32 sample per frame.
fn mix_to_mono<T: Copy, F: Fn(T) -> f32>(
    data: &[T],
    channels: usize,
    out: &mut Vec<f32>,
    to_f32: &F,
) {
    out.clear();
    if channels <= 1 {
        out.extend(data.iter().copied().map(to_f32));
        return;
    }
    for frame in data.chunks_exact(channels) {
        let sum: f32 = frame.iter().copied().map(to_f32).sum();
        out.push(sum / channels as f32);
    }
}

fn samples_for_ms(duration_ms: u64) -> usize {
    duration_ms as usize * SAMPLE_RATE_HZ as usize / 1000
}

fn f32_to_i16(s: f32) -> i16 {
    (s.clamp(-1.0, 1.0) * 32767.0).round() as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_for_ms_at_analysis_rate() {
        assert_eq!(samples_for_ms(2000), 32_000);
        assert_eq!(samples_for_ms(100), 1600);
    }

    #[test]
    fn f32_to_i16_clamps_out_of_range() {
        assert_eq!(f32_to_i16(1.5), 32_767);
        assert_eq!(f32_to_i16(-2.0), -32_767);
        assert_eq!(f32_to_i16(0.0), 0);
    }

    #[test]
    fn mix_to_mono_averages_stereo_frames() {
        let data = [0.2f32, 0.4, -0.5, 0.5];
        let mut out = Vec::new();
        mix_to_mono(&data, 2, &mut out, &|s| s);
        assert_eq!(out.len(), 2);
        assert!((out[0] - 0.3).abs() < 1e-6);
        assert!(out[1].abs() < 1e-6);
    }
}
