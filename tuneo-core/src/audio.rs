//! # Audio Capture Module
//!
//! Sources of raw audio buffers for the tuner session.
//!
//! ## Features
//! - Microphone capture through CPAL on a dedicated thread
//! - Fixed-size frames accumulated in the audio callback
//! - Down-mixing of multi-channel devices to mono
//! - A synthetic test signal for running without hardware

use crate::error::{Result, TunerError};
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Number of samples per audio frame (about 93 ms at 44.1 kHz).
pub const BUFFER_SIZE: usize = 4096;

/// Sample rate requested from the device.
pub const PREFERRED_SAMPLE_RATE: u32 = 44100;

/// Buffers per second produced by the synthetic source.
pub const BUF_PER_SEC: u32 = 10;

/// One frame of raw audio.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Something that delivers [`AudioBuffer`]s until stopped.
pub trait CaptureSource: Send {
    /// Starts delivering buffers to `sender`.
    fn start(&mut self, sender: Sender<AudioBuffer>) -> Result<()>;

    /// Stops delivery. No buffer is sent after this returns.
    fn stop(&mut self);

    /// Actual sample rate, known once the source has started.
    fn sample_rate(&self) -> Option<u32>;
}

/// Handle to a running capture thread.
#[derive(Debug)]
struct Worker {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

impl Worker {
    fn shutdown(self, tag: &str) {
        let _ = self.stop_tx.send(());
        if self.handle.join().is_err() {
            log::error!("[{}] Capture thread panicked", tag);
        }
    }
}

/// Capture from the default input device.
#[derive(Debug, Default)]
pub struct MicrophoneCapture {
    worker: Option<Worker>,
    sample_rate: Option<u32>,
}

impl MicrophoneCapture {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CaptureSource for MicrophoneCapture {
    /// The CPAL stream is built and kept alive on its own thread, since
    /// streams cannot move between threads on every platform.
    fn start(&mut self, sender: Sender<AudioBuffer>) -> Result<()> {
        if self.worker.is_some() {
            return Err(TunerError::AlreadyRunning);
        }

        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<u32>>(1);
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);

        let handle = thread::Builder::new()
            .name("audio-capture".into())
            .spawn(move || {
                log::info!("[AUDIO-THREAD] Attempting to start audio capture...");
                let (stream, sample_rate) = match open_input_stream(sender) {
                    Ok(pair) => pair,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(sample_rate));

                // Park until told to stop (or the handle is dropped).
                let _ = stop_rx.recv();

                log::info!("[AUDIO-THREAD] Stopping stream...");
                if let Err(e) = stream.pause() {
                    log::warn!("[AUDIO-THREAD] Error pausing stream: {}", e);
                }
                drop(stream);
                log::info!("[AUDIO-THREAD] Audio thread finished");
            })
            .map_err(|source| TunerError::Spawn {
                name: "audio-capture",
                source,
            })?;

        let worker = Worker { stop_tx, handle };
        match ready_rx.recv() {
            Ok(Ok(sample_rate)) => {
                self.sample_rate = Some(sample_rate);
                self.worker = Some(worker);
                Ok(())
            }
            Ok(Err(e)) => {
                worker.shutdown("AUDIO-THREAD");
                Err(e)
            }
            Err(_) => {
                worker.shutdown("AUDIO-THREAD");
                Err(TunerError::CaptureThread)
            }
        }
    }

    fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.shutdown("AUDIO-THREAD");
        }
        self.sample_rate = None;
    }

    fn sample_rate(&self) -> Option<u32> {
        self.sample_rate
    }
}

impl Drop for MicrophoneCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Opens and starts an input stream on the default device.
///
/// Frames of [`BUFFER_SIZE`] mono samples are sent with `try_send`; a frame
/// is dropped rather than blocking the audio callback when the consumer lags.
fn open_input_stream(sender: Sender<AudioBuffer>) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host.default_input_device().ok_or(TunerError::NoInputDevice)?;
    let device_name = device.name().unwrap_or_else(|_| "unknown device".to_string());
    log::info!("[AUDIO-THREAD] Using audio input device: {}", device_name);

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, PREFERRED_SAMPLE_RATE).ok_or_else(|| {
        TunerError::NoSupportedFormat {
            device: device_name.clone(),
        }
    })?;

    let sample_rate = PREFERRED_SAMPLE_RATE.clamp(
        supported_config.min_sample_rate().0,
        supported_config.max_sample_rate().0,
    );
    let config = supported_config.with_sample_rate(cpal::SampleRate(sample_rate));
    let channels = config.channels().max(1) as usize;
    let config: cpal::StreamConfig = config.into();
    log::info!(
        "[AUDIO-THREAD] Selected sample rate: {} Hz, {} channel(s)",
        sample_rate,
        channels
    );

    let err_fn = |err| log::error!("[AUDIO-THREAD] An error occurred on the audio stream: {}", err);

    let mut frame = Vec::with_capacity(BUFFER_SIZE * 2);
    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            frame.extend(
                data.chunks(channels)
                    .map(|c| c.iter().sum::<f32>() / c.len() as f32),
            );

            while frame.len() >= BUFFER_SIZE {
                let samples = frame[..BUFFER_SIZE].to_vec();
                frame.drain(..BUFFER_SIZE);
                if let Err(TrySendError::Disconnected(_)) = sender.try_send(AudioBuffer {
                    samples,
                    sample_rate,
                }) {
                    return;
                }
            }
        },
        err_fn,
        None,
    )?;

    stream.play()?;
    Ok((stream, sample_rate))
}

/// Finds the best supported input configuration.
///
/// Only 32-bit float formats qualify. Mono is preferred over multi-channel,
/// then the range closest to `target_rate`.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let min = c.min_sample_rate().0;
            let max = c.max_sample_rate().0;
            let rate_distance = if (min..=max).contains(&target_rate) {
                0
            } else {
                min.abs_diff(target_rate).min(max.abs_diff(target_rate))
            };
            (c.channels() != 1, rate_distance)
        })
}

/// Synthetic source: a slow sweep from 80 to 500 Hz with a little vibrato.
#[derive(Debug)]
pub struct TestSignal {
    sample_rate: u32,
    buffers_per_second: u32,
    worker: Option<Worker>,
}

impl Default for TestSignal {
    fn default() -> Self {
        Self::new(PREFERRED_SAMPLE_RATE, BUF_PER_SEC)
    }
}

impl TestSignal {
    pub fn new(sample_rate: u32, buffers_per_second: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            buffers_per_second: buffers_per_second.max(1),
            worker: None,
        }
    }

    fn run(
        sample_rate: u32,
        buffers_per_second: u32,
        sender: Sender<AudioBuffer>,
        stop_rx: Receiver<()>,
    ) {
        let buf_size = (sample_rate / buffers_per_second) as usize;
        let ticker = crossbeam_channel::tick(Duration::from_secs(1) / buffers_per_second);
        let mut test_id = 0u64;
        loop {
            crossbeam_channel::select! {
                recv(stop_rx) -> _ => break,
                recv(ticker) -> _ => {
                    let samples = test_signal(test_id, sample_rate, buf_size);
                    if sender.send(AudioBuffer { samples, sample_rate }).is_err() {
                        break;
                    }
                    test_id += 1;
                }
            }
        }
        log::info!("[TEST-SIGNAL] Stopped after {} buffers", test_id);
    }
}

impl CaptureSource for TestSignal {
    fn start(&mut self, sender: Sender<AudioBuffer>) -> Result<()> {
        if self.worker.is_some() {
            return Err(TunerError::AlreadyRunning);
        }
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let (sample_rate, buffers_per_second) = (self.sample_rate, self.buffers_per_second);
        let handle = thread::Builder::new()
            .name("test-signal".into())
            .spawn(move || Self::run(sample_rate, buffers_per_second, sender, stop_rx))
            .map_err(|source| TunerError::Spawn {
                name: "test-signal",
                source,
            })?;
        log::info!(
            "[TEST-SIGNAL] Generating {} buffers/s at {} Hz",
            buffers_per_second,
            sample_rate
        );
        self.worker = Some(Worker { stop_tx, handle });
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.shutdown("TEST-SIGNAL");
        }
    }

    fn sample_rate(&self) -> Option<u32> {
        self.worker.as_ref().map(|_| self.sample_rate)
    }
}

impl Drop for TestSignal {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Frequency of the synthetic signal at step `test_id`.
///
/// Rises linearly from 80 to 500 Hz over 2000 steps, with a ripple of
/// ±2.1 Hz and a period of 50 steps.
pub fn test_frequency(test_id: u64) -> f32 {
    const TEST_LOWEST: f32 = 80.0;
    const TEST_HIGHEST: f32 = 500.0;
    let progress = (test_id % 2000) as f32 / 2000.0;
    let center_freq = TEST_LOWEST + (TEST_HIGHEST - TEST_LOWEST) * progress;
    let ripple = (TEST_HIGHEST - TEST_LOWEST) / 200.0;
    center_freq + ripple * (2.0 * std::f32::consts::PI * test_id as f32 / 50.0).sin()
}

/// One buffer of a sine at [`test_frequency`]`(test_id)`.
pub fn test_signal(test_id: u64, sample_rate: u32, buf_size: usize) -> Vec<f32> {
    let frequency = test_frequency(test_id);
    (0..buf_size)
        .map(|i| (2.0 * std::f32::consts::PI * i as f32 * frequency / sample_rate as f32).sin())
        .collect()
}
