//! # Tuner Session
//!
//! Owns the capture source and a dedicated worker thread. The worker runs
//! every incoming buffer through the pitch tracker and the
//! [`TunerPipeline`](crate::pipeline::TunerPipeline), and publishes one
//! [`TunerFrame`] per buffer. Only the latest frame is kept: a frame the
//! reader has not taken yet is replaced by the next one, so a slow or idle
//! reader never builds a backlog.
//!
//! Configuration changes travel to the worker over a channel, so a switch of
//! instrument or tuning is applied between two buffers and never in the
//! middle of one.

use crate::audio::{AudioBuffer, CaptureSource};
use crate::config::Configuration;
use crate::error::TunerError;
use crate::pipeline::{TunerFrame, TunerPipeline};
use crate::pitch::{PitchEstimator, PitchTracker};
use crate::timeline::SystemClock;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

/// Where the session stands with its capture source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// Capture started, no buffer received yet.
    Pending,
    /// Buffers are flowing.
    Running,
    /// Capture could not be started; the reason is shown to the user.
    Denied(String),
}

type SharedStatus = Arc<Mutex<SessionStatus>>;

/// Frames held for the reader at any time.
const FRAME_SLOTS: usize = 1;

fn set_status(status: &SharedStatus, value: SessionStatus) {
    match status.lock() {
        Ok(mut guard) => *guard = value,
        Err(poisoned) => *poisoned.into_inner() = value,
    }
}

/// Worker thread management structure.
#[derive(Debug)]
struct SessionWorker {
    shutdown_tx: Sender<()>,
    handle: JoinHandle<()>,
}

/// A running tuner: capture source, worker thread and output channel.
pub struct TunerSession {
    source: Box<dyn CaptureSource>,
    worker: Option<SessionWorker>,
    frames: Receiver<Arc<TunerFrame>>,
    config_tx: Sender<Configuration>,
    status: SharedStatus,
}

impl TunerSession {
    /// Spawns the worker, then starts `source`.
    ///
    /// A capture failure does not fail the call: the session comes back in
    /// the [`SessionStatus::Denied`] state with its worker already stopped.
    pub fn start(
        config: Configuration,
        source: Box<dyn CaptureSource>,
        estimator: Box<dyn PitchEstimator>,
    ) -> Self {
        let (audio_tx, audio_rx) = crossbeam_channel::bounded::<AudioBuffer>(4);
        let (frame_tx, frame_rx) = crossbeam_channel::bounded(FRAME_SLOTS);
        let (config_tx, config_rx) = crossbeam_channel::unbounded();
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
        let status: SharedStatus = Arc::new(Mutex::new(SessionStatus::Pending));

        let mut session = Self {
            source,
            worker: None,
            frames: frame_rx,
            config_tx,
            status: status.clone(),
        };

        let worker_status = status.clone();
        let stale_rx = session.frames.clone();
        let spawned = thread::Builder::new()
            .name("tuner-session".into())
            .spawn(move || {
                run_worker(
                    config,
                    estimator,
                    audio_rx,
                    config_rx,
                    shutdown_rx,
                    frame_tx,
                    stale_rx,
                    worker_status,
                )
            })
            .map_err(|source| TunerError::Spawn {
                name: "tuner-session",
                source,
            });
        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                log::error!("[SESSION] {}", e);
                set_status(&status, SessionStatus::Denied(e.to_string()));
                return session;
            }
        };
        session.worker = Some(SessionWorker {
            shutdown_tx,
            handle,
        });

        if let Err(e) = session.source.start(audio_tx) {
            log::error!("[SESSION] Capture failed to start: {}", e);
            set_status(&status, SessionStatus::Denied(e.to_string()));
            session.shutdown_worker();
        }
        session
    }

    /// Latest frame published by the worker. Frames not taken before the
    /// next buffer is processed are dropped.
    pub fn frames(&self) -> &Receiver<Arc<TunerFrame>> {
        &self.frames
    }

    pub fn status(&self) -> SessionStatus {
        match self.status.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Sample rate of the capture source, once known.
    pub fn sample_rate(&self) -> Option<u32> {
        self.source.sample_rate()
    }

    /// Sends a new configuration to the worker, which applies it before
    /// the next buffer.
    pub fn reconfigure(&self, config: Configuration) {
        if self.config_tx.send(config).is_err() {
            log::warn!("[SESSION] Worker is gone, configuration not applied");
        }
    }

    /// Stops capture, then the worker. Safe to call more than once.
    pub fn stop(&mut self) {
        self.source.stop();
        self.shutdown_worker();
    }

    fn shutdown_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            log::info!("[SESSION] Shutting down worker...");
            let _ = worker.shutdown_tx.send(());
            if worker.handle.join().is_err() {
                log::error!("[SESSION] Worker thread panicked");
            }
            log::info!("[SESSION] Worker stopped");
        }
    }
}

impl Drop for TunerSession {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker(
    config: Configuration,
    estimator: Box<dyn PitchEstimator>,
    audio_rx: Receiver<AudioBuffer>,
    config_rx: Receiver<Configuration>,
    shutdown_rx: Receiver<()>,
    frame_tx: Sender<Arc<TunerFrame>>,
    stale_rx: Receiver<Arc<TunerFrame>>,
    status: SharedStatus,
) {
    log::info!("[SESSION] Worker started");
    let mut tracker = PitchTracker::new(estimator);
    let mut pipeline = TunerPipeline::new(&config, Arc::new(SystemClock));
    let mut running = false;

    loop {
        crossbeam_channel::select! {
            recv(audio_rx) -> msg => match msg {
                Ok(buffer) => {
                    if !running {
                        log::info!("[SESSION] First buffer received at {} Hz", buffer.sample_rate);
                        set_status(&status, SessionStatus::Running);
                        running = true;
                    }
                    let sample = tracker.track(&buffer.samples, buffer.sample_rate);
                    let frame = pipeline.process(&sample, &buffer.samples);
                    publish_latest(&frame_tx, &stale_rx, Arc::new(frame));
                }
                Err(_) => {
                    log::info!("[SESSION] Audio channel closed");
                    break;
                }
            },
            recv(config_rx) -> msg => {
                if let Ok(config) = msg {
                    if pipeline.reconfigure(&config) {
                        tracker.reset();
                    }
                }
            },
            recv(shutdown_rx) -> _ => {
                log::info!("[SESSION] Received shutdown signal");
                break;
            },
        }
    }
}

/// Puts `frame` in the slot, evicting a frame the reader has not taken.
fn publish_latest(
    frame_tx: &Sender<Arc<TunerFrame>>,
    stale_rx: &Receiver<Arc<TunerFrame>>,
    mut frame: Arc<TunerFrame>,
) {
    loop {
        match frame_tx.try_send(frame) {
            Ok(()) => return,
            Err(TrySendError::Full(rejected)) => {
                if let Ok(stale) = stale_rx.try_recv() {
                    log::trace!("[SESSION] Dropped unread frame #{}", stale.buffer_id);
                }
                frame = rejected;
            }
            Err(TrySendError::Disconnected(_)) => return,
        }
    }
}
