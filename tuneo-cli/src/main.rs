//! Tuneo - terminal guitar and chromatic tuner
//!
//! Loads the persisted configuration, starts a tuner session on the default
//! microphone (or on a synthetic sweep) and prints one reading per frame.
//!
//! ## Command line flags
//!
//! - `--instrument <guitar|chromatic>`: override the configured instrument
//! - `--tuning <ref_440|ref_432|ref_444>`: override the reference pitch
//! - `--test-signal`: use the synthetic sweep instead of the microphone
//! - `--config <path>`: read (and write) the configuration at `path`
//! - `--save`: persist the resulting configuration

mod labels;

use anyhow::{Context, Result, bail};
use crossbeam_channel::{RecvTimeoutError, Sender};
use labels::Labels;
use std::io::BufRead;
use std::path::PathBuf;
use std::time::Duration;
use tuneo_core::audio::{CaptureSource, MicrophoneCapture, TestSignal};
use tuneo_core::config::{self, Configuration};
use tuneo_core::pitch::YinEstimator;
use tuneo_core::{InstrumentKind, SessionStatus, TunerFrame, TunerSession, TuningReference};

/// Parsed command line.
#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    instrument: Option<InstrumentKind>,
    tuning: Option<TuningReference>,
    test_signal: bool,
    config_path: Option<PathBuf>,
    save: bool,
}

impl CliArgs {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut parsed = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--instrument" => {
                    let id = args.next().context("--instrument needs a value")?;
                    parsed.instrument = Some(
                        InstrumentKind::from_id(&id)
                            .with_context(|| format!("unknown instrument `{id}`"))?,
                    );
                }
                "--tuning" => {
                    let id = args.next().context("--tuning needs a value")?;
                    parsed.tuning = Some(
                        TuningReference::from_id(&id)
                            .with_context(|| format!("unknown tuning `{id}`"))?,
                    );
                }
                "--config" => {
                    let path = args.next().context("--config needs a path")?;
                    parsed.config_path = Some(PathBuf::from(path));
                }
                "--test-signal" => parsed.test_signal = true,
                "--save" => parsed.save = true,
                other => bail!("unknown argument `{other}`"),
            }
        }
        Ok(parsed)
    }

    fn apply(&self, mut config: Configuration) -> Configuration {
        if let Some(instrument) = self.instrument {
            config.instrument = instrument;
        }
        if let Some(tuning) = self.tuning {
            config.tuning = tuning;
        }
        config
    }
}

/// One line of output for a frame.
fn reading_line(frame: &TunerFrame, labels: &Labels) -> String {
    let Some(target) = frame.target else {
        return labels.no_tone.to_string();
    };
    let strings = frame
        .strings
        .iter()
        .map(|note| {
            if *note == target.note {
                format!("[{note}]")
            } else {
                note.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    let pitch = if frame.has_tone() {
        format!("{:7.2} Hz", frame.pitch)
    } else {
        format!("{:>10}", labels.no_tone)
    };
    let hint = frame.hint.map(|h| h.to_string()).unwrap_or_default();
    let cents = frame
        .cents
        .map(|c| format!("{c:+6.1} ct"))
        .unwrap_or_default();
    format!(
        "{:<4} {pitch} {hint:<2} {cents:>9}  {}  {strings}",
        target.note.to_string(),
        frame.color
    )
}

/// Blocks until a line is entered on `input`, then asks the main loop to quit.
///
/// A closed or unreadable input never requests a quit, so the tuner keeps
/// running when started with stdin redirected from `/dev/null`.
fn watch_for_enter(mut input: impl BufRead, quit_tx: Sender<()>) -> bool {
    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(n) if n > 0 => quit_tx.send(()).is_ok(),
        Ok(_) => {
            log::info!("[MAIN] Standard input closed, stop with Ctrl+C");
            false
        }
        Err(e) => {
            log::warn!("[MAIN] Cannot read standard input: {}", e);
            false
        }
    }
}

fn main() -> Result<()> {
    let args = CliArgs::parse(std::env::args().skip(1))?;

    // Initialize logger - set RUST_LOG=debug for per-frame output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config_path = args
        .config_path
        .clone()
        .unwrap_or_else(config::default_config_path);
    let config = args.apply(config::load_config(&config_path));
    if args.save {
        config::save_config(&config, &config_path)
            .with_context(|| format!("saving configuration to {}", config_path.display()))?;
        log::info!("[CONFIG] Saved to {:?}", config_path);
    }

    let labels = Labels::for_language(config.language);
    println!(
        "{}: {}  {}: {}",
        labels.instrument,
        labels.instrument_name(config.instrument),
        labels.reference_a4,
        labels.tuning_name(config.tuning)
    );

    let source: Box<dyn CaptureSource> = if args.test_signal {
        Box::new(TestSignal::default())
    } else {
        Box::new(MicrophoneCapture::new())
    };
    let estimator = Box::new(YinEstimator::default().with_spectral_refinement(true));
    let mut session = TunerSession::start(config, source, estimator);

    if let SessionStatus::Denied(reason) = session.status() {
        bail!("{}: {}", labels.denied, reason);
    }
    println!("{}", labels.waiting);
    println!("{}", labels.press_enter);

    let (quit_tx, quit_rx) = crossbeam_channel::bounded::<()>(1);
    std::thread::Builder::new()
        .name("stdin-watch".into())
        .spawn(move || {
            watch_for_enter(std::io::stdin().lock(), quit_tx);
        })
        .context("spawning stdin watcher")?;

    let frames = session.frames().clone();
    loop {
        if quit_rx.try_recv().is_ok() {
            break;
        }
        match frames.recv_timeout(Duration::from_millis(200)) {
            Ok(frame) => println!("{}", reading_line(&frame, labels)),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                log::warn!("[MAIN] Session ended");
                break;
            }
        }
    }

    session.stop();
    Ok(())
}
