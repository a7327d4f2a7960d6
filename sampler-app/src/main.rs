//! Sampler - real-time keyboard and pad sampler
//!
//! Plays a pitched sample across the keyboard and one-shot samples on the
//! percussion pads of a USB-MIDI controller.
//!
//! Usage: `sampler [melodic-sample] [midi-device]`, where `midi-device`
//! yields raw 4-byte USB-MIDI event packets.

use std::fs::File;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::EnvFilter;

use sampler_audio::{ControlEvent, Engine, EngineConfig};
use sampler_input::PacketReader;
use sampler_library::{Config, SampleLoader};

/// Spectrum refresh interval (~30 Hz)
const ANALYSIS_INTERVAL: Duration = Duration::from_millis(33);

/// Capacity of the controller event queue
const EVENT_QUEUE: usize = 1024;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = Config::load();
    let mut args = std::env::args().skip(1);
    if let Some(path) = args.next() {
        config.melodic_sample = Some(PathBuf::from(path));
    }
    if let Some(device) = args.next() {
        config.midi_device = Some(PathBuf::from(device));
    }

    let engine = Arc::new(Engine::new(config.engine_config(EngineConfig::default())));

    let loader = SampleLoader::new();
    for (channel, path) in config.samples() {
        // Failures are logged by the loader; the channel just stays silent
        let _ = loader.load_into(&engine, channel, path);
    }

    let controller = match config.midi_device {
        Some(ref path) => Some(
            File::open(path)
                .with_context(|| format!("failed to open controller {}", path.display()))?,
        ),
        None => {
            warn!("no controller device configured, running without input");
            None
        }
    };

    let stream = start_audio(&engine).context("failed to start audio output")?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let (event_tx, event_rx) = bounded(EVENT_QUEUE);

    let decay_handle = {
        let engine = Arc::clone(&engine);
        let shutdown = Arc::clone(&shutdown);
        thread::spawn(move || run_decay_thread(&engine, &shutdown))
    };
    let analysis_handle = {
        let engine = Arc::clone(&engine);
        let shutdown = Arc::clone(&shutdown);
        thread::spawn(move || run_analysis_thread(&engine, &shutdown))
    };

    // Input and stdin threads may sit in a blocking read, so they are
    // left detached rather than joined.
    let idle_tx = match controller {
        Some(device) => {
            thread::spawn(move || run_input_thread(device, event_tx));
            None
        }
        None => Some(event_tx),
    };
    {
        let shutdown = Arc::clone(&shutdown);
        thread::spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                if line.is_err() {
                    break;
                }
            }
            info!("stdin closed, shutting down");
            shutdown.store(true, Ordering::SeqCst);
        });
    }

    info!("sampler running, press Ctrl-D to quit");
    run_control_loop(&engine, &event_rx, &shutdown);

    shutdown.store(true, Ordering::SeqCst);
    drop(idle_tx);
    drop(stream);
    let _ = decay_handle.join();
    let _ = analysis_handle.join();

    info!("shutdown complete");
    Ok(())
}

/// Open the default output device at the engine rate and start rendering
fn start_audio(engine: &Arc<Engine>) -> anyhow::Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .context("no audio output device found")?;

    let default_config = device
        .default_output_config()
        .context("failed to get audio config")?;
    let channels: u16 = if default_config.channels() == 1 { 1 } else { 2 };

    let stream_config = cpal::StreamConfig {
        channels,
        sample_rate: cpal::SampleRate(engine.config().output_sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let mut renderer = engine.renderer();

    // Pre-allocate mono conversion buffer (8192 stereo frames)
    let mut stereo_buffer = vec![0.0f32; 16384];

    let stream = device
        .build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                if channels == 2 {
                    renderer.render_into(data);
                } else {
                    let stereo_len = data.len() * 2;
                    // Only if the driver hands out an unusually large buffer
                    if stereo_len > stereo_buffer.len() {
                        stereo_buffer.resize(stereo_len, 0.0);
                    }
                    let stereo = &mut stereo_buffer[..stereo_len];
                    renderer.render_into(stereo);
                    for (i, sample) in data.iter_mut().enumerate() {
                        *sample = (stereo[i * 2] + stereo[i * 2 + 1]) * 0.5;
                    }
                }
            },
            |err| {
                error!(%err, "audio stream error");
            },
            None,
        )
        .context("failed to create audio stream")?;

    stream.play().context("failed to start audio stream")?;

    info!(
        device = %device.name().unwrap_or_else(|_| "unknown".into()),
        sample_rate = stream_config.sample_rate.0,
        channels,
        "audio output started"
    );
    Ok(stream)
}

fn run_decay_thread(engine: &Engine, shutdown: &AtomicBool) {
    let interval = engine.config().decay_interval;
    while !shutdown.load(Ordering::Relaxed) {
        thread::sleep(interval);
        engine.decay_tick();
    }
}

fn run_analysis_thread(engine: &Engine, shutdown: &AtomicBool) {
    while !shutdown.load(Ordering::Relaxed) {
        let start = Instant::now();

        engine.compute_spectrum();
        if let Some((bin, magnitude)) = engine.spectrum_peak() {
            trace!(
                bin,
                frequency = engine.bin_frequency(bin),
                magnitude,
                "spectrum peak"
            );
        }

        let elapsed = start.elapsed();
        if elapsed < ANALYSIS_INTERVAL {
            thread::sleep(ANALYSIS_INTERVAL - elapsed);
        }
    }
}

/// Forward decoded controller events to the control loop
///
/// Returns when the device stream ends, which drops the sender and stops
/// the control loop.
fn run_input_thread(device: File, events: Sender<ControlEvent>) {
    for event in PacketReader::new(device) {
        let event = match event {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "controller read failed");
                break;
            }
        };
        match events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(?event, "event queue full, dropping event");
            }
            Err(TrySendError::Disconnected(_)) => return,
        }
    }
    info!("controller input ended");
}

fn run_control_loop(engine: &Engine, events: &Receiver<ControlEvent>, shutdown: &AtomicBool) {
    while !shutdown.load(Ordering::Relaxed) {
        match events.recv_timeout(Duration::from_millis(10)) {
            Ok(event) => {
                if event.is_trigger() {
                    debug!(?event, "trigger");
                } else {
                    trace!(?event, "control event");
                }
                engine.handle_event(event);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}
