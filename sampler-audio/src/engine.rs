//! Audio engine - shared state between render, control, decay and display threads
//!
//! Lock order, wherever more than one is held: voice pool, then sample
//! store slot. The audio snapshot and spectrum locks are never held
//! together with either.

use crate::channel::Channel;
use crate::config::EngineConfig;
use crate::event::ControlEvent;
use crate::mixer::Renderer;
use crate::sample::Sample;
use crate::sample_store::SampleStore;
use crate::velocity::{VelocityBank, MAX_VELOCITY};
use crate::voice::VoicePool;
use parking_lot::Mutex;
use sampler_analysis::SpectrumAnalyzer;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, trace};

/// Errors returned by engine control operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("no sample slot for {0}")]
    UnknownChannel(Channel),
}

/// Analyzer plus its copy of the latest snapshot's left channel
struct Analysis {
    analyzer: SpectrumAnalyzer,
    mono: Vec<f32>,
}

/// The sampler's audio engine
///
/// Shared behind an `Arc` by every thread. Control methods take `&self`
/// and hold locks only for O(1) or O(voice count) work; rendering happens
/// through a [`Renderer`] owned by the audio callback.
pub struct Engine {
    config: EngineConfig,
    pub(crate) store: SampleStore,
    pub(crate) voices: Mutex<VoicePool>,
    pitch_bend: AtomicU8,
    keys: VelocityBank,
    pads: VelocityBank,
    /// Most recent rendered block, interleaved stereo
    pub(crate) snapshot: Mutex<Vec<f32>>,
    analysis: Mutex<Analysis>,
    /// Smoothed spectrum as last published by `compute_spectrum`
    spectrum: Mutex<Vec<f32>>,
}

impl Engine {
    /// Create an engine with every sample slot empty
    pub fn new(config: EngineConfig) -> Self {
        let config = config.sanitized();
        let analyzer = SpectrumAnalyzer::new(config.fft_size, config.smoothing);
        let bins = analyzer.bins();

        info!(
            sample_rate = config.output_sample_rate,
            block_frames = config.block_frames,
            max_voices = config.max_voices,
            "audio engine created"
        );

        Self {
            store: SampleStore::new(config.channel_count()),
            voices: Mutex::new(VoicePool::new(config.max_voices)),
            pitch_bend: AtomicU8::new(EngineConfig::BEND_CENTER),
            keys: VelocityBank::new(config.num_keys),
            pads: VelocityBank::new(config.num_pads),
            snapshot: Mutex::new(vec![0.0; config.block_frames * 2]),
            analysis: Mutex::new(Analysis {
                analyzer,
                mono: Vec::with_capacity(config.fft_size),
            }),
            spectrum: Mutex::new(vec![0.0; bins]),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Create the render-thread half of the engine
    pub fn renderer(self: &Arc<Self>) -> Renderer {
        Renderer::new(Arc::clone(self))
    }

    /// Dispatch a controller event
    pub fn handle_event(&self, event: ControlEvent) {
        match event {
            ControlEvent::NoteOn { key, velocity } => {
                self.note_on(key, velocity);
            }
            ControlEvent::NoteOff { key } => self.note_off(key),
            ControlEvent::PadOn { index, velocity } => {
                self.pad_on(index, velocity);
            }
            ControlEvent::PadOff { index } => self.pad_off(index),
            ControlEvent::PitchBend(value) => self.pitch_bend(value),
        }
    }

    /// Start a melodic voice; returns whether a voice was spawned
    ///
    /// Keys outside the keyboard and zero velocities are ignored.
    pub fn note_on(&self, key: u8, velocity: u8) -> bool {
        if key as usize >= self.config.num_keys {
            debug!(key, "note-on outside keyboard range ignored");
            return false;
        }
        if velocity == 0 {
            self.note_off(key);
            return false;
        }
        let velocity = velocity.min(MAX_VELOCITY);
        self.spawn(Channel::Melodic, key, velocity);
        self.keys.set(key as usize, velocity);
        true
    }

    /// Key release; voices only end when their sample runs out
    pub fn note_off(&self, key: u8) {
        trace!(key, "note-off");
    }

    /// Trigger a percussion pad; returns whether a voice was spawned
    pub fn pad_on(&self, index: u8, velocity: u8) -> bool {
        if index as usize >= self.config.num_pads {
            debug!(index, "pad-on outside pad range ignored");
            return false;
        }
        if velocity == 0 {
            self.pad_off(index);
            return false;
        }
        let velocity = velocity.min(MAX_VELOCITY);
        self.spawn(Channel::Pad(index), self.config.reference_key, velocity);
        self.pads.set(index as usize, velocity);
        true
    }

    pub fn pad_off(&self, index: u8) {
        trace!(index, "pad-off");
    }

    /// Move the pitch wheel (0-127, 64 at rest); applies to every voice
    pub fn pitch_bend(&self, value: u8) {
        self.pitch_bend.store(value.min(127), Ordering::Relaxed);
    }

    /// Current pitch wheel value
    pub fn pitch_bend_value(&self) -> u8 {
        self.pitch_bend.load(Ordering::Relaxed)
    }

    /// Playback speed multiplier for the current pitch wheel position
    pub fn pitch_bend_factor(&self) -> f64 {
        self.config.pitch_bend_factor(self.pitch_bend_value())
    }

    /// Per-voice increment for a note on `channel`
    ///
    /// Fixed at spawn; pitch bend is applied separately while rendering.
    /// An unloaded channel is assumed to be at the output rate.
    fn increment_for(&self, channel: Channel, key: u8) -> f64 {
        let rate = self
            .store
            .sample_rate(channel)
            .unwrap_or(self.config.output_sample_rate);
        let ratio = if channel.tracks_pitch() {
            self.config.pitch_ratio(key)
        } else {
            1.0
        };
        rate as f64 / self.config.output_sample_rate as f64 * ratio
    }

    fn spawn(&self, channel: Channel, key: u8, velocity: u8) {
        let gain = velocity as f32 / MAX_VELOCITY as f32;
        let mut voices = self.voices.lock();
        let increment = self.increment_for(channel, key);
        let spawned = voices.spawn(channel, increment, gain);
        drop(voices);

        if let Some(stolen) = spawned.stolen {
            debug!(%channel, %stolen, slot = spawned.slot, "voice pool full, stole quietest voice");
        }
        trace!(%channel, key, velocity, increment, "voice spawned");
    }

    /// Replace the sample for `channel` and silence every voice reading it
    ///
    /// The swap and the voice clear happen under the voice lock, so a
    /// render block sees either the old sample with its voices or the new
    /// sample with none.
    pub fn load_sample(&self, channel: Channel, sample: Sample) -> Result<(), EngineError> {
        if !channel.is_valid(self.config.num_pads) {
            return Err(EngineError::UnknownChannel(channel));
        }
        let frames = sample.len();
        let rate = sample.sample_rate();

        let (cleared, evicted) = {
            let mut voices = self.voices.lock();
            let evicted = self.store.load(channel, sample)?;
            (voices.clear_channel(channel), evicted)
        };
        // Freeing a large buffer can take milliseconds; never under the voice lock
        drop(evicted);

        info!(%channel, frames, rate, cleared, "sample loaded");
        Ok(())
    }

    /// Reduce interleaved PCM to mono and load it
    pub fn load_interleaved(
        &self,
        channel: Channel,
        pcm: Vec<f32>,
        sample_rate: u32,
        channels: u16,
    ) -> Result<(), EngineError> {
        // Checked here too so a bad channel skips the downmix
        if !channel.is_valid(self.config.num_pads) {
            return Err(EngineError::UnknownChannel(channel));
        }
        self.load_sample(channel, Sample::from_interleaved(pcm, sample_rate, channels))
    }

    /// Whether `channel` currently holds a sample
    pub fn is_loaded(&self, channel: Channel) -> bool {
        self.store.is_loaded(channel)
    }

    /// Read handle to the sample in `channel`
    pub fn sample(&self, channel: Channel) -> Option<Arc<Sample>> {
        self.store.get(channel)
    }

    /// Live voices reading from `channel`
    pub fn active_voice_count(&self, channel: Channel) -> usize {
        self.voices.lock().active_count(channel)
    }

    /// Live voices on every channel
    pub fn total_active_voices(&self) -> usize {
        self.voices.lock().total_active()
    }

    /// Decay every key and pad intensity by one step
    pub fn decay_tick(&self) {
        self.keys.decay_tick();
        self.pads.decay_tick();
    }

    pub fn key_velocities_snapshot(&self) -> Vec<u8> {
        self.keys.snapshot()
    }

    pub fn pad_velocities_snapshot(&self) -> Vec<u8> {
        self.pads.snapshot()
    }

    /// Copy of the most recently rendered block (interleaved stereo)
    pub fn audio_snapshot(&self) -> Vec<f32> {
        self.snapshot.lock().clone()
    }

    /// Run the analyzer over the latest block's left channel
    ///
    /// The snapshot lock is held only while copying; the transform runs
    /// outside of it.
    pub fn compute_spectrum(&self) {
        let mut analysis = self.analysis.lock();
        let Analysis { analyzer, mono } = &mut *analysis;

        mono.clear();
        {
            let snapshot = self.snapshot.lock();
            mono.extend(
                snapshot
                    .chunks_exact(2)
                    .map(|frame| frame[0])
                    .take(analyzer.fft_size()),
            );
        }

        let smoothed = analyzer.analyze(mono.as_slice());
        self.spectrum.lock().copy_from_slice(smoothed);
    }

    /// Copy of the smoothed spectrum (`fft_size / 2` bins)
    pub fn spectrum_snapshot(&self) -> Vec<f32> {
        self.spectrum.lock().clone()
    }

    /// Strongest bin of the smoothed spectrum and its magnitude
    pub fn spectrum_peak(&self) -> Option<(usize, f32)> {
        self.analysis.lock().analyzer.peak_bin()
    }

    /// Drop the smoothing history and publish an all-zero spectrum
    pub fn reset_spectrum(&self) {
        let mut analysis = self.analysis.lock();
        analysis.analyzer.reset();
        self.spectrum.lock().fill(0.0);
    }

    /// Frequency in Hz of spectrum bin `bin`
    pub fn bin_frequency(&self, bin: usize) -> f32 {
        bin as f32 * self.config.output_sample_rate as f32 / self.config.fft_size as f32
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
