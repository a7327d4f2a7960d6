//! Engine constants
//!
//! Defaults mirror the controller the sampler was built around: a 121-key
//! keyboard plus 8 pads, rendered at 44.1kHz in 256-frame blocks.

use std::time::Duration;

/// Static engine configuration, fixed for the lifetime of an [`Engine`](crate::Engine)
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Output device sample rate in Hz
    pub output_sample_rate: u32,
    /// Frames per render block
    pub block_frames: usize,
    /// Number of keyboard keys (valid keys are `0..num_keys`)
    pub num_keys: usize,
    /// Number of percussion pads
    pub num_pads: usize,
    /// Key that plays the melodic sample at its recorded pitch
    pub reference_key: u8,
    /// Pitch bend range in semitones at full deflection
    pub pitch_bend_range: f32,
    /// Output attenuation applied after mixing
    pub headroom: f32,
    /// Voice arena capacity
    pub max_voices: usize,
    /// Spectrum transform length
    pub fft_size: usize,
    /// Spectrum smoothing factor (weight of the newest frame)
    pub smoothing: f32,
    /// Interval between velocity decay ticks
    pub decay_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            output_sample_rate: 44100,
            block_frames: 256,
            num_keys: 121,
            num_pads: 8,
            reference_key: 60,
            pitch_bend_range: 5.0,
            headroom: 0.2,
            max_voices: 64,
            fft_size: sampler_analysis::DEFAULT_FFT_SIZE,
            smoothing: sampler_analysis::DEFAULT_SMOOTHING,
            decay_interval: Duration::from_millis(10),
        }
    }
}

impl EngineConfig {
    /// Pitch bend wheel centre position
    pub const BEND_CENTER: u8 = 64;

    /// Clamp sizes that must be non-zero
    pub fn sanitized(mut self) -> Self {
        self.output_sample_rate = self.output_sample_rate.max(1);
        self.block_frames = self.block_frames.max(1);
        self.max_voices = self.max_voices.max(1);
        self.fft_size = self.fft_size.max(2);
        self
    }

    /// Number of sample slots (one melodic + one per pad)
    pub fn channel_count(&self) -> usize {
        1 + self.num_pads
    }

    /// Playback speed multiplier for a pitch bend value (0-127, centre 64)
    #[inline]
    pub fn pitch_bend_factor(&self, value: u8) -> f64 {
        let bend = value.min(127) as f64 - Self::BEND_CENTER as f64;
        2.0f64.powf(bend * self.pitch_bend_range as f64 / 12.0 / 63.0)
    }

    /// Equal-tempered pitch ratio of `key` relative to the reference key
    #[inline]
    pub fn pitch_ratio(&self, key: u8) -> f64 {
        2.0f64.powf((key as f64 - self.reference_key as f64) / 12.0)
    }
}
