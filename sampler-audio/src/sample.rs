//! Decoded mono PCM held by the sample store

/// Immutable mono sample data
///
/// Never mutated after construction; replacement happens by swapping the
/// whole sample in the [`SampleStore`](crate::SampleStore).
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    data: Vec<f32>,
    sample_rate: u32,
}

impl Sample {
    /// Wrap mono PCM recorded at `sample_rate`
    pub fn new(data: Vec<f32>, sample_rate: u32) -> Self {
        Self { data, sample_rate }
    }

    /// Build a mono sample from interleaved PCM
    ///
    /// Multichannel input is reduced by averaging each frame (for stereo,
    /// the mean of the L/R pair). A trailing partial frame is dropped and
    /// `channels == 0` is treated as mono.
    pub fn from_interleaved(pcm: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        let channels = channels.max(1) as usize;
        if channels == 1 {
            return Self::new(pcm, sample_rate);
        }

        let scale = 1.0 / channels as f32;
        let mono = pcm
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() * scale)
            .collect();
        Self::new(mono, sample_rate)
    }

    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Duration in seconds at the native rate
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.data.len() as f64 / self.sample_rate as f64
    }

    /// Linearly interpolated value at fractional position `pos`
    ///
    /// Returns `None` once `pos + 1` reaches the end, so the read of
    /// `data[floor(pos) + 1]` is always in bounds.
    #[inline]
    pub fn interpolate(&self, pos: f64) -> Option<f32> {
        if pos < 0.0 || pos + 1.0 >= self.data.len() as f64 {
            return None;
        }
        let index = pos as usize;
        let frac = (pos - index as f64) as f32;
        let s0 = self.data[index];
        let s1 = self.data[index + 1];
        Some(s0 + frac * (s1 - s0))
    }
}
