//! FFT-based spectrum analyzer for real-time visualization

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

/// Default transform length (bins exposed = half of this)
pub const DEFAULT_FFT_SIZE: usize = 8192;

/// Default weight of the newest magnitude in the exponential average
pub const DEFAULT_SMOOTHING: f32 = 0.75;

/// Smoothed magnitude spectrum analyzer
///
/// Each call to [`SpectrumAnalyzer::analyze`] windows one mono buffer,
/// transforms it and folds the magnitudes into a running exponential
/// average. The analyzer is not real-time bound; it runs at the display
/// cadence, but still keeps every buffer preallocated.
pub struct SpectrumAnalyzer {
    fft_size: usize,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    smoothing: f32,
    smoothed: Vec<f32>,
    /// Pre-allocated FFT buffer to avoid allocation in analyze()
    fft_buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl SpectrumAnalyzer {
    /// Create a new spectrum analyzer
    ///
    /// `fft_size` is clamped to at least 2, `smoothing` to `0.0..=1.0`.
    pub fn new(fft_size: usize, smoothing: f32) -> Self {
        let fft_size = fft_size.max(2);
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let scratch_len = fft.get_inplace_scratch_len();
        tracing::debug!(fft_size, smoothing, "planned spectrum transform");

        // Symmetric Hann window (endpoints both zero)
        let denom = (fft_size - 1) as f32;
        let window: Vec<f32> = (0..fft_size)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / denom).cos()))
            .collect();

        Self {
            fft_size,
            fft,
            window,
            smoothing: smoothing.clamp(0.0, 1.0),
            smoothed: vec![0.0; fft_size / 2],
            fft_buffer: vec![Complex::new(0.0, 0.0); fft_size],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
        }
    }

    /// Transform length
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of spectral lines exposed (`fft_size / 2`)
    pub fn bins(&self) -> usize {
        self.smoothed.len()
    }

    /// Smoothing factor in use
    pub fn smoothing(&self) -> f32 {
        self.smoothing
    }

    /// Window coefficients (for inspection and tests)
    pub fn window(&self) -> &[f32] {
        &self.window
    }

    /// Analyze a buffer of mono samples and return the smoothed spectrum
    ///
    /// Input longer than the FFT size is truncated, shorter input is
    /// zero padded.
    pub fn analyze(&mut self, samples: &[f32]) -> &[f32] {
        let sample_count = samples.len().min(self.fft_size);
        for (slot, (&sample, &w)) in self
            .fft_buffer
            .iter_mut()
            .zip(samples.iter().zip(self.window.iter()))
            .take(sample_count)
        {
            *slot = Complex::new(sample * w, 0.0);
        }
        for slot in self.fft_buffer.iter_mut().skip(sample_count) {
            *slot = Complex::new(0.0, 0.0);
        }

        self.fft
            .process_with_scratch(&mut self.fft_buffer, &mut self.scratch);

        let alpha = self.smoothing;
        for (smoothed, bin) in self.smoothed.iter_mut().zip(self.fft_buffer.iter()) {
            let magnitude = (bin.re * bin.re + bin.im * bin.im).sqrt();
            *smoothed = alpha * magnitude + (1.0 - alpha) * *smoothed;
        }

        &self.smoothed
    }

    /// Current smoothed spectrum
    pub fn spectrum(&self) -> &[f32] {
        &self.smoothed
    }

    /// Centre frequency in Hz of bin `bin` at the given sample rate
    pub fn bin_frequency(&self, bin: usize, sample_rate: u32) -> f32 {
        bin as f32 * sample_rate as f32 / self.fft_size as f32
    }

    /// Forget all smoothing history
    pub fn reset(&mut self) {
        self.smoothed.fill(0.0);
    }

    /// Index and value of the strongest bin, if any bin is non-zero
    pub fn peak_bin(&self) -> Option<(usize, f32)> {
        self.smoothed
            .iter()
            .copied()
            .enumerate()
            .filter(|&(_, m)| m > 0.0)
            .fold(None, |best, (i, m)| match best {
                Some((_, bm)) if bm >= m => best,
                _ => Some((i, m)),
            })
    }
}

impl Default for SpectrumAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_FFT_SIZE, DEFAULT_SMOOTHING)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn test_hann_window_shape() {
        let analyzer = SpectrumAnalyzer::new(64, 0.75);
        let w = analyzer.window();
        assert_eq!(w.len(), 64);
        assert!(w[0].abs() < 1e-6);
        assert!(w[63].abs() < 1e-6);
        // Symmetric
        for i in 0..32 {
            assert!((w[i] - w[63 - i]).abs() < 1e-5);
        }
        assert!(w.iter().all(|&x| (0.0..=1.0).contains(&x)));
    }

    #[test]
    fn test_bin_count_is_half_fft_size() {
        let analyzer = SpectrumAnalyzer::new(1024, 0.75);
        assert_eq!(analyzer.bins(), 512);
        assert_eq!(analyzer.spectrum().len(), 512);
    }

    #[test]
    fn test_silence_converges_to_zero() {
        let mut analyzer = SpectrumAnalyzer::new(512, 0.75);
        analyzer.analyze(&sine(1000.0, 44100.0, 512));
        assert!(analyzer.spectrum().iter().any(|&m| m > 0.0));

        let silence = vec![0.0; 512];
        for _ in 0..200 {
            analyzer.analyze(&silence);
        }
        assert!(
            analyzer.spectrum().iter().all(|&m| m < 1e-6),
            "spectrum should decay to zero under silence"
        );
    }

    #[test]
    fn test_smoothing_weights_newest_frame() {
        let mut analyzer = SpectrumAnalyzer::new(256, 0.75);
        let tone = sine(2000.0, 44100.0, 256);
        let first = analyzer.analyze(&tone).to_vec();
        let second = analyzer.analyze(&tone).to_vec();
        // s1 = 0.75 m, s2 = 0.75 m + 0.25 * 0.75 m = 0.9375 m
        for (a, b) in first.iter().zip(second.iter()) {
            if *a > 1e-3 {
                assert!((b / a - 1.25).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn test_peak_matches_tone_frequency() {
        let sample_rate = 44100;
        let mut analyzer = SpectrumAnalyzer::new(4096, 1.0);
        analyzer.analyze(&sine(3000.0, sample_rate as f32, 4096));

        let (bin, _) = analyzer.peak_bin().unwrap();
        let freq = analyzer.bin_frequency(bin, sample_rate);
        let bin_width = sample_rate as f32 / 4096.0;
        assert!((freq - 3000.0).abs() <= bin_width, "peak at {} Hz", freq);
    }

    #[test]
    fn test_values_non_negative_and_finite() {
        let mut analyzer = SpectrumAnalyzer::new(128, 0.5);
        let noisy: Vec<f32> = (0..300).map(|i| ((i * 7919) % 13) as f32 / 6.5 - 1.0).collect();
        for _ in 0..5 {
            analyzer.analyze(&noisy);
        }
        assert!(analyzer
            .spectrum()
            .iter()
            .all(|m| m.is_finite() && *m >= 0.0));
    }

    #[test]
    fn test_short_input_is_zero_padded() {
        let mut analyzer = SpectrumAnalyzer::new(512, 1.0);
        // A single impulse has a flat magnitude spectrum of w[0] = 0,
        // so use an impulse at the window centre instead.
        let mut impulse = vec![0.0; 257];
        impulse[256] = 1.0;
        analyzer.analyze(&impulse);
        let w = analyzer.window()[256];
        assert!(analyzer.spectrum().iter().all(|&m| (m - w).abs() < 1e-4));
    }

    #[test]
    fn test_reset_clears_history() {
        let mut analyzer = SpectrumAnalyzer::new(256, 0.75);
        analyzer.analyze(&sine(500.0, 44100.0, 256));
        analyzer.reset();
        assert!(analyzer.spectrum().iter().all(|&m| m == 0.0));
        assert!(analyzer.peak_bin().is_none());
    }
}
