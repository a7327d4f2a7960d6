//! Audio analysis for the sampler
//!
//! Provides the smoothed magnitude spectrum fed to the visualization layer.

mod spectrum;

pub use spectrum::{SpectrumAnalyzer, DEFAULT_FFT_SIZE, DEFAULT_SMOOTHING};
