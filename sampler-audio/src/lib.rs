//! Audio engine for the sampler - sample store, voices, and the render path
//!
//! This module provides the core audio processing pipeline:
//! - SampleStore: hot-swappable mono PCM per channel
//! - VoicePool: fixed-capacity arena of sounding notes with voice stealing
//! - Renderer: the real-time block mixer and audio snapshot
//! - VelocityBank: per-key / per-pad display intensity with tick decay
//! - Engine: shared state tying it all together for every thread

mod channel;
mod config;
mod engine;
mod event;
mod mixer;
mod sample;
mod sample_store;
mod velocity;
mod voice;

pub use channel::Channel;
pub use config::EngineConfig;
pub use engine::{Engine, EngineError};
pub use event::ControlEvent;
pub use mixer::Renderer;
pub use sample::Sample;
pub use sample_store::SampleStore;
pub use velocity::{VelocityBank, MAX_VELOCITY};
pub use voice::{Spawned, Voice, VoicePool};
