//! Sample files and user configuration for the sampler

mod config;
mod loader;

pub use config::Config;
pub use loader::{DecodedAudio, LoadError, SampleLoader};
