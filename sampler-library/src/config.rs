//! Simple configuration persistence for the sampler
//!
//! Stores which samples to load on startup, the controller device and a
//! couple of engine sizing knobs.

use sampler_audio::{Channel, EngineConfig};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Application configuration
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Config {
    /// Sample for the pitched keyboard channel
    pub melodic_sample: Option<PathBuf>,
    /// Samples for the percussion pads, keyed by pad index
    pub pad_samples: BTreeMap<u8, PathBuf>,
    /// Source of raw 4-byte USB-MIDI event packets, such as a FIFO fed
    /// from the controller's bulk IN endpoint
    ///
    /// Not an ALSA `/dev/midiN` node: those carry plain MIDI bytes without
    /// the cable/CIN header.
    pub midi_device: Option<PathBuf>,
    pub max_voices: Option<usize>,
    pub block_frames: Option<usize>,
}

impl Config {
    /// Load config from the default location
    ///
    /// Returns default config if file doesn't exist or can't be parsed.
    pub fn load() -> Self {
        let path = Self::config_path();
        Self::load_from(&path).unwrap_or_default()
    }

    /// Load config from a specific path
    pub fn load_from(path: &Path) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        debug!(path = %path.display(), "loaded config");
        Ok(Self::parse(&content))
    }

    /// Save config to the default location
    pub fn save(&self) -> io::Result<()> {
        let path = Self::config_path();
        self.save_to(&path)
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.serialize())
    }

    /// Get the default config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sampler")
            .join("config.txt")
    }

    /// Every configured sample with the channel it belongs to
    pub fn samples(&self) -> Vec<(Channel, &Path)> {
        let mut samples = Vec::with_capacity(1 + self.pad_samples.len());
        if let Some(ref path) = self.melodic_sample {
            samples.push((Channel::Melodic, path.as_path()));
        }
        for (&index, path) in &self.pad_samples {
            samples.push((Channel::Pad(index), path.as_path()));
        }
        samples
    }

    /// Apply the sizing overrides on top of `base`
    pub fn engine_config(&self, base: EngineConfig) -> EngineConfig {
        let mut config = base;
        if let Some(max_voices) = self.max_voices {
            config.max_voices = max_voices;
        }
        if let Some(block_frames) = self.block_frames {
            config.block_frames = block_frames;
        }
        config.sanitized()
    }

    /// Parse config from simple key=value format
    pub fn parse(content: &str) -> Self {
        let mut config = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();
            if value.is_empty() {
                continue;
            }

            match key {
                "melodic_sample" => config.melodic_sample = Some(PathBuf::from(value)),
                "midi_device" => config.midi_device = Some(PathBuf::from(value)),
                "max_voices" => {
                    if let Ok(n) = value.parse() {
                        config.max_voices = Some(n);
                    }
                }
                "block_frames" => {
                    if let Ok(n) = value.parse() {
                        config.block_frames = Some(n);
                    }
                }
                _ => {
                    if let Some(index) = key
                        .strip_prefix("pad_sample.")
                        .and_then(|n| n.parse::<u8>().ok())
                    {
                        config.pad_samples.insert(index, PathBuf::from(value));
                    }
                    // Ignore unknown keys
                }
            }
        }

        config
    }

    /// Serialize config to simple key=value format
    fn serialize(&self) -> String {
        let mut lines = vec!["# Sampler Configuration".to_string()];

        if let Some(ref path) = self.melodic_sample {
            lines.push(format!("melodic_sample={}", path.display()));
        }
        for (index, path) in &self.pad_samples {
            lines.push(format!("pad_sample.{}={}", index, path.display()));
        }
        if let Some(ref device) = self.midi_device {
            lines.push(format!("midi_device={}", device.display()));
        }
        if let Some(n) = self.max_voices {
            lines.push(format!("max_voices={}", n));
        }
        if let Some(n) = self.block_frames {
            lines.push(format!("block_frames={}", n));
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty() {
        assert_eq!(Config::parse(""), Config::default());
    }

    #[test]
    fn test_parse_full() {
        let content = "\
# Comment
melodic_sample=/samples/piano.wav
pad_sample.0=/samples/kick.wav
pad_sample.7 = /samples/clap.flac
midi_device=/run/sampler/controller.usbmidi
max_voices=32
block_frames=512";
        let config = Config::parse(content);

        assert_eq!(config.melodic_sample, Some(PathBuf::from("/samples/piano.wav")));
        assert_eq!(config.pad_samples.len(), 2);
        assert_eq!(config.pad_samples[&7], PathBuf::from("/samples/clap.flac"));
        assert_eq!(config.midi_device, Some(PathBuf::from("/run/sampler/controller.usbmidi")));
        assert_eq!(config.max_voices, Some(32));
        assert_eq!(config.block_frames, Some(512));
    }

    #[test]
    fn test_unknown_keys_and_bad_numbers_ignored() {
        let content = "volume=11\nmax_voices=lots\npad_sample.x=/a.wav\nnot a pair";
        assert_eq!(Config::parse(content), Config::default());
    }

    #[test]
    fn test_samples_in_channel_order() {
        let config = Config::parse("pad_sample.3=/c.wav\npad_sample.1=/b.wav\nmelodic_sample=/a.wav");
        let channels: Vec<Channel> = config.samples().into_iter().map(|(c, _)| c).collect();
        assert_eq!(channels, vec![Channel::Melodic, Channel::Pad(1), Channel::Pad(3)]);
    }

    #[test]
    fn test_engine_config_overrides() {
        let config = Config::parse("max_voices=16\nblock_frames=128");
        let engine = config.engine_config(EngineConfig::default());
        assert_eq!(engine.max_voices, 16);
        assert_eq!(engine.block_frames, 128);
        assert_eq!(engine.output_sample_rate, 44100);

        let untouched = Config::default().engine_config(EngineConfig::default());
        assert_eq!(untouched.max_voices, EngineConfig::default().max_voices);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let mut config = Config::default();
        config.melodic_sample = Some(PathBuf::from("/test/piano.wav"));
        config.pad_samples.insert(2, PathBuf::from("/test/snare.wav"));
        config.max_voices = Some(48);

        let path = std::env::temp_dir()
            .join(format!("sampler-config-{}", std::process::id()))
            .join("config.txt");
        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_load_missing_file_errors() {
        assert!(Config::load_from(Path::new("/nonexistent/sampler/config.txt")).is_err());
    }
}
