//! Audio file loading and decoding

use sampler_audio::{Channel, Engine, EngineError};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur during sample loading
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No audio track found in file")]
    NoAudioTrack,
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("File contains no audio frames")]
    Empty,
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Decoded PCM as handed to the engine
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Interleaved samples (f32, normalized to -1.0 to 1.0)
    pub samples: Vec<f32>,
    /// Native sample rate in Hz
    pub sample_rate: u32,
    /// Number of interleaved channels
    pub channels: u16,
}

impl DecodedAudio {
    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }
}

/// Audio file decoder using Symphonia
///
/// Decodes at the file's native rate; the engine handles rate conversion
/// through each voice's playback increment.
#[derive(Debug, Default, Clone, Copy)]
pub struct SampleLoader;

impl SampleLoader {
    pub fn new() -> Self {
        Self
    }

    /// Decode an audio file to interleaved f32
    pub fn decode(&self, path: &Path) -> Result<DecodedAudio, LoadError> {
        // Open the file
        let file = std::fs::File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        // Create hint from file extension
        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| LoadError::Decode(e.to_string()))?;

        let mut format = probed.format;

        // First decodable audio track
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(LoadError::NoAudioTrack)?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let mut sample_rate = codec_params.sample_rate.unwrap_or(44100);
        let mut channels = codec_params
            .channels
            .map(|c| c.count() as u16)
            .unwrap_or(1);

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| LoadError::Decode(e.to_string()))?;

        let mut samples: Vec<f32> = Vec::new();
        let mut skipped_packets = 0usize;

        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(LoadError::Decode(e.to_string())),
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(d) => d,
                // Corrupt packet: skip it, keep the rest of the file
                Err(SymphoniaError::DecodeError(_)) => {
                    skipped_packets += 1;
                    continue;
                }
                Err(e) => return Err(LoadError::Decode(e.to_string())),
            };

            // The decoded spec is authoritative over the container's
            let spec = *decoded.spec();
            sample_rate = spec.rate;
            channels = spec.channels.count() as u16;

            let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            sample_buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(sample_buf.samples());
        }

        if skipped_packets > 0 {
            warn!(path = %path.display(), skipped_packets, "skipped undecodable packets");
        }

        if samples.is_empty() {
            return Err(LoadError::Empty);
        }

        let audio = DecodedAudio {
            samples,
            sample_rate,
            channels,
        };
        debug!(
            path = %path.display(),
            frames = audio.frames(),
            sample_rate,
            channels,
            "decoded audio file"
        );
        Ok(audio)
    }

    /// Decode `path` and load it into `channel`
    ///
    /// Decoding finishes before the engine is touched; on failure the
    /// channel keeps whatever it held before.
    pub fn load_into(&self, engine: &Engine, channel: Channel, path: &Path) -> Result<(), LoadError> {
        let audio = match self.decode(path) {
            Ok(audio) => audio,
            Err(e) => {
                warn!(path = %path.display(), %channel, error = %e, "failed to load sample");
                return Err(e);
            }
        };
        engine.load_interleaved(channel, audio.samples, audio.sample_rate, audio.channels)?;
        info!(path = %path.display(), %channel, "sample ready");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;
    use std::path::PathBuf;

    /// Write a 16-bit PCM WAV file
    fn write_wav(name: &str, samples: &[f32], sample_rate: u32, channels: u16) -> PathBuf {
        let path = std::env::temp_dir().join(format!("sampler-{}-{}.wav", std::process::id(), name));
        let data_len = (samples.len() * 2) as u32;
        let block_align = channels * 2;

        let mut bytes = Vec::with_capacity(44 + data_len as usize);
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&channels.to_le_bytes());
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
        bytes.extend_from_slice(&block_align.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        for &s in samples {
            let v = (s.clamp(-1.0, 1.0) * 32767.0).round() as i16;
            bytes.extend_from_slice(&v.to_le_bytes());
        }

        std::fs::write(&path, bytes).unwrap();
        path
    }

    fn sine(len: usize, sample_rate: u32) -> Vec<f32> {
        (0..len)
            .map(|i| 0.5 * (2.0 * PI * 440.0 * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn test_decode_mono_wav() {
        let source = sine(4410, 44100);
        let path = write_wav("mono", &source, 44100, 1);

        let audio = SampleLoader::new().decode(&path).unwrap();
        assert_eq!(audio.sample_rate, 44100);
        assert_eq!(audio.channels, 1);
        assert_eq!(audio.frames(), 4410);
        for (a, b) in audio.samples.iter().zip(source.iter()) {
            assert!((a - b).abs() < 1e-3);
        }

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_decode_stereo_wav_keeps_interleaving() {
        let frames: Vec<f32> = (0..1000).flat_map(|_| [0.5f32, -0.5]).collect();
        let path = write_wav("stereo", &frames, 48000, 2);

        let audio = SampleLoader::new().decode(&path).unwrap();
        assert_eq!(audio.channels, 2);
        assert_eq!(audio.sample_rate, 48000);
        assert_eq!(audio.frames(), 1000);
        assert!((audio.samples[0] - 0.5).abs() < 1e-3);
        assert!((audio.samples[1] + 0.5).abs() < 1e-3);

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = SampleLoader::new().decode(Path::new("/nonexistent/sample.wav"));
        assert!(matches!(result, Err(LoadError::Io(_))));
    }

    #[test]
    fn test_garbage_file_is_decode_error() {
        let path = std::env::temp_dir().join(format!("sampler-{}-garbage.wav", std::process::id()));
        std::fs::write(&path, b"definitely not audio").unwrap();

        let result = SampleLoader::new().decode(&path);
        assert!(matches!(result, Err(LoadError::Decode(_))));

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_load_into_engine_downmixes() {
        let frames: Vec<f32> = (0..500).flat_map(|_| [0.5f32, 0.0]).collect();
        let path = write_wav("load-into", &frames, 22050, 2);

        let engine = Engine::default();
        SampleLoader::new()
            .load_into(&engine, Channel::Pad(1), &path)
            .unwrap();

        let sample = engine.sample(Channel::Pad(1)).unwrap();
        assert_eq!(sample.len(), 500);
        assert_eq!(sample.sample_rate(), 22050);
        assert!((sample.data()[0] - 0.25).abs() < 1e-3);

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_failed_load_keeps_previous_sample() {
        let path = write_wav("keep-previous", &sine(100, 44100), 44100, 1);
        let engine = Engine::default();
        let loader = SampleLoader::new();
        loader.load_into(&engine, Channel::Melodic, &path).unwrap();

        let result = loader.load_into(&engine, Channel::Melodic, Path::new("/nonexistent.wav"));
        assert!(result.is_err());
        assert_eq!(engine.sample(Channel::Melodic).unwrap().len(), 100);

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_unknown_channel_reported() {
        let path = write_wav("bad-channel", &sine(100, 44100), 44100, 1);
        let engine = Engine::default();

        let result = SampleLoader::new().load_into(&engine, Channel::Pad(42), &path);
        assert!(matches!(result, Err(LoadError::Engine(EngineError::UnknownChannel(_)))));

        let _ = std::fs::remove_file(path);
    }
}
