//! Renderer - the real-time half of the engine
//!
//! Owned by the audio callback. Per block it snapshots the sample slots,
//! mixes every live voice, applies headroom, purges dead voices and
//! publishes the block for the spectrum analyzer.

use crate::engine::Engine;
use crate::sample::Sample;
use std::sync::Arc;

/// Block renderer holding all scratch memory for the audio thread
pub struct Renderer {
    engine: Arc<Engine>,
    /// Per-slot sample handles for the block being mixed
    samples: Vec<Option<Arc<Sample>>>,
    /// Output of [`Renderer::render_block`]
    block: Vec<f32>,
}

impl Renderer {
    pub(crate) fn new(engine: Arc<Engine>) -> Self {
        let channels = engine.config().channel_count();
        let block_len = engine.config().block_frames * 2;
        Self {
            samples: vec![None; channels],
            block: vec![0.0; block_len],
            engine,
        }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Render `frame_count` frames and return them interleaved stereo
    ///
    /// At most `block_frames` are rendered per call; the returned slice is
    /// the authoritative length. Use [`Renderer::render_into`] for device
    /// buffers of arbitrary size.
    pub fn render_block(&mut self, frame_count: usize) -> &[f32] {
        let len = frame_count.min(self.engine.config().block_frames) * 2;
        let out = &mut self.block[..len];
        mix_block(&self.engine, &mut self.samples, out);
        publish_snapshot(&self.engine, out);
        &self.block[..len]
    }

    /// Fill an interleaved stereo device buffer of any length
    ///
    /// Rendered as consecutive blocks of at most `block_frames`. The
    /// snapshot receives the trailing `block_frames` of the buffer, so the
    /// analyzer sees the same amount of audio whatever the driver's size.
    pub fn render_into(&mut self, out: &mut [f32]) {
        let block_len = self.engine.config().block_frames * 2;
        for chunk in out.chunks_mut(block_len) {
            mix_block(&self.engine, &mut self.samples, chunk);
        }
        let tail = out.len().saturating_sub(block_len);
        publish_snapshot(&self.engine, &out[tail..]);
    }
}

/// Mix one block into `out` (interleaved stereo, overwritten)
fn mix_block(engine: &Engine, samples: &mut [Option<Arc<Sample>>], out: &mut [f32]) {
    out.fill(0.0);
    let bend = engine.pitch_bend_factor();

    {
        let mut voices = engine.voices.lock();
        for (slot, handle) in samples.iter_mut().enumerate() {
            *handle = engine.store.get_slot(slot);
        }
        voices.render(samples, bend, out);
        voices.purge();
    }

    let headroom = engine.config().headroom;
    for sample in out.iter_mut() {
        *sample *= headroom;
    }

    // The store keeps swapped-out samples alive, so this is not the last owner
    samples.fill(None);
}

/// Copy at most one block into the audio snapshot
///
/// The snapshot is allocated at `block_frames * 2` and never grows.
fn publish_snapshot(engine: &Engine, block: &[f32]) {
    let mut snapshot = engine.snapshot.lock();
    snapshot.clear();
    snapshot.extend_from_slice(block);
}
