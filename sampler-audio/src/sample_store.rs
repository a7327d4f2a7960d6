//! Thread-safe sample slots with atomic hot-swap

use crate::channel::Channel;
use crate::engine::EngineError;
use crate::sample::Sample;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Default)]
struct Slot {
    current: Option<Arc<Sample>>,
    /// Previous sample, kept alive until the next swap so a render block
    /// still holding it is not the one to free it
    retired: Option<Arc<Sample>>,
}

/// Sample storage for every channel
///
/// Readers get an `Arc` handle cloned under a short lock and mix from it
/// without holding the lock. A swap replaces the handle, so a reader sees
/// either the old or the new sample in full.
pub struct SampleStore {
    slots: Box<[Mutex<Slot>]>,
}

impl SampleStore {
    /// Create a store with `channel_count` empty slots
    pub fn new(channel_count: usize) -> Self {
        Self {
            slots: (0..channel_count).map(|_| Mutex::new(Slot::default())).collect(),
        }
    }

    /// Number of slots
    pub fn channel_count(&self) -> usize {
        self.slots.len()
    }

    /// Replace the sample for `channel`
    ///
    /// Returns the evicted sample (two swaps old) so the caller can drop it
    /// once it holds no other locks. Voice invalidation is the engine's
    /// job; see [`Engine::load_sample`](crate::Engine::load_sample).
    pub fn load(&self, channel: Channel, sample: Sample) -> Result<Option<Arc<Sample>>, EngineError> {
        let slot = self
            .slots
            .get(channel.slot())
            .ok_or(EngineError::UnknownChannel(channel))?;
        let sample = Arc::new(sample);
        let mut slot = slot.lock();
        let previous = slot.current.replace(sample);
        Ok(std::mem::replace(&mut slot.retired, previous))
    }

    /// Read handle for one block of mixing
    #[inline]
    pub fn get(&self, channel: Channel) -> Option<Arc<Sample>> {
        self.get_slot(channel.slot())
    }

    /// Read handle by slot index
    #[inline]
    pub fn get_slot(&self, slot: usize) -> Option<Arc<Sample>> {
        self.slots.get(slot).and_then(|s| s.lock().current.clone())
    }

    /// Whether `channel` currently holds a sample
    pub fn is_loaded(&self, channel: Channel) -> bool {
        self.slots
            .get(channel.slot())
            .map(|s| s.lock().current.is_some())
            .unwrap_or(false)
    }

    /// Native rate of the sample in `channel`, if loaded
    pub fn sample_rate(&self, channel: Channel) -> Option<u32> {
        self.slots
            .get(channel.slot())
            .and_then(|s| s.lock().current.as_ref().map(|sample| sample.sample_rate()))
    }
}
