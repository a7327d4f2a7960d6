//! Voices and the fixed-capacity voice arena

use crate::channel::Channel;
use crate::sample::Sample;
use std::sync::Arc;

/// One sounding instance of a sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Voice {
    /// Sample slot this voice reads from
    pub channel: Channel,
    /// Fractional read position in source frames
    pub position: f64,
    /// Source frames advanced per output frame before pitch bend
    pub increment: f64,
    /// Velocity gain (0.0 - 1.0)
    pub gain: f32,
    pub alive: bool,
    /// Spawn order, used to pick the oldest voice when stealing
    serial: u64,
}

impl Voice {
    fn new(channel: Channel, increment: f64, gain: f32, serial: u64) -> Self {
        Self {
            channel,
            position: 0.0,
            increment,
            gain: gain.clamp(0.0, 1.0),
            alive: true,
            serial,
        }
    }

    /// Mix up to `out.len() / 2` frames into the interleaved stereo accumulator
    ///
    /// Stops and marks the voice dead as soon as the next read would need
    /// `data[len]`.
    #[inline]
    fn render_into(&mut self, sample: &Sample, bend: f64, out: &mut [f32]) {
        let step = self.increment * bend;
        for frame in out.chunks_exact_mut(2) {
            let Some(value) = sample.interpolate(self.position) else {
                self.alive = false;
                return;
            };
            let value = value * self.gain;
            frame[0] += value;
            frame[1] += value;
            self.position += step;
        }
    }
}

/// Result of [`VoicePool::spawn`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spawned {
    /// Arena slot the voice landed in
    pub slot: usize,
    /// Channel of the voice that was evicted to make room, if any
    pub stolen: Option<Channel>,
}

/// Fixed-capacity arena of voices, indexed by slot
///
/// The arena is allocated once; spawning into a full pool steals the
/// quietest voice (oldest first on ties) instead of growing.
pub struct VoicePool {
    slots: Box<[Option<Voice>]>,
    next_serial: u64,
}

impl VoicePool {
    /// Create an arena with room for `capacity` voices (at least one)
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity.max(1)].into_boxed_slice(),
            next_serial: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Start a new voice at position 0
    pub fn spawn(&mut self, channel: Channel, increment: f64, gain: f32) -> Spawned {
        let serial = self.next_serial;
        self.next_serial += 1;

        let (slot, stolen) = match self.slots.iter().position(Option::is_none) {
            Some(free) => (free, None),
            None => {
                let victim = self.steal_candidate();
                (victim, self.slots[victim].map(|v| v.channel))
            }
        };

        self.slots[slot] = Some(Voice::new(channel, increment, gain, serial));
        Spawned { slot, stolen }
    }

    /// Slot of the quietest voice, oldest first among equals
    fn steal_candidate(&self) -> usize {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|v| (i, v)))
            .min_by(|(_, a), (_, b)| {
                a.gain
                    .total_cmp(&b.gain)
                    .then_with(|| a.serial.cmp(&b.serial))
            })
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    /// Remove every voice reading from `channel`, returning how many were removed
    pub fn clear_channel(&mut self, channel: Channel) -> usize {
        let mut cleared = 0;
        for slot in self.slots.iter_mut() {
            if slot.map_or(false, |v| v.channel == channel) {
                *slot = None;
                cleared += 1;
            }
        }
        cleared
    }

    /// Remove all voices
    pub fn clear(&mut self) {
        self.slots.fill(None);
    }

    /// Live voices on `channel`
    pub fn active_count(&self, channel: Channel) -> usize {
        self.iter()
            .filter(|v| v.alive && v.channel == channel)
            .count()
    }

    /// Live voices on all channels
    pub fn total_active(&self) -> usize {
        self.iter().filter(|v| v.alive).count()
    }

    /// Occupied slots, including voices marked dead but not yet purged
    pub fn iter(&self) -> impl Iterator<Item = &Voice> {
        self.slots.iter().flatten()
    }

    /// Voice in `slot`, if occupied
    pub fn get(&self, slot: usize) -> Option<&Voice> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Mix every live voice into `out` (interleaved stereo, accumulated)
    ///
    /// `samples` is indexed by channel slot. Voices whose channel has no
    /// sample contribute silence and are marked dead. Dead voices stay in
    /// their slot until [`VoicePool::purge`].
    pub fn render(&mut self, samples: &[Option<Arc<Sample>>], bend: f64, out: &mut [f32]) {
        for voice in self.slots.iter_mut().flatten() {
            if !voice.alive {
                continue;
            }
            match samples.get(voice.channel.slot()).and_then(Option::as_ref) {
                Some(sample) => voice.render_into(sample, bend, out),
                None => voice.alive = false,
            }
        }
    }

    /// Free the slots of dead voices, returning how many were freed
    pub fn purge(&mut self) -> usize {
        let mut purged = 0;
        for slot in self.slots.iter_mut() {
            if slot.map_or(false, |v| !v.alive) {
                *slot = None;
                purged += 1;
            }
        }
        purged
    }
}
