//! Per-key / per-pad display intensity

use std::sync::atomic::{AtomicU8, Ordering};

/// Maximum MIDI velocity
pub const MAX_VELOCITY: u8 = 127;

/// A bank of display intensities (0-127), one per key or pad
///
/// Set on note-on and decayed by one step per tick regardless of whether
/// anything is still sounding. Entries are independent atomics, so the
/// decay thread and the display never contend with the audio path.
pub struct VelocityBank {
    values: Box<[AtomicU8]>,
}

impl VelocityBank {
    pub fn new(len: usize) -> Self {
        Self {
            values: (0..len).map(|_| AtomicU8::new(0)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Set entry `index` to `velocity` (clamped to 127); out of range is ignored
    pub fn set(&self, index: usize, velocity: u8) {
        if let Some(value) = self.values.get(index) {
            value.store(velocity.min(MAX_VELOCITY), Ordering::Relaxed);
        }
    }

    /// Current value of entry `index`
    pub fn get(&self, index: usize) -> Option<u8> {
        self.values.get(index).map(|v| v.load(Ordering::Relaxed))
    }

    /// Decrement every non-zero entry by one
    pub fn decay_tick(&self) {
        for value in self.values.iter() {
            // Err means the entry was already zero
            let _ = value.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_sub(1));
        }
    }

    /// Copy of all entries
    pub fn snapshot(&self) -> Vec<u8> {
        self.values.iter().map(|v| v.load(Ordering::Relaxed)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_snapshot() {
        let bank = VelocityBank::new(4);
        bank.set(2, 100);
        assert_eq!(bank.snapshot(), vec![0, 0, 100, 0]);
    }

    #[test]
    fn test_out_of_range_ignored() {
        let bank = VelocityBank::new(2);
        bank.set(2, 100);
        assert_eq!(bank.snapshot(), vec![0, 0]);
        assert_eq!(bank.get(2), None);
    }

    #[test]
    fn test_velocity_clamped() {
        let bank = VelocityBank::new(1);
        bank.set(0, 200);
        assert_eq!(bank.get(0), Some(127));
    }

    #[test]
    fn test_decay_k_ticks() {
        for (v, k) in [(127u8, 1usize), (127, 127), (10, 3), (5, 20), (0, 4)] {
            let bank = VelocityBank::new(1);
            bank.set(0, v);
            for _ in 0..k {
                bank.decay_tick();
            }
            assert_eq!(bank.get(0), Some(v.saturating_sub(k as u8)));
        }
    }

    #[test]
    fn test_decay_floors_at_zero() {
        let bank = VelocityBank::new(3);
        bank.set(0, 1);
        bank.set(1, 2);
        bank.decay_tick();
        bank.decay_tick();
        bank.decay_tick();
        assert_eq!(bank.snapshot(), vec![0, 0, 0]);
    }
}
