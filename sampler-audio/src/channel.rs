//! Sample channels - the unit of sample ownership and voice spawning

use std::fmt;

/// An addressable sample slot
///
/// The melodic channel tracks pitch across the keyboard; pad channels
/// always play their sample at its recorded speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Melodic,
    Pad(u8),
}

impl Channel {
    /// Slot index in the sample store (melodic first, then pads)
    #[inline]
    pub fn slot(self) -> usize {
        match self {
            Channel::Melodic => 0,
            Channel::Pad(index) => 1 + index as usize,
        }
    }

    /// Inverse of [`Channel::slot`]
    pub fn from_slot(slot: usize) -> Option<Self> {
        match slot {
            0 => Some(Channel::Melodic),
            n => u8::try_from(n - 1).ok().map(Channel::Pad),
        }
    }

    /// Whether spawning on this channel follows the played key
    #[inline]
    pub fn tracks_pitch(self) -> bool {
        matches!(self, Channel::Melodic)
    }

    /// Whether this channel exists for an engine with `num_pads` pads
    #[inline]
    pub fn is_valid(self, num_pads: usize) -> bool {
        match self {
            Channel::Melodic => true,
            Channel::Pad(index) => (index as usize) < num_pads,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Melodic => write!(f, "melodic"),
            Channel::Pad(index) => write!(f, "pad {}", index),
        }
    }
}
