//! Control events consumed by the engine

/// Typed controller events
///
/// Produced by the input layer, dispatched with
/// [`Engine::handle_event`](crate::Engine::handle_event).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    /// Keyboard key pressed (velocity 0 counts as a release)
    NoteOn { key: u8, velocity: u8 },
    /// Keyboard key released; voices end by sample exhaustion only
    NoteOff { key: u8 },
    /// Percussion pad hit (velocity 0 counts as a release)
    PadOn { index: u8, velocity: u8 },
    PadOff { index: u8 },
    /// Pitch wheel position, 0-127 with 64 at rest
    PitchBend(u8),
}

impl ControlEvent {
    /// Whether this event can start a voice
    pub fn is_trigger(&self) -> bool {
        match self {
            ControlEvent::NoteOn { velocity, .. } | ControlEvent::PadOn { velocity, .. } => {
                *velocity > 0
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_velocity_is_not_a_trigger() {
        assert!(ControlEvent::NoteOn { key: 60, velocity: 1 }.is_trigger());
        assert!(!ControlEvent::NoteOn { key: 60, velocity: 0 }.is_trigger());
        assert!(!ControlEvent::PadOn { index: 0, velocity: 0 }.is_trigger());
        assert!(!ControlEvent::PitchBend(100).is_trigger());
    }
}
