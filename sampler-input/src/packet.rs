//! USB-MIDI event packet decoding
//!
//! Each packet is four bytes: byte 0 carries the virtual cable in the
//! high nibble and the code index number (CIN) in the low nibble, bytes
//! 1-3 hold the MIDI message itself.

use sampler_audio::ControlEvent;

/// Size of one USB-MIDI event packet
pub const PACKET_SIZE: usize = 4;

/// Cable carrying the keyboard and pitch wheel
pub const KEYBOARD_CABLE: u8 = 0;
/// Cable carrying the percussion pads
pub const PAD_CABLE: u8 = 2;

const CIN_NOTE_OFF: u8 = 0x8;
const CIN_NOTE_ON: u8 = 0x9;
const CIN_PITCH_BEND: u8 = 0xE;

/// Pad index for a note number on the pad cable
///
/// The pads send 0x28-0x2B for the top row and 0x30-0x33 for the bottom.
pub fn pad_index(note: u8) -> Option<u8> {
    match note {
        0x28..=0x2B => Some(note - 0x28),
        0x30..=0x33 => Some(note - 0x30 + 4),
        _ => None,
    }
}

/// Decode one packet into a control event
///
/// Returns `None` for short packets and for messages the sampler does not
/// react to.
pub fn decode_packet(packet: &[u8]) -> Option<ControlEvent> {
    if packet.len() < PACKET_SIZE {
        return None;
    }
    let cable = packet[0] >> 4;
    let cin = packet[0] & 0x0F;
    let (note, value) = (packet[2], packet[3]);

    match (cable, cin) {
        (KEYBOARD_CABLE, CIN_NOTE_ON) => Some(ControlEvent::NoteOn {
            key: note,
            velocity: value,
        }),
        (KEYBOARD_CABLE, CIN_NOTE_OFF) => Some(ControlEvent::NoteOff { key: note }),
        // Only the MSB of the 14-bit bend is used
        (KEYBOARD_CABLE, CIN_PITCH_BEND) => Some(ControlEvent::PitchBend(value)),
        (PAD_CABLE, CIN_NOTE_ON) => pad_index(note).map(|index| ControlEvent::PadOn {
            index,
            velocity: value,
        }),
        (PAD_CABLE, CIN_NOTE_OFF) => pad_index(note).map(|index| ControlEvent::PadOff { index }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyboard_note_on() {
        assert_eq!(
            decode_packet(&[0x09, 0x90, 60, 100]),
            Some(ControlEvent::NoteOn { key: 60, velocity: 100 })
        );
    }

    #[test]
    fn test_keyboard_note_off() {
        assert_eq!(
            decode_packet(&[0x08, 0x80, 72, 0]),
            Some(ControlEvent::NoteOff { key: 72 })
        );
    }

    #[test]
    fn test_pitch_bend_uses_msb() {
        assert_eq!(
            decode_packet(&[0x0E, 0xE0, 0x12, 100]),
            Some(ControlEvent::PitchBend(100))
        );
    }

    #[test]
    fn test_pad_mapping() {
        assert_eq!(pad_index(0x28), Some(0));
        assert_eq!(pad_index(0x2B), Some(3));
        assert_eq!(pad_index(0x30), Some(4));
        assert_eq!(pad_index(0x33), Some(7));
        assert_eq!(pad_index(0x2C), None);
        assert_eq!(pad_index(0x34), None);

        assert_eq!(
            decode_packet(&[0x29, 0x99, 0x31, 90]),
            Some(ControlEvent::PadOn { index: 5, velocity: 90 })
        );
        assert_eq!(
            decode_packet(&[0x28, 0x89, 0x2A, 0]),
            Some(ControlEvent::PadOff { index: 2 })
        );
    }

    #[test]
    fn test_unmapped_pad_note_ignored() {
        assert_eq!(decode_packet(&[0x29, 0x99, 0x40, 90]), None);
    }

    #[test]
    fn test_short_and_unknown_packets() {
        assert_eq!(decode_packet(&[0x09, 0x90, 60]), None);
        assert_eq!(decode_packet(&[]), None);
        // Control change on the keyboard cable
        assert_eq!(decode_packet(&[0x0B, 0xB0, 1, 64]), None);
        // Note-on on an unused cable
        assert_eq!(decode_packet(&[0x19, 0x90, 60, 100]), None);
    }
}
