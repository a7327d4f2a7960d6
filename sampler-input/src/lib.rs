//! Controller input for the sampler
//!
//! Turns the raw USB-MIDI packet stream of the keyboard/pad controller
//! into [`ControlEvent`](sampler_audio::ControlEvent)s.

mod packet;
mod reader;

pub use packet::{decode_packet, pad_index, KEYBOARD_CABLE, PACKET_SIZE, PAD_CABLE};
pub use reader::PacketReader;
