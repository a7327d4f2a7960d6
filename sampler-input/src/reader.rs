//! Streaming packet reader over any byte source

use crate::packet::{decode_packet, PACKET_SIZE};
use sampler_audio::ControlEvent;
use std::io::{self, Read};
use tracing::{trace, warn};

/// Yields control events from a stream of USB-MIDI packets
///
/// Reads may return any number of bytes; partial packets are carried over
/// to the next read. Ignored messages are skipped. The iterator ends at
/// end of stream or after the first I/O error, which is yielded once.
pub struct PacketReader<R> {
    inner: R,
    buf: [u8; 512],
    /// Valid bytes in `buf`
    filled: usize,
    /// Next undecoded byte in `buf`
    pos: usize,
    done: bool,
}

impl<R: Read> PacketReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: [0; 512],
            filled: 0,
            pos: 0,
            done: false,
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Refill the buffer, keeping any partial packet at the front
    fn fill(&mut self) -> io::Result<usize> {
        self.buf.copy_within(self.pos..self.filled, 0);
        self.filled -= self.pos;
        self.pos = 0;
        loop {
            match self.inner.read(&mut self.buf[self.filled..]) {
                Ok(n) => {
                    self.filled += n;
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl<R: Read> Iterator for PacketReader<R> {
    type Item = io::Result<ControlEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            while self.filled - self.pos >= PACKET_SIZE {
                let packet = &self.buf[self.pos..self.pos + PACKET_SIZE];
                self.pos += PACKET_SIZE;
                match decode_packet(packet) {
                    Some(event) => return Some(Ok(event)),
                    None => trace!(?packet, "ignored packet"),
                }
            }

            match self.fill() {
                Ok(0) => {
                    self.done = true;
                    if self.filled > self.pos {
                        warn!(bytes = self.filled - self.pos, "stream ended mid-packet");
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}
