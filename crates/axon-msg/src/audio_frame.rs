//! PCM audio frame messages.

use crate::{Buf, MsgHeader};

/// One frame of interleaved PCM samples.
///
/// The payload buffer holds raw samples; the metadata fields describe
/// their layout so a consumer can interpret them without side-channel
/// negotiation.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    header: MsgHeader,
    buf: Buf,
    /// Samples per second.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u32,
    /// Width of one sample in bytes.
    pub bytes_per_sample: u32,
    /// Samples carried per channel.
    pub samples_per_channel: u32,
    /// Presentation timestamp in microseconds.
    pub timestamp_us: i64,
    /// `true` on the last frame of a stream.
    pub eof: bool,
}

impl AudioFrame {
    /// Creates an empty frame with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            header: MsgHeader::new(name),
            buf: Buf::default(),
            sample_rate: 0,
            channels: 0,
            bytes_per_sample: 0,
            samples_per_channel: 0,
            timestamp_us: 0,
            eof: false,
        }
    }

    /// The payload buffer.
    #[must_use]
    pub fn buf(&self) -> &Buf {
        &self.buf
    }

    /// Mutable payload buffer (lock checks apply on its accessors).
    pub fn buf_mut(&mut self) -> &mut Buf {
        &mut self.buf
    }

    /// Shared routing header.
    #[must_use]
    pub fn header(&self) -> &MsgHeader {
        &self.header
    }

    /// Mutable routing header.
    pub fn header_mut(&mut self) -> &mut MsgHeader {
        &mut self.header
    }

    pub(crate) fn from_parts(header: MsgHeader, buf: Buf) -> Self {
        Self {
            header,
            buf,
            ..Self::new("")
        }
    }
}
