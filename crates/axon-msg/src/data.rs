//! Opaque data payload messages.

use crate::{Buf, MsgHeader};

/// A named, routed blob of bytes.
///
/// `Data` carries no interpretation; producers and consumers agree on
/// the payload format out of band (usually via the message name).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Data {
    header: MsgHeader,
    buf: Buf,
}

impl Data {
    /// Creates an empty data message with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            header: MsgHeader::new(name),
            buf: Buf::default(),
        }
    }

    /// Creates a data message owning `payload`.
    #[must_use]
    pub fn with_payload(name: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            header: MsgHeader::new(name),
            buf: Buf::new(payload),
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
        Self { header, buf }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_round_trip() {
        let data = Data::with_payload("blob", vec![1, 2, 3]);
        assert_eq!(data.buf().data(), &[1, 2, 3]);
        assert_eq!(data.header().name(), "blob");
    }

    #[test]
    fn clone_owns_independent_payload() {
        let data = Data::with_payload("blob", vec![1]);
        let mut copy = data.clone();
        copy.buf_mut().data_mut().unwrap().push(2);
        assert_eq!(data.buf().data(), &[1]);
        assert_eq!(copy.buf().data(), &[1, 2]);
    }
}
