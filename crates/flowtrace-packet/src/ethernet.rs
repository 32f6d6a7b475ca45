use crate::buffer::Buffer;
use crate::error::{Error, Result};
use std::fmt::{Debug, Formatter};

const DESTINATION_OFFSET: usize = 0;
const SOURCE_OFFSET: usize = 6;
const ETHERTYPE_OFFSET: usize = 12;

/// The `EtherType` of an `IPv4` payload.
pub const ETHERTYPE_IPV4: u16 = 0x0800;

/// Represents an Ethernet II frame.
///
/// The internal representation is held in network byte order (big-endian) and
/// all accessor methods take and return data in host byte order, converting as
/// necessary for the given architecture.
pub struct EthernetFrame<'a> {
    buf: Buffer<'a>,
}

impl<'a> EthernetFrame<'a> {
    pub fn new(frame: &'a mut [u8]) -> Result<Self> {
        if frame.len() >= Self::minimum_frame_size() {
            Ok(Self {
                buf: Buffer::Mutable(frame),
            })
        } else {
            Err(Error::InsufficientPacketBuffer(
                String::from("EthernetFrame"),
                Self::minimum_frame_size(),
                frame.len(),
            ))
        }
    }

    pub fn new_view(frame: &'a [u8]) -> Result<Self> {
        if frame.len() >= Self::minimum_frame_size() {
            Ok(Self {
                buf: Buffer::Immutable(frame),
            })
        } else {
            Err(Error::InsufficientPacketBuffer(
                String::from("EthernetFrame"),
                Self::minimum_frame_size(),
                frame.len(),
            ))
        }
    }

    #[must_use]
    pub const fn minimum_frame_size() -> usize {
        14
    }

    #[must_use]
    pub fn get_destination(&self) -> [u8; 6] {
        self.buf.get_bytes(DESTINATION_OFFSET)
    }

    #[must_use]
    pub fn get_source(&self) -> [u8; 6] {
        self.buf.get_bytes(SOURCE_OFFSET)
    }

    #[must_use]
    pub fn get_ethertype(&self) -> u16 {
        u16::from_be_bytes(self.buf.get_bytes(ETHERTYPE_OFFSET))
    }

    pub fn set_destination(&mut self, val: [u8; 6]) {
        self.buf.set_bytes(DESTINATION_OFFSET, val);
    }

    pub fn set_source(&mut self, val: [u8; 6]) {
        self.buf.set_bytes(SOURCE_OFFSET, val);
    }

    pub fn set_ethertype(&mut self, val: u16) {
        self.buf.set_bytes(ETHERTYPE_OFFSET, val.to_be_bytes());
    }

    pub fn set_payload(&mut self, vals: &[u8]) {
        let offset = Self::minimum_frame_size();
        self.buf.as_slice_mut()[offset..offset + vals.len()].copy_from_slice(vals);
    }

    #[must_use]
    pub fn frame(&self) -> &[u8] {
        self.buf.as_slice()
    }

    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.buf.as_slice()[Self::minimum_frame_size()..]
    }
}

impl Debug for EthernetFrame<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EthernetFrame")
            .field("destination", &self.get_destination())
            .field("source", &self.get_source())
            .field("ethertype", &self.get_ethertype())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_ethertype() {
        let mut buf = [0_u8; EthernetFrame::minimum_frame_size()];
        let mut frame = EthernetFrame::new(&mut buf).unwrap();
        frame.set_ethertype(ETHERTYPE_IPV4);
        assert_eq!(ETHERTYPE_IPV4, frame.get_ethertype());
        assert_eq!([0x08, 0x00], frame.frame()[12..=13]);
        frame.set_ethertype(0x86DD);
        assert_eq!(0x86DD, frame.get_ethertype());
        assert_eq!([0x86, 0xDD], frame.frame()[12..=13]);
    }

    #[test]
    fn test_addresses() {
        let mut buf = [0_u8; EthernetFrame::minimum_frame_size()];
        let mut frame = EthernetFrame::new(&mut buf).unwrap();
        frame.set_destination([0xFF; 6]);
        frame.set_source([0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x01]);
        assert_eq!([0xFF; 6], frame.get_destination());
        assert_eq!([0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x01], frame.get_source());
    }

    #[test]
    fn test_view_payload() {
        let buf = hex!("ff ff ff ff ff ff de ad be ef 00 01 08 00 45 00");
        let frame = EthernetFrame::new_view(&buf).unwrap();
        assert_eq!(ETHERTYPE_IPV4, frame.get_ethertype());
        assert_eq!(&[0x45, 0x00], frame.payload());
    }

    #[test]
    fn test_new_view_insufficient_buffer() {
        const SIZE: usize = EthernetFrame::minimum_frame_size();
        let buf = [0_u8; SIZE - 1];
        let err = EthernetFrame::new_view(&buf).unwrap_err();
        assert_eq!(
            Error::InsufficientPacketBuffer(String::from("EthernetFrame"), SIZE, SIZE - 1),
            err
        );
    }
}
