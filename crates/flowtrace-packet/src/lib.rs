//! Packet wire format parsing and building.
//!
//! The following packets are supported:
//! - `Ethernet II`
//! - `IPv4`
//! - `TCP`
//! - `ICMPv4`
//!
//! This is deliberately the subset of the wire needed to ride a TCP flow and
//! to read the ICMP time-exceeded replies it provokes; there is no IPv6 and
//! no UDP here.
//!
//! # Endianness
//!
//! The internal representation is held in network byte order (big-endian) and
//! all accessor methods take and return data in host byte order, converting as
//! necessary for the given architecture.
//!
//! # Example
//!
//! The following example parses a TCP header and asserts its fields:
//!
//! ```rust
//! # fn main() -> anyhow::Result<()> {
//! use flowtrace_packet::tcp::TcpPacket;
//!
//! let buf = hex_literal::hex!("de ad 0a 6a 00 00 00 01 00 00 00 00 50 10 ff ff 55 cc 00 00");
//! let packet = TcpPacket::new_view(&buf)?;
//! assert_eq!(57005, packet.get_source());
//! assert_eq!(2666, packet.get_destination());
//! assert_eq!(1, packet.get_sequence());
//! # Ok(())
//! # }
//! ```
#![warn(clippy::all, clippy::pedantic, clippy::nursery, rust_2018_idioms)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![forbid(unsafe_code)]

mod buffer;

/// Packet errors.
pub mod error;

/// Functions for calculating network checksums.
pub mod checksum;

/// `Ethernet II` frames.
pub mod ethernet;

/// `IPv4` packets.
pub mod ipv4;

/// `TCP` packets.
pub mod tcp;

/// `ICMPv4` packets.
pub mod icmpv4;

/// The IP packet next layer protocol.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum IpProtocol {
    Icmp,
    Tcp,
    Other(u8),
}

impl IpProtocol {
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::Icmp => 1,
            Self::Tcp => 6,
            Self::Other(id) => id,
        }
    }
}

impl From<u8> for IpProtocol {
    fn from(id: u8) -> Self {
        match id {
            1 => Self::Icmp,
            6 => Self::Tcp,
            p => Self::Other(p),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(IpProtocol::Icmp, 1; "icmp")]
    #[test_case(IpProtocol::Tcp, 6; "tcp")]
    #[test_case(IpProtocol::Other(17), 17; "udp is other")]
    #[test_case(IpProtocol::Other(255), 255; "reserved")]
    fn test_ip_protocol(protocol: IpProtocol, id: u8) {
        assert_eq!(id, protocol.id());
        assert_eq!(protocol, IpProtocol::from(id));
    }
}
