use crate::codec;
use flowtrace_packet::ipv4::Ipv4Packet;
use flowtrace_packet::tcp::TcpPacket;
use std::fmt::{Display, Formatter};
use std::net::Ipv4Addr;

/// A directional pair of IPv4 endpoints.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct AddrPair {
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
}

impl AddrPair {
    /// The all-zero pair, used when no network header could be recovered.
    pub const UNSPECIFIED: Self = Self {
        src: Ipv4Addr::UNSPECIFIED,
        dst: Ipv4Addr::UNSPECIFIED,
    };
}

/// A directional pair of TCP ports.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
pub struct PortPair {
    pub src: u16,
    pub dst: u16,
}

/// Identifies one direction of a TCP connection.
///
/// Two keys compare equal iff both the address pair and the port pair match
/// component-wise.  Keys are immutable and only ever used to index the flow
/// registry.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct FlowKey {
    pub addrs: AddrPair,
    pub ports: PortPair,
}

impl FlowKey {
    /// Build the key for an outbound packet from its own headers.
    #[must_use]
    pub fn from_outbound(ipv4: &Ipv4Packet<'_>, tcp: &TcpPacket<'_>) -> Self {
        Self {
            addrs: AddrPair {
                src: ipv4.get_source(),
                dst: ipv4.get_destination(),
            },
            ports: PortPair {
                src: tcp.get_source(),
                dst: tcp.get_destination(),
            },
        }
    }

    /// Recover the key of the original packet embedded in an ICMP
    /// time-exceeded payload.
    ///
    /// Conforming routers may return as little as the original IPv4 header
    /// plus the first 64 bits of the transport header (RFC 792), which is too
    /// short to decode as a full TCP segment.  When full decoding fails the
    /// ports are read from the last 8 bytes of the payload and the addresses
    /// from whatever IPv4 header parses at its head; a payload with no
    /// parseable network header still yields a key, with zero addresses, and
    /// simply misses in the registry.  The transport protocol is assumed to
    /// be TCP and is not verified.
    #[must_use]
    pub fn from_icmp_payload(payload: &[u8]) -> Self {
        if let Ok(datagram) = codec::decode_outbound(payload) {
            return Self::from_outbound(&datagram.ipv4, &datagram.tcp);
        }
        let addrs = Ipv4Packet::new_view(payload).map_or(AddrPair::UNSPECIFIED, |ipv4| AddrPair {
            src: ipv4.get_source(),
            dst: ipv4.get_destination(),
        });
        let ports = payload
            .len()
            .checked_sub(8)
            .map_or_else(PortPair::default, |start| {
                let head = &payload[start..];
                PortPair {
                    src: u16::from_be_bytes([head[0], head[1]]),
                    dst: u16::from_be_bytes([head[2], head[3]]),
                }
            });
        Self { addrs, ports }
    }
}

impl Display for FlowKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{} -> {}:{}",
            self.addrs.src, self.ports.src, self.addrs.dst, self.ports.dst
        )
    }
}
