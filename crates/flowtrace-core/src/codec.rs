use crate::error::{TraceError, TraceResult};
use crate::types::TimeToLive;
use flowtrace_packet::checksum::{ipv4_header_checksum, tcp_ipv4_checksum};
use flowtrace_packet::ethernet::{EthernetFrame, ETHERTYPE_IPV4};
use flowtrace_packet::icmpv4::{IcmpCode, IcmpPacket, IcmpType};
use flowtrace_packet::ipv4::Ipv4Packet;
use flowtrace_packet::tcp::TcpPacket;
use flowtrace_packet::IpProtocol;
use std::net::Ipv4Addr;

/// A diverted outbound packet decoded into its IPv4 and TCP layers.
///
/// Both views borrow from the original packet bytes; nothing is copied.
#[derive(Debug)]
pub struct TcpDatagram<'a> {
    pub ipv4: Ipv4Packet<'a>,
    pub tcp: TcpPacket<'a>,
}

/// An ICMP message lifted out of a captured frame.
#[derive(Debug)]
pub struct IcmpObservation<'a> {
    /// The address of the device which sent the ICMP message.
    pub responder: Ipv4Addr,
    pub icmp_type: IcmpType,
    pub icmp_code: IcmpCode,
    /// The embedded original datagram (RFC 792).
    pub payload: &'a [u8],
}

/// Decode a raw IPv4/TCP packet as delivered by the packet divertor.
///
/// Packets which are not IPv4 or do not carry TCP fail with [`TraceError::NotIpv4`]
/// or [`TraceError::NotTcp`]; the caller releases those unmodified.
pub fn decode_outbound(packet: &[u8]) -> TraceResult<TcpDatagram<'_>> {
    let ipv4 = Ipv4Packet::new_view(packet)?;
    if ipv4.get_version() != 4 {
        return Err(TraceError::NotIpv4);
    }
    if ipv4.get_protocol() != IpProtocol::Tcp {
        return Err(TraceError::NotTcp);
    }
    let tcp = TcpPacket::new_view(packet.get(ipv4.header_size()..).unwrap_or_default())?;
    Ok(TcpDatagram { ipv4, tcp })
}

/// Decode a captured Ethernet frame down to its ICMPv4 message.
pub fn decode_icmp_frame(frame: &[u8]) -> TraceResult<IcmpObservation<'_>> {
    let ethernet = EthernetFrame::new_view(frame)?;
    if ethernet.get_ethertype() != ETHERTYPE_IPV4 {
        return Err(TraceError::NotIpv4);
    }
    let packet = &frame[EthernetFrame::minimum_frame_size()..];
    let ipv4 = Ipv4Packet::new_view(packet)?;
    if ipv4.get_version() != 4 {
        return Err(TraceError::NotIpv4);
    }
    if ipv4.get_protocol() != IpProtocol::Icmp {
        return Err(TraceError::NotIcmp);
    }
    let message = packet.get(ipv4.header_size()..).unwrap_or_default();
    let icmp = IcmpPacket::new_view(message)?;
    Ok(IcmpObservation {
        responder: ipv4.get_source(),
        icmp_type: icmp.get_icmp_type(),
        icmp_code: icmp.get_icmp_code(),
        payload: &message[IcmpPacket::minimum_packet_size()..],
    })
}

/// Rebuild an IPv4/TCP packet with the given time-to-live.
///
/// The IPv4 total length, IPv4 header checksum and TCP checksum are all
/// recomputed; the TCP checksum uses the pseudo-header of the mutated IPv4
/// header so downstream stacks accept the packet.  The TCP payload is
/// preserved bit-exact.
pub fn serialize_with_ttl(packet: &[u8], ttl: TimeToLive) -> TraceResult<Vec<u8>> {
    decode_outbound(packet).map_err(|_| TraceError::SerializeFailed)?;
    let total_length = u16::try_from(packet.len()).map_err(|_| TraceError::SerializeFailed)?;
    let mut bytes = packet.to_vec();
    let (header_size, src_addr, dest_addr) = {
        let mut ipv4 = Ipv4Packet::new(&mut bytes).map_err(|_| TraceError::SerializeFailed)?;
        ipv4.set_ttl(ttl.0);
        ipv4.set_total_length(total_length);
        (ipv4.header_size(), ipv4.get_source(), ipv4.get_destination())
    };
    if header_size > bytes.len() {
        return Err(TraceError::SerializeFailed);
    }
    let header_checksum = ipv4_header_checksum(&bytes[..header_size]);
    Ipv4Packet::new(&mut bytes)
        .map_err(|_| TraceError::SerializeFailed)?
        .set_checksum(header_checksum);
    let segment_checksum = tcp_ipv4_checksum(&bytes[header_size..], src_addr, dest_addr);
    TcpPacket::new(&mut bytes[header_size..])
        .map_err(|_| TraceError::SerializeFailed)?
        .set_checksum(segment_checksum);
    Ok(bytes)
}
