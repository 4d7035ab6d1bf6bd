use crate::ip::AddressPair;

use pnet_packet::udp::{self, MutableUdpPacket};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpLayer {
    pub source_port: u16,
    pub destination_port: u16,
}

/// Writes a datagram holding the payload into the buffer, then computes its checksum.
/// The buffer must be exactly the size of the header and the payload.
pub fn write_udp(
    buffer: &mut [u8],
    layer: &UdpLayer,
    payload: &[u8],
    addresses: &AddressPair,
) -> Option<()> {
    if buffer.len() != MutableUdpPacket::minimum_packet_size() + payload.len() {
        return None;
    }
    let len = u16::try_from(buffer.len()).ok()?;
    let mut udp_packet = MutableUdpPacket::new(buffer)?;

    udp_packet.set_source(layer.source_port);
    udp_packet.set_destination(layer.destination_port);
    udp_packet.set_length(len);
    udp_packet.set_payload(payload);

    let checksum = match addresses {
        AddressPair::V4 {
            source,
            destination,
        } => udp::ipv4_checksum(&udp_packet.to_immutable(), source, destination),
        AddressPair::V6 {
            source,
            destination,
        } => udp::ipv6_checksum(&udp_packet.to_immutable(), source, destination),
    };
    udp_packet.set_checksum(checksum);
    Some(())
}
