use crate::generator::Generator;
use crate::ip::AddressPair;

use pnet_packet::tcp::{self, MutableTcpPacket, TcpFlags};
use serde::Serialize;

/// Randomized TCP header values
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpHeaderFields {
    pub seq: u32,
    pub ack: u32,
    pub window: u16,
    pub urgent_ptr: u16,
}

impl Default for TcpHeaderFields {
    fn default() -> Self {
        TcpHeaderFields {
            seq: 0,
            ack: 0,
            window: 8192,
            urgent_ptr: 0,
        }
    }
}

impl TcpHeaderFields {
    pub fn random(generator: &mut Generator) -> Self {
        TcpHeaderFields {
            seq: generator.bit_width(32) as u32,
            ack: generator.bit_width(32) as u32,
            window: generator.bit_width(16) as u16,
            urgent_ptr: generator.bit_width(16) as u16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpLayer {
    pub source_port: u16,
    pub destination_port: u16,
    pub fields: TcpHeaderFields,
}

/// Writes a SYN segment holding the payload into the buffer, then computes its checksum.
/// The buffer must be exactly the size of the header and the payload.
pub fn write_tcp(
    buffer: &mut [u8],
    layer: &TcpLayer,
    payload: &[u8],
    addresses: &AddressPair,
) -> Option<()> {
    if buffer.len() != MutableTcpPacket::minimum_packet_size() + payload.len() {
        return None;
    }
    let mut tcp_packet = MutableTcpPacket::new(buffer)?;

    tcp_packet.set_source(layer.source_port);
    tcp_packet.set_destination(layer.destination_port);
    tcp_packet.set_data_offset(5);
    tcp_packet.set_flags(TcpFlags::SYN);

    let fields = &layer.fields;
    tcp_packet.set_sequence(fields.seq);
    tcp_packet.set_acknowledgement(fields.ack);
    tcp_packet.set_window(fields.window);
    tcp_packet.set_urgent_ptr(fields.urgent_ptr);
    tcp_packet.set_payload(payload);

    let checksum = match addresses {
        AddressPair::V4 {
            source,
            destination,
        } => tcp::ipv4_checksum(&tcp_packet.to_immutable(), source, destination),
        AddressPair::V6 {
            source,
            destination,
        } => tcp::ipv6_checksum(&tcp_packet.to_immutable(), source, destination),
    };
    tcp_packet.set_checksum(checksum);
    Some(())
}
