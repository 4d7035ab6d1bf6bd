use crate::generator::Generator;
use crate::structs::TransportProtocol;

use pnet_packet::ipv4::{self, MutableIpv4Packet};
use pnet_packet::ipv6::MutableIpv6Packet;
use serde::Serialize;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Randomized IPv4 header values
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4HeaderFields {
    pub ttl: u8,
    /// The whole type of service byte (DSCP and ECN)
    pub dscp: u8,
    pub flags: u8,
    pub frag_offset: u16,
    pub id: u16,
}

impl Default for Ipv4HeaderFields {
    fn default() -> Self {
        Ipv4HeaderFields {
            ttl: 64,
            dscp: 0,
            flags: 0,
            frag_offset: 0,
            id: 1,
        }
    }
}

impl Ipv4HeaderFields {
    pub fn random(generator: &mut Generator) -> Self {
        Ipv4HeaderFields {
            ttl: generator.bit_width(8) as u8,
            dscp: generator.bit_width(8) as u8,
            flags: generator.bit_width(3) as u8,
            frag_offset: generator.bit_width(13) as u16,
            id: generator.bit_width(16) as u16,
        }
    }
}

/// Randomized IPv6 header values
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv6HeaderFields {
    pub traffic_class: u8,
    pub flow_label: u32,
    pub hop_limit: u8,
}

impl Default for Ipv6HeaderFields {
    fn default() -> Self {
        Ipv6HeaderFields {
            traffic_class: 0,
            flow_label: 0,
            hop_limit: 64,
        }
    }
}

impl Ipv6HeaderFields {
    pub fn random(generator: &mut Generator) -> Self {
        Ipv6HeaderFields {
            traffic_class: generator.bit_width(8) as u8,
            flow_label: generator.bit_width(20) as u32,
            hop_limit: generator.bit_width(8) as u8,
        }
    }
}

/// The randomized internet header of a descriptor, matching its internet protocol
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IpHeaderFields {
    Ipv4(Ipv4HeaderFields),
    Ipv6(Ipv6HeaderFields),
}

/// Source and destination addresses, also used for the transport pseudo-header checksums
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressPair {
    V4 {
        source: Ipv4Addr,
        destination: Ipv4Addr,
    },
    V6 {
        source: Ipv6Addr,
        destination: Ipv6Addr,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Layer {
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
    pub protocol: TransportProtocol,
    pub fields: Ipv4HeaderFields,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv6Layer {
    pub source: Ipv6Addr,
    pub destination: Ipv6Addr,
    pub protocol: TransportProtocol,
    pub fields: Ipv6HeaderFields,
}

/// Writes the IPv4 header at the start of the buffer, which holds the whole IPv4 packet.
/// The checksum only covers the header, so the payload may be written before or after.
pub fn write_ipv4(buffer: &mut [u8], layer: &Ipv4Layer) -> Option<()> {
    let len = u16::try_from(buffer.len()).ok()?;
    let mut ipv4_packet = MutableIpv4Packet::new(buffer)?;

    ipv4_packet.set_version(4);
    ipv4_packet.set_header_length(5);
    ipv4_packet.set_total_length(len);
    ipv4_packet.set_next_level_protocol(layer.protocol.get_protocol_number());
    ipv4_packet.set_source(layer.source);
    ipv4_packet.set_destination(layer.destination);

    let fields = &layer.fields;
    ipv4_packet.set_ttl(fields.ttl);
    ipv4_packet.set_dscp(fields.dscp >> 2);
    ipv4_packet.set_ecn(fields.dscp & 0b11);
    ipv4_packet.set_flags(fields.flags & 0b111);
    ipv4_packet.set_fragment_offset(fields.frag_offset & 0x1fff);
    ipv4_packet.set_identification(fields.id);

    ipv4_packet.set_checksum(ipv4::checksum(&ipv4_packet.to_immutable()));
    Some(())
}

/// Writes the IPv6 header at the start of the buffer, which holds the whole IPv6 packet
pub fn write_ipv6(buffer: &mut [u8], layer: &Ipv6Layer) -> Option<()> {
    let payload_len =
        u16::try_from(buffer.len().checked_sub(MutableIpv6Packet::minimum_packet_size())?).ok()?;
    let mut ipv6_packet = MutableIpv6Packet::new(buffer)?;

    ipv6_packet.set_version(6);
    ipv6_packet.set_payload_length(payload_len);
    ipv6_packet.set_next_header(layer.protocol.get_protocol_number());
    ipv6_packet.set_source(layer.source);
    ipv6_packet.set_destination(layer.destination);

    let fields = &layer.fields;
    ipv6_packet.set_traffic_class(fields.traffic_class);
    ipv6_packet.set_flow_label(fields.flow_label & 0xfffff);
    ipv6_packet.set_hop_limit(fields.hop_limit);
    Some(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pnet_packet::ip::IpNextHeaderProtocols;
    use pnet_packet::ipv4::Ipv4Packet;
    use pnet_packet::ipv6::Ipv6Packet;

    #[test]
    fn test_random_fields_draw_order() {
        let mut g = Generator::new(Some(111)).unwrap();
        let fields = Ipv4HeaderFields::random(&mut g);
        assert_eq!(fields.ttl, 108);
        assert_eq!(fields.dscp, 161);

        let mut g = Generator::new(Some(111)).unwrap();
        let fields = Ipv6HeaderFields::random(&mut g);
        assert_eq!(fields.traffic_class, 108);
        assert!(fields.flow_label < (1 << 20));
    }

    #[test]
    fn test_write_ipv4() {
        let mut buffer = vec![0u8; 48];
        let layer = Ipv4Layer {
            source: Ipv4Addr::new(10, 0, 0, 1),
            destination: Ipv4Addr::new(10, 0, 0, 2),
            protocol: TransportProtocol::UDP,
            fields: Ipv4HeaderFields {
                dscp: 0b1010_1011,
                ..Default::default()
            },
        };
        write_ipv4(&mut buffer, &layer).unwrap();
        let packet = Ipv4Packet::new(&buffer).unwrap();
        assert_eq!(packet.get_version(), 4);
        assert_eq!(packet.get_total_length(), 48);
        assert_eq!(packet.get_ttl(), 64);
        assert_eq!(packet.get_identification(), 1);
        assert_eq!(packet.get_dscp(), 0b10_1010);
        assert_eq!(packet.get_ecn(), 0b11);
        assert_eq!(
            packet.get_next_level_protocol(),
            IpNextHeaderProtocols::Udp
        );
        assert_eq!(packet.get_checksum(), ipv4::checksum(&packet));
    }

    #[test]
    fn test_write_ipv6() {
        let mut buffer = vec![0u8; 60];
        let layer = Ipv6Layer {
            source: Ipv4Addr::new(10, 0, 0, 1).to_ipv6_mapped(),
            destination: Ipv4Addr::new(10, 0, 0, 2).to_ipv6_mapped(),
            protocol: TransportProtocol::TCP,
            fields: Ipv6HeaderFields::default(),
        };
        write_ipv6(&mut buffer, &layer).unwrap();
        let packet = Ipv6Packet::new(&buffer).unwrap();
        assert_eq!(packet.get_version(), 6);
        assert_eq!(packet.get_payload_length(), 20);
        assert_eq!(packet.get_hop_limit(), 64);
        assert_eq!(packet.get_next_header(), IpNextHeaderProtocols::Tcp);
        assert!(write_ipv6(&mut [0u8; 10], &layer).is_none());
    }
}
