use crate::details::ResolvedDescriptor;
use crate::error::{Error, Result};
use crate::generator::Generator;
use crate::hosts::{Endpoint, Host};
use crate::ip::{self, AddressPair, IpHeaderFields, Ipv4Layer, Ipv6Layer};
use crate::structs::{InternetProtocol, TransportProtocol};
use crate::tcp::{self, TcpLayer};
use crate::udp::{self, UdpLayer};

use pnet::util::MacAddr;
use pnet_packet::ethernet::{EtherType, EtherTypes, MutableEthernetPacket};
use pnet_packet::vlan::MutableVlanPacket;
use std::fmt::{Display, Formatter};

const VLAN_ID: u16 = 1;

/// Construction progress of a packet. Each step requires the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BuildStage {
    Empty,
    LinkBuilt,
    InternetBuilt,
    TransportBuilt,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EthernetLayer {
    pub source: MacAddr,
    pub destination: MacAddr,
    pub ethertype: EtherType,
}

/// 802.1Q tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VlanLayer {
    pub id: u16,
    pub ethertype: EtherType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layer {
    Ethernet(EthernetLayer),
    Vlan(VlanLayer),
    Ipv4(Ipv4Layer),
    Ipv6(Ipv6Layer),
    Tcp(TcpLayer),
    Udp(UdpLayer),
    Payload(Vec<u8>),
}

impl Layer {
    pub fn name(&self) -> &'static str {
        match self {
            Layer::Ethernet(_) => "Ethernet",
            Layer::Vlan(_) => "802.1Q",
            Layer::Ipv4(_) => "IPv4",
            Layer::Ipv6(_) => "IPv6",
            Layer::Tcp(_) => "TCP",
            Layer::Udp(_) => "UDP",
            Layer::Payload(_) => "Payload",
        }
    }

    /// Size of the layer on the wire
    pub fn len(&self) -> usize {
        match self {
            Layer::Ethernet(_) => MutableEthernetPacket::minimum_packet_size(),
            Layer::Vlan(_) => MutableVlanPacket::minimum_packet_size(),
            Layer::Ipv4(_) => InternetProtocol::IPv4.get_header_length(),
            Layer::Ipv6(_) => InternetProtocol::IPv6.get_header_length(),
            Layer::Tcp(_) => TransportProtocol::TCP.get_header_length(),
            Layer::Udp(_) => TransportProtocol::UDP.get_header_length(),
            Layer::Payload(p) => p.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A packet built layer by layer from two endpoints and a descriptor
#[derive(Debug, Clone)]
pub struct Packet {
    target: Endpoint,
    source: Endpoint,
    descriptor: ResolvedDescriptor,
    layers: Vec<Layer>,
    stage: BuildStage,
}

impl Packet {
    /// Create an empty packet. Both hosts must be fully resolved and the descriptor must carry
    /// exactly the fields its protocols require.
    pub fn new(target: &Host, source: &Host, descriptor: ResolvedDescriptor) -> Result<Self> {
        let target = target.to_endpoint("target")?;
        let source = source.to_endpoint("source")?;
        descriptor.validate()?;
        Ok(Packet {
            target,
            source,
            descriptor,
            layers: Vec::with_capacity(5),
            stage: BuildStage::Empty,
        })
    }

    /// Create a packet and run every construction step
    pub fn build(
        target: &Host,
        source: &Host,
        descriptor: ResolvedDescriptor,
        generator: &mut Generator,
    ) -> Result<Self> {
        let mut packet = Packet::new(target, source, descriptor)?;
        packet.add_all_layers(generator)?;
        Ok(packet)
    }

    fn advance(&mut self, from: BuildStage, to: BuildStage, layer: &str) -> Result<()> {
        if self.stage != from {
            return Err(Error::IncompletePacket(format!(
                "cannot add the {layer} layer to a packet at stage {:?} (expected {from:?})",
                self.stage
            )));
        }
        self.stage = to;
        Ok(())
    }

    /// Ethernet header, followed by a VLAN tag if requested
    pub fn add_link_layer(&mut self) -> Result<()> {
        self.advance(BuildStage::Empty, BuildStage::LinkBuilt, "link")?;
        let ip_ethertype = self.descriptor.internet_protocol.get_ethertype();
        self.layers.push(Layer::Ethernet(EthernetLayer {
            source: self.source.mac,
            destination: self.target.mac,
            ethertype: if self.descriptor.vlan {
                EtherTypes::Vlan
            } else {
                ip_ethertype
            },
        }));
        if self.descriptor.vlan {
            self.layers.push(Layer::Vlan(VlanLayer {
                id: VLAN_ID,
                ethertype: ip_ethertype,
            }));
        }
        Ok(())
    }

    /// IP header, with the randomized header fields of the descriptor if any
    pub fn add_internet_layer(&mut self) -> Result<()> {
        self.advance(BuildStage::LinkBuilt, BuildStage::InternetBuilt, "internet")?;
        let protocol = self.descriptor.transport_protocol;
        let layer = match self.descriptor.internet_protocol {
            InternetProtocol::IPv4 => Layer::Ipv4(Ipv4Layer {
                source: self.source.ip,
                destination: self.target.ip,
                protocol,
                fields: match self.descriptor.ip_header_fields {
                    Some(IpHeaderFields::Ipv4(fields)) => fields,
                    _ => Default::default(),
                },
            }),
            InternetProtocol::IPv6 => Layer::Ipv6(Ipv6Layer {
                source: self.source.ip.to_ipv6_mapped(),
                destination: self.target.ip.to_ipv6_mapped(),
                protocol,
                fields: match self.descriptor.ip_header_fields {
                    Some(IpHeaderFields::Ipv6(fields)) => fields,
                    _ => Default::default(),
                },
            }),
        };
        self.layers.push(layer);
        Ok(())
    }

    /// TCP or UDP header, with the randomized TCP header fields of the descriptor if any
    pub fn add_transport_layer(&mut self) -> Result<()> {
        self.advance(
            BuildStage::InternetBuilt,
            BuildStage::TransportBuilt,
            "transport",
        )?;
        let source_port = self.source.port;
        let destination_port = self.target.port;
        let layer = match self.descriptor.transport_protocol {
            TransportProtocol::TCP => Layer::Tcp(TcpLayer {
                source_port,
                destination_port,
                fields: self.descriptor.tcp_header_fields.unwrap_or_default(),
            }),
            TransportProtocol::UDP => Layer::Udp(UdpLayer {
                source_port,
                destination_port,
            }),
        };
        self.layers.push(layer);
        Ok(())
    }

    /// Random payload of the descriptor length
    pub fn add_payload_layer(&mut self, generator: &mut Generator) -> Result<()> {
        self.advance(
            BuildStage::TransportBuilt,
            BuildStage::Complete,
            "payload",
        )?;
        let mut payload = vec![0u8; self.descriptor.payload_length];
        generator.fill_bytes(&mut payload);
        self.layers.push(Layer::Payload(payload));
        Ok(())
    }

    pub fn add_all_layers(&mut self, generator: &mut Generator) -> Result<()> {
        self.add_link_layer()?;
        self.add_internet_layer()?;
        self.add_transport_layer()?;
        self.add_payload_layer(generator)
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn stage(&self) -> BuildStage {
        self.stage
    }

    pub fn is_complete(&self) -> bool {
        self.stage == BuildStage::Complete
    }

    pub fn target(&self) -> &Endpoint {
        &self.target
    }

    pub fn source(&self) -> &Endpoint {
        &self.source
    }

    pub fn descriptor(&self) -> &ResolvedDescriptor {
        &self.descriptor
    }

    /// Size of the whole frame
    pub fn len(&self) -> usize {
        self.layers.iter().map(Layer::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Encode the complete packet, with its length fields and checksums
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        if !self.is_complete() {
            return Err(Error::IncompletePacket(format!(
                "cannot encode a packet at stage {:?}",
                self.stage
            )));
        }
        let mut buffer = vec![0u8; self.len()];
        let payload: &[u8] = match self.layers.last() {
            Some(Layer::Payload(p)) => p,
            _ => &[],
        };
        let addresses = match self.layers.iter().find_map(|l| match l {
            Layer::Ipv4(l) => Some(AddressPair::V4 {
                source: l.source,
                destination: l.destination,
            }),
            Layer::Ipv6(l) => Some(AddressPair::V6 {
                source: l.source,
                destination: l.destination,
            }),
            _ => None,
        }) {
            Some(a) => a,
            None => return Err(Error::Encoding("no internet layer".to_string())),
        };

        let mut offset = 0;
        for layer in self.layers.iter() {
            let slice = &mut buffer[offset..];
            let written = match layer {
                Layer::Ethernet(l) => write_ethernet(slice, l),
                Layer::Vlan(l) => write_vlan(slice, l),
                Layer::Ipv4(l) => ip::write_ipv4(slice, l),
                Layer::Ipv6(l) => ip::write_ipv6(slice, l),
                Layer::Tcp(l) => tcp::write_tcp(slice, l, payload, &addresses),
                Layer::Udp(l) => udp::write_udp(slice, l, payload, &addresses),
                Layer::Payload(_) => Some(()),
            };
            written.ok_or_else(|| {
                Error::Encoding(format!("cannot write the {} layer", layer.name()))
            })?;
            offset += layer.len();
        }
        Ok(buffer)
    }
}

/// Configures the Ethernet frame (without its payload)
fn write_ethernet(buffer: &mut [u8], layer: &EthernetLayer) -> Option<()> {
    let mut eth_packet = MutableEthernetPacket::new(buffer)?;
    eth_packet.set_ethertype(layer.ethertype);
    eth_packet.set_source(layer.source);
    eth_packet.set_destination(layer.destination);
    Some(())
}

fn write_vlan(buffer: &mut [u8], layer: &VlanLayer) -> Option<()> {
    let mut vlan_packet = MutableVlanPacket::new(buffer)?;
    vlan_packet.set_vlan_identifier(layer.id);
    vlan_packet.set_ethertype(layer.ethertype);
    Some(())
}

impl Display for Packet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let layers: Vec<&str> = self.layers.iter().map(Layer::name).collect();
        write!(
            f,
            "{} -> {} [{}] {} bytes",
            self.source,
            self.target,
            layers.join(" / "),
            self.len()
        )
    }
}
