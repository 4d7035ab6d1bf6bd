use crate::error::{Error, Result};
use crate::validation;

use pnet::util::MacAddr;
use pnet_packet::ethernet::{EtherType, EtherTypes};
use pnet_packet::ip::{IpNextHeaderProtocol, IpNextHeaderProtocols};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Largest frame payload (MTU) for the supported internet protocols
const MAX_FRAME: usize = 1500;

/// An internet (layer 3) protocol
#[allow(clippy::upper_case_acronyms)]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InternetProtocol {
    #[serde(alias = "ipv4", alias = "IPV4")]
    IPv4,
    #[serde(alias = "ipv6", alias = "IPV6")]
    IPv6,
}

impl InternetProtocol {
    /// Candidates for a random draw, in draw order
    pub const ALL: [InternetProtocol; 2] = [InternetProtocol::IPv4, InternetProtocol::IPv6];

    pub fn get_ethertype(&self) -> EtherType {
        match self {
            InternetProtocol::IPv4 => EtherTypes::Ipv4,
            InternetProtocol::IPv6 => EtherTypes::Ipv6,
        }
    }

    pub fn get_max_frame(&self) -> usize {
        MAX_FRAME
    }

    pub fn get_header_length(&self) -> usize {
        match self {
            InternetProtocol::IPv4 => 20,
            InternetProtocol::IPv6 => 40,
        }
    }

    /// Largest payload that fits in a single frame with this internet protocol and that
    /// transport protocol
    pub fn get_max_payload(&self, transport: TransportProtocol) -> usize {
        self.get_max_frame() - self.get_header_length() - transport.get_header_length()
    }
}

impl Display for InternetProtocol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            InternetProtocol::IPv4 => write!(f, "IPv4"),
            InternetProtocol::IPv6 => write!(f, "IPv6"),
        }
    }
}

impl FromStr for InternetProtocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ipv4" => Ok(InternetProtocol::IPv4),
            "ipv6" => Ok(InternetProtocol::IPv6),
            _ => Err(Error::InvalidProtocol(s.to_string())),
        }
    }
}

/// A transport (layer 4) protocol
#[allow(clippy::upper_case_acronyms)]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportProtocol {
    #[serde(alias = "tcp")]
    TCP,
    #[serde(alias = "udp")]
    UDP,
}

impl TransportProtocol {
    /// Candidates for a random draw, in draw order
    pub const ALL: [TransportProtocol; 2] = [TransportProtocol::TCP, TransportProtocol::UDP];

    pub fn get_header_length(&self) -> usize {
        match self {
            TransportProtocol::TCP => 20,
            TransportProtocol::UDP => 8,
        }
    }

    pub fn get_protocol_number(&self) -> IpNextHeaderProtocol {
        match self {
            TransportProtocol::TCP => IpNextHeaderProtocols::Tcp,
            TransportProtocol::UDP => IpNextHeaderProtocols::Udp,
        }
    }
}

impl Display for TransportProtocol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportProtocol::TCP => write!(f, "TCP"),
            TransportProtocol::UDP => write!(f, "UDP"),
        }
    }
}

impl FromStr for TransportProtocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "tcp" => Ok(TransportProtocol::TCP),
            "udp" => Ok(TransportProtocol::UDP),
            _ => Err(Error::InvalidProtocol(s.to_string())),
        }
    }
}

/// How the packet is addressed
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Cast {
    Broadcast,
    Multicast,
    Unicast,
}

impl Cast {
    /// Candidates for a random draw, in draw order
    pub const ALL: [Cast; 3] = [Cast::Broadcast, Cast::Multicast, Cast::Unicast];
}

impl Display for Cast {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Cast::Broadcast => write!(f, "broadcast"),
            Cast::Multicast => write!(f, "multicast"),
            Cast::Unicast => write!(f, "unicast"),
        }
    }
}

impl FromStr for Cast {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "broadcast" => Ok(Cast::Broadcast),
            "multicast" => Ok(Cast::Multicast),
            "unicast" => Ok(Cast::Unicast),
            _ => Err(Error::InvalidCast(s.to_string())),
        }
    }
}

/// Why a value was rejected at the boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationKind {
    TooShort,
    TooLong,
    WrongFormat,
    WrongValue,
}

impl Display for ValidationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationKind::TooShort => write!(f, "too short"),
            ValidationKind::TooLong => write!(f, "too long"),
            ValidationKind::WrongFormat => write!(f, "wrong format"),
            ValidationKind::WrongValue => write!(f, "wrong value"),
        }
    }
}

/// The fields of a host, used to report which one is missing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointField {
    Ip,
    Mac,
    Port,
}

impl Display for EndpointField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            EndpointField::Ip => write!(f, "IP address"),
            EndpointField::Mac => write!(f, "MAC address"),
            EndpointField::Port => write!(f, "port"),
        }
    }
}

/// One octet of an IP pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Octet {
    Literal(u8),
    Wildcard,
}

/// A dotted-quad IPv4 address where any octet may be a wildcard ("*") to be drawn
/// independently, e.g. "192.168.1.*"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpPattern {
    pub octets: [Octet; 4],
}

impl IpPattern {
    /// The pattern "*.*.*.*"
    pub const ANY: IpPattern = IpPattern {
        octets: [Octet::Wildcard; 4],
    };

    /// The address itself if the pattern has no wildcard
    pub fn as_exact(&self) -> Option<Ipv4Addr> {
        let mut bytes = [0u8; 4];
        for (b, o) in bytes.iter_mut().zip(self.octets.iter()) {
            match o {
                Octet::Literal(v) => *b = *v,
                Octet::Wildcard => return None,
            }
        }
        Some(Ipv4Addr::from(bytes))
    }
}

impl From<Ipv4Addr> for IpPattern {
    fn from(ip: Ipv4Addr) -> Self {
        IpPattern {
            octets: ip.octets().map(Octet::Literal),
        }
    }
}

impl FromStr for IpPattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        validation::parse_ip_pattern(s)
    }
}

impl Display for IpPattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let octets: Vec<String> = self
            .octets
            .iter()
            .map(|o| match o {
                Octet::Literal(v) => v.to_string(),
                Octet::Wildcard => "*".to_string(),
            })
            .collect();
        write!(f, "{}", octets.join("."))
    }
}

/// The MAC address of a host template: either an address or the "self" sentinel
/// asking the interface resolver for the actual address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacSpec {
    Address(MacAddr),
    Local,
}

impl FromStr for MacSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("self") {
            Ok(MacSpec::Local)
        } else {
            validation::parse_mac(s).map(MacSpec::Address)
        }
    }
}

impl Display for MacSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MacSpec::Address(mac) => write!(f, "{}", format_mac(mac)),
            MacSpec::Local => write!(f, "self"),
        }
    }
}

/// Upper-case, zero-padded, colon-separated form of a MAC address
pub fn format_mac(mac: &MacAddr) -> String {
    [mac.0, mac.1, mac.2, mac.3, mac.4, mac.5]
        .iter()
        .map(|o| format!("{o:02X}"))
        .collect::<Vec<String>>()
        .join(":")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_ceilings() {
        assert_eq!(
            InternetProtocol::IPv4.get_max_payload(TransportProtocol::UDP),
            1472
        );
        assert_eq!(
            InternetProtocol::IPv4.get_max_payload(TransportProtocol::TCP),
            1460
        );
        assert_eq!(
            InternetProtocol::IPv6.get_max_payload(TransportProtocol::UDP),
            1452
        );
        assert_eq!(
            InternetProtocol::IPv6.get_max_payload(TransportProtocol::TCP),
            1440
        );
    }

    #[test]
    fn test_protocol_names() {
        assert_eq!(
            "IPv6".parse::<InternetProtocol>().unwrap(),
            InternetProtocol::IPv6
        );
        assert_eq!(
            "udp".parse::<TransportProtocol>().unwrap(),
            TransportProtocol::UDP
        );
        assert_eq!("Multicast".parse::<Cast>().unwrap(), Cast::Multicast);
        assert!(matches!(
            "jumbo".parse::<InternetProtocol>(),
            Err(Error::InvalidProtocol(_))
        ));
        assert!(matches!("anycast".parse::<Cast>(), Err(Error::InvalidCast(_))));
    }

    #[test]
    fn test_ip_pattern_exact() {
        let p: IpPattern = "10.0.0.1".parse().unwrap();
        assert_eq!(p.as_exact(), Some(Ipv4Addr::new(10, 0, 0, 1)));
        let p: IpPattern = "10.0.*.1".parse().unwrap();
        assert_eq!(p.as_exact(), None);
        assert_eq!(p.to_string(), "10.0.*.1");
        assert_eq!(IpPattern::ANY.to_string(), "*.*.*.*");
    }

    #[test]
    fn test_mac_formatting() {
        let mac = MacAddr::new(0, 6, 0xf0, 0x39, 0xc9, 0x48);
        assert_eq!(format_mac(&mac), "00:06:F0:39:C9:48");
        assert_eq!("SELF".parse::<MacSpec>().unwrap(), MacSpec::Local);
        assert_eq!(
            "00:06:f0:39:c9:48".parse::<MacSpec>().unwrap(),
            MacSpec::Address(mac)
        );
    }
}
