use crate::error::{Error, Result};
use crate::generator::Generator;
use crate::ip::{IpHeaderFields, Ipv4HeaderFields, Ipv6HeaderFields};
use crate::structs::{Cast, InternetProtocol, TransportProtocol};
use crate::tcp::TcpHeaderFields;

use serde::Serialize;
use std::fmt::{Display, Formatter};

/// The user constraints on the generated packets. Unset fields are drawn for each packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacketTemplate {
    pub internet_protocol: Option<InternetProtocol>,
    pub transport_protocol: Option<TransportProtocol>,
    pub cast: Option<Cast>,
    pub vlan: bool,
    pub randomize_headers: bool,
    pub min_length: usize,
    /// Defaults to the largest payload of the chosen protocols
    pub max_length: Option<usize>,
}

/// Everything needed to build one packet
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDescriptor {
    pub internet_protocol: InternetProtocol,
    pub transport_protocol: TransportProtocol,
    pub cast: Cast,
    pub vlan: bool,
    pub randomize_headers: bool,
    pub payload_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_header_fields: Option<IpHeaderFields>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tcp_header_fields: Option<TcpHeaderFields>,
}

pub const INTERNET_PROTOCOL: &str = "internet_protocol";
pub const TRANSPORT_PROTOCOL: &str = "transport_protocol";
pub const CAST: &str = "cast";
pub const VLAN: &str = "vlan";
pub const RANDOMIZE_HEADERS: &str = "randomize_headers";
pub const PAYLOAD_LENGTH: &str = "payload_length";
pub const IPV4_HEADER_FIELDS: &str = "ip_header_fields.ipv4";
pub const IPV6_HEADER_FIELDS: &str = "ip_header_fields.ipv6";
pub const TCP_HEADER_FIELDS: &str = "tcp_header_fields";

const BASE_FIELDS: [&str; 6] = [
    INTERNET_PROTOCOL,
    TRANSPORT_PROTOCOL,
    CAST,
    VLAN,
    RANDOMIZE_HEADERS,
    PAYLOAD_LENGTH,
];

impl PacketTemplate {
    /// Smallest payload ceiling among the protocols the template can draw
    pub fn min_ceiling(&self) -> usize {
        let ips: &[InternetProtocol] = match &self.internet_protocol {
            Some(ip) => std::slice::from_ref(ip),
            None => &InternetProtocol::ALL,
        };
        let transports: &[TransportProtocol] = match &self.transport_protocol {
            Some(tp) => std::slice::from_ref(tp),
            None => &TransportProtocol::ALL,
        };
        ips.iter()
            .flat_map(|ip| transports.iter().map(|tp| ip.get_max_payload(*tp)))
            .min()
            .unwrap_or(0)
    }

    /// Check that the length bounds are ordered. Without a maximum, the minimum must fit under
    /// the ceiling of every protocol pair the template can draw.
    pub fn validate(&self) -> Result<()> {
        let max = self.max_length.unwrap_or_else(|| self.min_ceiling());
        if self.min_length > max {
            return Err(Error::InvalidLengthRange {
                min: self.min_length,
                max,
            });
        }
        Ok(())
    }

    /// Draw a descriptor from the template.
    ///
    /// The protocols and the cast are always drawn, even when the template fixes them, so that
    /// the rest of the stream does not depend on which fields are fixed. The fixed values then
    /// replace the drawn ones before the payload ceiling is computed.
    pub fn resolve(&self, generator: &mut Generator) -> Result<ResolvedDescriptor> {
        self.validate()?;
        let drawn_ip = *generator.choose(&InternetProtocol::ALL)?;
        let drawn_transport = *generator.choose(&TransportProtocol::ALL)?;
        let drawn_cast = *generator.choose(&Cast::ALL)?;
        let internet_protocol = self.internet_protocol.unwrap_or(drawn_ip);
        let transport_protocol = self.transport_protocol.unwrap_or(drawn_transport);
        let cast = self.cast.unwrap_or(drawn_cast);

        let max_length = self
            .max_length
            .unwrap_or_else(|| internet_protocol.get_max_payload(transport_protocol));
        if self.min_length > max_length {
            return Err(Error::InvalidLengthRange {
                min: self.min_length,
                max: max_length,
            });
        }
        let payload_length = generator.uniform_int(self.min_length as i64, max_length as i64)?;

        let (ip_header_fields, tcp_header_fields) = if self.randomize_headers {
            let ip = match internet_protocol {
                InternetProtocol::IPv6 => IpHeaderFields::Ipv6(Ipv6HeaderFields::random(generator)),
                InternetProtocol::IPv4 => IpHeaderFields::Ipv4(Ipv4HeaderFields::random(generator)),
            };
            let tcp = match transport_protocol {
                TransportProtocol::TCP => Some(TcpHeaderFields::random(generator)),
                TransportProtocol::UDP => None,
            };
            (Some(ip), tcp)
        } else {
            (None, None)
        };

        Ok(ResolvedDescriptor {
            internet_protocol,
            transport_protocol,
            cast,
            vlan: self.vlan,
            randomize_headers: self.randomize_headers,
            payload_length: payload_length as usize,
            ip_header_fields,
            tcp_header_fields,
        })
    }
}

impl Display for PacketTemplate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let unset = || "*".to_string();
        write!(
            f,
            "{}/{} {}, VLAN: {}, random headers: {}, length: {}-{}",
            self.internet_protocol
                .map(|p| p.to_string())
                .unwrap_or_else(unset),
            self.transport_protocol
                .map(|p| p.to_string())
                .unwrap_or_else(unset),
            self.cast.map(|c| c.to_string()).unwrap_or_else(unset),
            self.vlan,
            self.randomize_headers,
            self.min_length,
            self.max_length
                .map(|l| l.to_string())
                .unwrap_or_else(|| "max".to_string()),
        )
    }
}

impl ResolvedDescriptor {
    /// Names of the fields this descriptor carries
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names = BASE_FIELDS.to_vec();
        match self.ip_header_fields {
            Some(IpHeaderFields::Ipv4(_)) => names.push(IPV4_HEADER_FIELDS),
            Some(IpHeaderFields::Ipv6(_)) => names.push(IPV6_HEADER_FIELDS),
            None => (),
        }
        if self.tcp_header_fields.is_some() {
            names.push(TCP_HEADER_FIELDS);
        }
        names
    }

    /// Names of the fields required by the protocols and the header randomization flag
    pub fn required_fields(&self) -> Vec<&'static str> {
        let mut names = BASE_FIELDS.to_vec();
        if self.randomize_headers {
            names.push(match self.internet_protocol {
                InternetProtocol::IPv4 => IPV4_HEADER_FIELDS,
                InternetProtocol::IPv6 => IPV6_HEADER_FIELDS,
            });
            if self.transport_protocol == TransportProtocol::TCP {
                names.push(TCP_HEADER_FIELDS);
            }
        }
        names
    }

    /// Check that the descriptor carries exactly the fields it requires
    pub fn validate(&self) -> Result<()> {
        let present = self.field_names();
        let required = self.required_fields();
        let missing: Vec<&'static str> = required
            .iter()
            .filter(|f| !present.contains(*f))
            .copied()
            .collect();
        let extra: Vec<&'static str> = present
            .iter()
            .filter(|f| !required.contains(*f))
            .copied()
            .collect();
        if missing.is_empty() && extra.is_empty() {
            Ok(())
        } else {
            Err(Error::DescriptorFieldMismatch { missing, extra })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn random_template() -> PacketTemplate {
        PacketTemplate {
            randomize_headers: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_ipv4_udp() {
        let mut g = Generator::new(Some(111)).unwrap();
        let d = random_template().resolve(&mut g).unwrap();
        assert_eq!(d.internet_protocol, InternetProtocol::IPv4);
        assert_eq!(d.transport_protocol, TransportProtocol::UDP);
        assert_eq!(d.cast, Cast::Multicast);
        assert_eq!(d.payload_length, 397);
        assert_eq!(
            d.ip_header_fields,
            Some(IpHeaderFields::Ipv4(Ipv4HeaderFields {
                ttl: 203,
                dscp: 213,
                flags: 2,
                frag_offset: 3172,
                id: 55265
            }))
        );
        assert_eq!(d.tcp_header_fields, None);
        assert!(d.validate().is_ok());
    }

    #[test]
    fn test_resolve_ipv6_tcp() {
        let mut g = Generator::new(Some(7)).unwrap();
        let d = random_template().resolve(&mut g).unwrap();
        assert_eq!(d.internet_protocol, InternetProtocol::IPv6);
        assert_eq!(d.transport_protocol, TransportProtocol::TCP);
        assert_eq!(d.payload_length, 1333);
        assert_eq!(
            d.ip_header_fields,
            Some(IpHeaderFields::Ipv6(Ipv6HeaderFields {
                traffic_class: 24,
                flow_label: 151909,
                hop_limit: 48
            }))
        );
        assert_eq!(
            d.tcp_header_fields,
            Some(TcpHeaderFields {
                seq: 2179419893,
                ack: 161042648,
                window: 56838,
                urgent_ptr: 54810
            })
        );
        assert!(d.validate().is_ok());
    }

    #[test]
    fn test_pinned_protocols_keep_stream() {
        // same seed as above: the protocol draws still happen, the header draws line up
        let mut g = Generator::new(Some(7)).unwrap();
        let template = PacketTemplate {
            internet_protocol: Some(InternetProtocol::IPv6),
            transport_protocol: Some(TransportProtocol::UDP),
            cast: Some(Cast::Unicast),
            ..random_template()
        };
        let d = template.resolve(&mut g).unwrap();
        assert_eq!(d.transport_protocol, TransportProtocol::UDP);
        assert_eq!(d.cast, Cast::Unicast);
        assert_eq!(d.payload_length, 1333);
        assert!(d.payload_length <= 1452);
        assert_eq!(
            d.ip_header_fields,
            Some(IpHeaderFields::Ipv6(Ipv6HeaderFields {
                traffic_class: 24,
                flow_label: 151909,
                hop_limit: 48
            }))
        );
        assert!(d.tcp_header_fields.is_none());
    }

    #[test]
    fn test_pinned_cast_keeps_stream() {
        let template = PacketTemplate {
            internet_protocol: Some(InternetProtocol::IPv4),
            transport_protocol: Some(TransportProtocol::UDP),
            min_length: 48,
            max_length: Some(100),
            ..random_template()
        };
        let pinned = PacketTemplate {
            cast: Some(Cast::Unicast),
            ..template
        };
        for seed in 0..50 {
            let mut g = Generator::new(Some(seed)).unwrap();
            let a = template.resolve(&mut g).unwrap();
            let next_a = g.bit_width(32);
            let mut g = Generator::new(Some(seed)).unwrap();
            let b = pinned.resolve(&mut g).unwrap();
            let next_b = g.bit_width(32);
            assert_eq!(b.cast, Cast::Unicast);
            assert_eq!(a.payload_length, b.payload_length);
            assert_eq!(a.ip_header_fields, b.ip_header_fields);
            assert_eq!(next_a, next_b);
        }

        let mut g = Generator::new(Some(3)).unwrap();
        let d = pinned.resolve(&mut g).unwrap();
        assert_eq!(d.payload_length, 86);
        assert_eq!(
            d.ip_header_fields,
            Some(IpHeaderFields::Ipv4(Ipv4HeaderFields {
                ttl: 242,
                dscp: 33,
                flags: 0,
                frag_offset: 7687,
                id: 33994
            }))
        );
    }

    #[test]
    fn test_no_headers() {
        let mut g = Generator::new(Some(7)).unwrap();
        let template = PacketTemplate {
            min_length: 100,
            max_length: Some(200),
            ..Default::default()
        };
        let d = template.resolve(&mut g).unwrap();
        assert_eq!(d.transport_protocol, TransportProtocol::TCP);
        assert_eq!(d.payload_length, 183);
        assert!(d.ip_header_fields.is_none());
        assert!(d.tcp_header_fields.is_none());
        assert_eq!(d.field_names().len(), 6);
    }

    #[test]
    fn test_length_bounds() {
        let mut g = Generator::new(Some(3)).unwrap();
        let template = PacketTemplate {
            min_length: 48,
            max_length: Some(60),
            ..Default::default()
        };
        for _ in 0..200 {
            let d = template.resolve(&mut g).unwrap();
            assert!((48..=60).contains(&d.payload_length));
        }
        let template = PacketTemplate::default();
        for _ in 0..200 {
            let d = template.resolve(&mut g).unwrap();
            assert!(
                d.payload_length
                    <= d.internet_protocol.get_max_payload(d.transport_protocol)
            );
        }
    }

    #[test]
    fn test_reversed_lengths_fail_before_drawing() {
        let mut g = Generator::new(Some(1)).unwrap();
        let template = PacketTemplate {
            min_length: 9001,
            max_length: Some(9000),
            ..Default::default()
        };
        assert!(matches!(
            template.resolve(&mut g),
            Err(Error::InvalidLengthRange {
                min: 9001,
                max: 9000
            })
        ));
        // the generator did not move
        assert_eq!(g.bit_width(8), 68);
    }

    #[test]
    fn test_min_length_above_ceiling() {
        let template = PacketTemplate {
            min_length: 1450,
            ..Default::default()
        };
        assert_eq!(template.min_ceiling(), 1440);
        let mut g = Generator::new(Some(1)).unwrap();
        assert!(matches!(
            template.resolve(&mut g),
            Err(Error::InvalidLengthRange {
                min: 1450,
                max: 1440
            })
        ));
        assert_eq!(g.bit_width(8), 68);

        // fits once the protocols are pinned to IPv4/UDP
        let template = PacketTemplate {
            internet_protocol: Some(InternetProtocol::IPv4),
            transport_protocol: Some(TransportProtocol::UDP),
            ..template
        };
        assert_eq!(template.min_ceiling(), 1472);
        let mut g = Generator::new(Some(1)).unwrap();
        for _ in 0..50 {
            let d = template.resolve(&mut g).unwrap();
            assert!((1450..=1472).contains(&d.payload_length));
        }
    }

    #[test]
    fn test_injected_tcp_fields() {
        let mut g = Generator::new(Some(111)).unwrap();
        let template = PacketTemplate {
            transport_protocol: Some(TransportProtocol::TCP),
            ..Default::default()
        };
        let mut d = template.resolve(&mut g).unwrap();
        assert!(d.tcp_header_fields.is_none());
        assert!(d.validate().is_ok());
        d.tcp_header_fields = Some(TcpHeaderFields::default());
        match d.validate() {
            Err(Error::DescriptorFieldMismatch { missing, extra }) => {
                assert!(missing.is_empty());
                assert_eq!(extra, vec![TCP_HEADER_FIELDS]);
            }
            r => panic!("unexpected result {r:?}"),
        }
    }

    #[test]
    fn test_wrong_ip_header_variant() {
        let mut g = Generator::new(Some(111)).unwrap();
        let mut d = random_template().resolve(&mut g).unwrap();
        d.ip_header_fields = Some(IpHeaderFields::Ipv6(Ipv6HeaderFields::default()));
        match d.validate() {
            Err(Error::DescriptorFieldMismatch { missing, extra }) => {
                assert_eq!(missing, vec![IPV4_HEADER_FIELDS]);
                assert_eq!(extra, vec![IPV6_HEADER_FIELDS]);
            }
            r => panic!("unexpected result {r:?}"),
        }
    }
}
