use crate::error::{Error, Result};
use crate::generator::Generator;
use crate::network::InterfaceResolver;
use crate::structs::{format_mac, EndpointField, IpPattern, MacSpec};
use crate::validation;

use pnet::util::MacAddr;
use std::fmt::{Display, Formatter};
use std::net::Ipv4Addr;

/// A partially-specified endpoint. Unset fields are drawn at resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostTemplate {
    pub ip: Option<IpPattern>,
    pub mac: Option<MacSpec>,
    pub port: Option<u16>,
    /// A local interface whose addresses replace the IP and MAC addresses
    pub interface: Option<String>,
}

/// A resolved endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Host {
    pub ip: Option<Ipv4Addr>,
    pub mac: Option<MacAddr>,
    pub port: Option<u16>,
}

/// A host whose fields are all known
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub ip: Ipv4Addr,
    pub mac: MacAddr,
    pub port: u16,
}

impl HostTemplate {
    /// Build a template from its textual fields, validating each of them
    pub fn parse(
        ip: Option<&str>,
        mac: Option<&str>,
        port: Option<&str>,
        interface: Option<&str>,
    ) -> Result<Self> {
        Ok(HostTemplate {
            ip: ip.map(str::parse).transpose()?,
            mac: mac.map(str::parse).transpose()?,
            port: port.map(validation::parse_port).transpose()?,
            interface: interface
                .map(|i| validation::validate_name(i).map(String::from))
                .transpose()?,
        })
    }

    /// Replace the interface name and the "self" MAC sentinel by concrete addresses.
    ///
    /// An interface overrides both the IP and the MAC address of the template. Otherwise, a
    /// "self" MAC is asked to the resolver for the (exact) IP address of the template.
    pub fn localize<R: InterfaceResolver + ?Sized>(&self, resolver: &R) -> Result<HostTemplate> {
        if let Some(interface) = &self.interface {
            let (ip, mac) = resolver.resolve_local(interface)?;
            log::debug!("Interface {interface} has address {ip} ({})", format_mac(&mac));
            return Ok(HostTemplate {
                ip: Some(ip.into()),
                mac: Some(MacSpec::Address(mac)),
                port: self.port,
                interface: None,
            });
        }
        match (self.mac, self.ip.and_then(|p| p.as_exact())) {
            (Some(MacSpec::Local), Some(ip)) => {
                let mac = resolver.resolve_remote_mac(ip)?;
                log::debug!("Host {ip} has MAC address {}", format_mac(&mac));
                Ok(HostTemplate {
                    mac: Some(MacSpec::Address(mac)),
                    ..self.clone()
                })
            }
            (Some(MacSpec::Local), None) => Err(Error::UnresolvedLocalMac),
            _ => Ok(self.clone()),
        }
    }

    /// Draw the missing fields of the template. The template itself is left unchanged.
    ///
    /// Draws happen in a fixed order: the IP wildcards, then the MAC address, then the port.
    /// Interface names and the "self" MAC must have been localized first.
    pub fn resolve(&self, generator: &mut Generator) -> Result<Host> {
        if let Some(interface) = &self.interface {
            return Err(Error::UnresolvedInterface(interface.clone()));
        }
        if self.mac == Some(MacSpec::Local) {
            return Err(Error::UnresolvedLocalMac);
        }
        let ip = generator.mask(&self.ip.unwrap_or(IpPattern::ANY));
        let mac = match self.mac {
            Some(MacSpec::Address(mac)) => mac,
            _ => generator.random_mac(),
        };
        let port = match self.port {
            Some(port) => port,
            None => generator.bit_width(16) as u16,
        };
        Ok(Host {
            ip: Some(ip),
            mac: Some(mac),
            port: Some(port),
        })
    }
}

impl Display for HostTemplate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let unset = || "*".to_string();
        write!(
            f,
            "IP: {}, MAC: {}, port: {}",
            self.ip.map(|ip| ip.to_string()).unwrap_or_else(unset),
            self.mac.map(|mac| mac.to_string()).unwrap_or_else(unset),
            self.port.map(|p| p.to_string()).unwrap_or_else(unset),
        )?;
        if let Some(interface) = &self.interface {
            write!(f, ", interface: {interface}")?;
        }
        Ok(())
    }
}

impl Host {
    pub fn new(ip: Ipv4Addr, mac: MacAddr, port: u16) -> Self {
        Host {
            ip: Some(ip),
            mac: Some(mac),
            port: Some(port),
        }
    }

    /// The endpoint, or the first missing field. The role ("target" or "source") is only used
    /// for the error.
    pub fn to_endpoint(&self, role: &'static str) -> Result<Endpoint> {
        let missing = |field| Error::MissingEndpointField { role, field };
        Ok(Endpoint {
            ip: self.ip.ok_or_else(|| missing(EndpointField::Ip))?,
            mac: self.mac.ok_or_else(|| missing(EndpointField::Mac))?,
            port: self.port.ok_or_else(|| missing(EndpointField::Port))?,
        })
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} ({})", self.ip, self.port, format_mac(&self.mac))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{KnownHost, StaticNetwork};

    #[test]
    fn test_resolve_masked_ip() {
        let template = HostTemplate::parse(Some("192.168.1.*"), None, None, None).unwrap();
        let mut g = Generator::new(Some(1)).unwrap();
        let host = template.resolve(&mut g).unwrap();
        assert_eq!(host.ip, Some(Ipv4Addr::new(192, 168, 1, 68)));
        assert_eq!(host.mac, Some(MacAddr::new(0, 32, 130, 60, 253, 230)));
        assert_eq!(host.port, Some(61898));
    }

    #[test]
    fn test_resolve_keeps_given_fields() {
        let template =
            HostTemplate::parse(Some("10.0.0.1"), Some("AA:BB:CC:DD:EE:FF"), Some("80"), None)
                .unwrap();
        let mut g = Generator::new(Some(5)).unwrap();
        for _ in 0..10 {
            let host = template.resolve(&mut g).unwrap();
            assert_eq!(
                host,
                Host::new(
                    Ipv4Addr::new(10, 0, 0, 1),
                    MacAddr::new(0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff),
                    80
                )
            );
        }
    }

    #[test]
    fn test_resolve_empty_template() {
        let mut g = Generator::new(Some(5)).unwrap();
        let host = HostTemplate::default().resolve(&mut g).unwrap();
        assert_eq!(host.ip, Some(Ipv4Addr::new(130, 183, 14, 238)));
        assert_eq!(host.mac, Some(MacAddr::new(0, 127, 26, 80, 57, 190)));
        assert_eq!(host.port, Some(61481));
    }

    #[test]
    fn test_missing_fields() {
        let host = Host {
            ip: Some(Ipv4Addr::new(10, 0, 0, 1)),
            mac: None,
            port: Some(80),
        };
        assert!(matches!(
            host.to_endpoint("target"),
            Err(Error::MissingEndpointField {
                role: "target",
                field: EndpointField::Mac
            })
        ));
        let host = Host::new(Ipv4Addr::new(10, 0, 0, 1), MacAddr::zero(), 80);
        assert_eq!(host.to_endpoint("source").unwrap().port, 80);
    }

    #[test]
    fn test_unresolved_self_mac() {
        let template = HostTemplate::parse(Some("10.0.0.1"), Some("self"), None, None).unwrap();
        let mut g = Generator::new(Some(5)).unwrap();
        assert!(matches!(
            template.resolve(&mut g),
            Err(Error::UnresolvedLocalMac)
        ));
    }

    #[test]
    fn test_unresolved_interface() {
        let template = HostTemplate::parse(None, None, None, Some("eth0")).unwrap();
        let mut g = Generator::new(Some(1)).unwrap();
        assert!(matches!(
            template.resolve(&mut g),
            Err(Error::UnresolvedInterface(name)) if name == "eth0"
        ));
        // nothing was drawn
        assert_eq!(g.bit_width(8), 68);
    }

    #[test]
    fn test_localize() {
        let net = StaticNetwork::new(&[KnownHost {
            ip: Ipv4Addr::new(10, 0, 0, 1),
            mac: MacAddr::new(0, 1, 2, 3, 4, 5),
            interface: Some("eth0".to_string()),
        }]);
        let remote = HostTemplate::parse(Some("10.0.0.1"), Some("self"), None, None).unwrap();
        assert_eq!(
            remote.localize(&net).unwrap().mac,
            Some(MacSpec::Address(MacAddr::new(0, 1, 2, 3, 4, 5)))
        );
        let local = HostTemplate::parse(None, None, Some("4444"), Some("eth0")).unwrap();
        let local = local.localize(&net).unwrap();
        assert_eq!(local.ip.and_then(|p| p.as_exact()), Some(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(local.port, Some(4444));
        assert_eq!(local.interface, None);
        let wildcard = HostTemplate::parse(Some("10.0.0.*"), Some("self"), None, None).unwrap();
        assert!(matches!(
            wildcard.localize(&net),
            Err(Error::UnresolvedLocalMac)
        ));
        let unknown = HostTemplate::parse(None, None, None, Some("wlan0")).unwrap();
        assert!(matches!(
            unknown.localize(&net),
            Err(Error::UnknownInterface(_))
        ));
    }
}
