use crate::error::{Error, Result};
use crate::packet::Packet;

use pnet::util::MacAddr;
use std::collections::HashMap;
use std::net::Ipv4Addr;

/// Answers whether a host is reachable. Only used for logging around each session.
pub trait LivenessProber {
    fn is_online(&self, ip: Ipv4Addr) -> bool;
}

/// Resolves interface names and remote MAC addresses into concrete addresses
pub trait InterfaceResolver {
    /// The IP and MAC addresses of a local interface
    fn resolve_local(&self, interface: &str) -> Result<(Ipv4Addr, MacAddr)>;

    /// The MAC address of a remote host
    fn resolve_remote_mac(&self, ip: Ipv4Addr) -> Result<MacAddr>;
}

/// Receives each complete packet with the name of the interface to send it on
pub trait Transmitter {
    fn transmit(&mut self, packet: &Packet, interface: &str) -> Result<()>;
}

/// A host known to the static network
#[derive(Debug, Clone)]
pub struct KnownHost {
    pub ip: Ipv4Addr,
    pub mac: MacAddr,
    pub interface: Option<String>,
}

/// An offline view of the network, built from the hosts of a profile.
/// Known hosts are considered online.
#[derive(Debug, Clone, Default)]
pub struct StaticNetwork {
    mac_addr: HashMap<Ipv4Addr, MacAddr>,
    interfaces: HashMap<String, (Ipv4Addr, MacAddr)>,
}

impl StaticNetwork {
    pub fn new(hosts: &[KnownHost]) -> Self {
        let mut mac_addr = HashMap::new();
        let mut interfaces = HashMap::new();
        for host in hosts {
            mac_addr.insert(host.ip, host.mac);
            if let Some(name) = &host.interface {
                interfaces.insert(name.clone(), (host.ip, host.mac));
            }
        }
        log::debug!(
            "Static network with {} hosts and {} local interfaces",
            mac_addr.len(),
            interfaces.len()
        );
        StaticNetwork {
            mac_addr,
            interfaces,
        }
    }

    pub fn exists(&self, ip: &Ipv4Addr) -> bool {
        self.mac_addr.contains_key(ip)
    }
}

impl LivenessProber for StaticNetwork {
    fn is_online(&self, ip: Ipv4Addr) -> bool {
        self.exists(&ip)
    }
}

impl InterfaceResolver for StaticNetwork {
    fn resolve_local(&self, interface: &str) -> Result<(Ipv4Addr, MacAddr)> {
        self.interfaces
            .get(interface)
            .copied()
            .ok_or_else(|| Error::UnknownInterface(interface.to_string()))
    }

    fn resolve_remote_mac(&self, ip: Ipv4Addr) -> Result<MacAddr> {
        self.mac_addr
            .get(&ip)
            .copied()
            .ok_or(Error::RemoteMacResolution(ip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network() -> StaticNetwork {
        StaticNetwork::new(&[
            KnownHost {
                ip: Ipv4Addr::new(192, 168, 1, 10),
                mac: MacAddr::new(0, 1, 2, 3, 4, 5),
                interface: Some("eth0".to_string()),
            },
            KnownHost {
                ip: Ipv4Addr::new(192, 168, 1, 20),
                mac: MacAddr::new(0, 1, 2, 3, 4, 6),
                interface: None,
            },
        ])
    }

    #[test]
    fn test_resolution() {
        let net = network();
        assert_eq!(
            net.resolve_local("eth0").unwrap(),
            (
                Ipv4Addr::new(192, 168, 1, 10),
                MacAddr::new(0, 1, 2, 3, 4, 5)
            )
        );
        assert!(matches!(
            net.resolve_local("wlan0"),
            Err(Error::UnknownInterface(_))
        ));
        assert_eq!(
            net.resolve_remote_mac(Ipv4Addr::new(192, 168, 1, 20))
                .unwrap(),
            MacAddr::new(0, 1, 2, 3, 4, 6)
        );
        assert!(matches!(
            net.resolve_remote_mac(Ipv4Addr::new(10, 0, 0, 1)),
            Err(Error::RemoteMacResolution(_))
        ));
    }

    #[test]
    fn test_liveness() {
        let net = network();
        assert!(net.is_online(Ipv4Addr::new(192, 168, 1, 20)));
        assert!(!net.is_online(Ipv4Addr::new(192, 168, 1, 30)));
    }
}
