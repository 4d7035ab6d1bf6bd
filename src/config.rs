use crate::details::PacketTemplate;
use crate::error::{Error, Result};
use crate::hosts::HostTemplate;
use crate::network::{KnownHost, StaticNetwork};
use crate::session::{SeedPolicy, PACKETS_PER_SEED};
use crate::structs::{Cast, InternetProtocol, TransportProtocol, ValidationKind};
use crate::validation;

use serde::Deserialize;

/// The validated input of a campaign
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateRecord {
    pub target: HostTemplate,
    pub source: Option<HostTemplate>,
    pub details: PacketTemplate,
    pub seed: Option<u64>,
    pub packet_count: usize,
    /// The interface the packets are sent on
    pub interface: String,
    pub packets_per_seed: usize,
    pub seed_policy: SeedPolicy,
}

/// An endpoint as written in a profile
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    pub ip: Option<String>,
    pub mac: Option<String>,
    pub port: Option<u16>,
    pub interface: Option<String>,
}

/// Packet constraints as written in a profile
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DetailsConfig {
    pub internet_protocol: Option<InternetProtocol>,
    pub transport_protocol: Option<TransportProtocol>,
    pub cast: Option<Cast>,
    pub vlan: Option<bool>,
    pub randomize_headers: Option<bool>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
}

/// A host of the local network, used to resolve interface names and "self" MAC addresses
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HostEntry {
    pub ip: String,
    pub mac: String,
    pub interface: Option<String>,
}

/// A campaign profile. Every field is optional so that a profile can be completed (or
/// overridden) by the command line.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Profile {
    pub interface: Option<String>,
    pub packet_count: Option<usize>,
    pub seed: Option<u64>,
    pub seed_policy: Option<SeedPolicy>,
    pub packets_per_seed: Option<usize>,
    pub target: Option<HostConfig>,
    pub source: Option<HostConfig>,
    pub details: Option<DetailsConfig>,
    #[serde(default)]
    pub hosts: Vec<HostEntry>,
}

/// Parses a TOML profile
pub fn import_profile(config: &str) -> Result<Profile> {
    Ok(toml::from_str(config)?)
}

impl HostConfig {
    fn override_with(self, other: HostConfig) -> HostConfig {
        HostConfig {
            ip: other.ip.or(self.ip),
            mac: other.mac.or(self.mac),
            port: other.port.or(self.port),
            interface: other.interface.or(self.interface),
        }
    }

    pub fn to_template(&self) -> Result<HostTemplate> {
        let port = self.port.map(validation::validate_port).transpose()?;
        let template = HostTemplate::parse(
            self.ip.as_deref(),
            self.mac.as_deref(),
            None,
            self.interface.as_deref(),
        )?;
        Ok(HostTemplate { port, ..template })
    }
}

impl DetailsConfig {
    fn override_with(self, other: DetailsConfig) -> DetailsConfig {
        DetailsConfig {
            internet_protocol: other.internet_protocol.or(self.internet_protocol),
            transport_protocol: other.transport_protocol.or(self.transport_protocol),
            cast: other.cast.or(self.cast),
            vlan: other.vlan.or(self.vlan),
            randomize_headers: other.randomize_headers.or(self.randomize_headers),
            min_length: other.min_length.or(self.min_length),
            max_length: other.max_length.or(self.max_length),
        }
    }

    /// Headers are randomized unless disabled. Given lengths must fit a jumbo frame.
    pub fn to_template(&self) -> Result<PacketTemplate> {
        let min_length = self
            .min_length
            .map(validation::validate_length)
            .transpose()?;
        let max_length = self
            .max_length
            .map(validation::validate_length)
            .transpose()?;
        let template = PacketTemplate {
            internet_protocol: self.internet_protocol,
            transport_protocol: self.transport_protocol,
            cast: self.cast,
            vlan: self.vlan.unwrap_or(false),
            randomize_headers: self.randomize_headers.unwrap_or(true),
            min_length: min_length.unwrap_or(0),
            max_length,
        };
        template.validate()?;
        Ok(template)
    }
}

fn merge<T>(base: Option<T>, other: Option<T>, f: fn(T, T) -> T) -> Option<T> {
    match (base, other) {
        (Some(b), Some(o)) => Some(f(b, o)),
        (b, o) => o.or(b),
    }
}

impl Profile {
    /// Fields set in `other` replace those of `self`. The hosts are appended.
    pub fn override_with(self, other: Profile) -> Profile {
        let mut hosts = self.hosts;
        hosts.extend(other.hosts);
        Profile {
            interface: other.interface.or(self.interface),
            packet_count: other.packet_count.or(self.packet_count),
            seed: other.seed.or(self.seed),
            seed_policy: other.seed_policy.or(self.seed_policy),
            packets_per_seed: other.packets_per_seed.or(self.packets_per_seed),
            target: merge(self.target, other.target, HostConfig::override_with),
            source: merge(self.source, other.source, HostConfig::override_with),
            details: merge(self.details, other.details, DetailsConfig::override_with),
            hosts,
        }
    }

    /// The offline network described by the hosts of the profile
    pub fn network(&self) -> Result<StaticNetwork> {
        let hosts = self
            .hosts
            .iter()
            .map(|h| {
                Ok(KnownHost {
                    ip: validation::parse_ip_pattern(&h.ip)?
                        .as_exact()
                        .ok_or_else(|| Error::InvalidIpPattern {
                            value: h.ip.clone(),
                            kind: ValidationKind::WrongValue,
                        })?,
                    mac: validation::parse_mac(&h.mac)?,
                    interface: h
                        .interface
                        .as_deref()
                        .map(|i| validation::validate_name(i).map(String::from))
                        .transpose()?,
                })
            })
            .collect::<Result<Vec<KnownHost>>>()?;
        Ok(StaticNetwork::new(&hosts))
    }

    /// Validate the profile into a campaign record
    pub fn to_record(&self) -> Result<TemplateRecord> {
        let target = self
            .target
            .as_ref()
            .ok_or(Error::MissingSetting("target"))?;
        if target.ip.is_none() && target.interface.is_none() {
            return Err(Error::MissingSetting("target IP address"));
        }
        let interface = self
            .interface
            .as_deref()
            .ok_or(Error::MissingSetting("network interface"))?;
        let seed = self.seed.map(validation::validate_seed).transpose()?;
        Ok(TemplateRecord {
            target: target.to_template()?,
            source: self.source.as_ref().map(HostConfig::to_template).transpose()?,
            details: self.details.clone().unwrap_or_default().to_template()?,
            seed,
            packet_count: self
                .packet_count
                .ok_or(Error::MissingSetting("packet count"))?,
            interface: validation::validate_name(interface)?.to_string(),
            packets_per_seed: self.packets_per_seed.unwrap_or(PACKETS_PER_SEED),
            seed_policy: self.seed_policy.unwrap_or_default(),
        })
    }
}
