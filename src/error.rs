//! Error types of the packet generator

use crate::structs::{EndpointField, ValidationKind};
use std::net::Ipv4Addr;
use thiserror::Error;

/// Result type alias for the packet generator
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the generator can report. Each validation failure keeps its
/// own kind so that callers can tell a malformed value from an out-of-range one.
#[derive(Error, Debug)]
pub enum Error {
    /// The seed cannot be used to initialize the generator
    #[error("Invalid seed {0}: it must be an integer between 0 and {max}", max = i64::MAX)]
    InvalidSeed(u64),

    /// A draw was requested with reversed bounds
    #[error("Invalid range: the minimum {min} is greater than the maximum {max}")]
    InvalidRange { min: i64, max: i64 },

    /// A choice was requested among zero items
    #[error("Cannot choose from an empty sequence")]
    EmptyChoice,

    /// The IP pattern is not a dotted quad of literal or wildcard octets
    #[error("Invalid IP pattern \"{value}\" ({kind}): required to be in format X.X.X.X where X is 0-255 or *")]
    InvalidIpPattern { value: String, kind: ValidationKind },

    /// The MAC address is not in a supported form
    #[error("Invalid MAC address \"{value}\" ({kind}): required to be in format X:X:X:X:X:X, X-X-X-X-X-X or X.X.X")]
    InvalidMac { value: String, kind: ValidationKind },

    /// The port is not an integer between 1 and 65535
    #[error("Invalid port \"{value}\" ({kind}): required to be an integer between 1 and 65535")]
    InvalidPort { value: String, kind: ValidationKind },

    /// The packet length is outside of the accepted bounds
    #[error("Invalid packet length \"{value}\" ({kind}): required to be an integer between {min} and {max}", min = crate::validation::MIN_PACKET_LENGTH, max = crate::validation::MAX_PACKET_LENGTH)]
    InvalidLength { value: String, kind: ValidationKind },

    /// The payload length bounds are reversed
    #[error("Invalid length range: the minimum length {min} is greater than the maximum length {max}")]
    InvalidLengthRange { min: usize, max: usize },

    /// The interface name is empty or too long
    #[error("Invalid name \"{value}\" ({kind}): required to be between 1 and 31 characters")]
    InvalidName { value: String, kind: ValidationKind },

    /// Unknown internet or transport protocol name
    #[error("Unsupported protocol \"{0}\": required to be IPv4, IPv6, TCP or UDP")]
    InvalidProtocol(String),

    /// Unknown cast type name
    #[error("Unsupported cast type \"{0}\": required to be unicast, multicast or broadcast")]
    InvalidCast(String),

    /// Unknown seed policy name
    #[error("Unsupported seed policy \"{0}\": required to be reuse or advance")]
    InvalidSeedPolicy(String),

    /// A host handed to the packet builder lacks a field
    #[error("The {role} host has no {field}")]
    MissingEndpointField {
        role: &'static str,
        field: EndpointField,
    },

    /// The descriptor field set does not match its own protocol choices
    #[error("Packet descriptor fields do not match its protocols (missing: {missing:?}, extra: {extra:?})")]
    DescriptorFieldMismatch {
        missing: Vec<&'static str>,
        extra: Vec<&'static str>,
    },

    /// A layer was added out of order, or the packet was used before completion
    #[error("Incomplete packet: {0}")]
    IncompletePacket(String),

    /// The "self" MAC sentinel reached endpoint resolution unresolved
    #[error("The MAC address \"self\" must be resolved by the interface resolver first")]
    UnresolvedLocalMac,

    /// An interface name reached endpoint resolution unresolved
    #[error("The interface \"{0}\" must be resolved by the interface resolver first")]
    UnresolvedInterface(String),

    /// The interface resolver does not know this interface
    #[error("Cannot get the local address of interface \"{0}\": unknown interface name")]
    UnknownInterface(String),

    /// The interface resolver cannot find the MAC address of a remote host
    #[error("Cannot get the remote MAC address of {0}")]
    RemoteMacResolution(Ipv4Addr),

    /// A packet could not be written into its buffer
    #[error("Packet encoding error: {0}")]
    Encoding(String),

    /// A required setting is given neither on the command line nor in the profile
    #[error("Missing setting: {0}")]
    MissingSetting(&'static str),

    /// The template profile is ill-formed
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// The export sink failed
    #[error("Export error: {0}")]
    Export(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<pcap_file::PcapError> for Error {
    fn from(e: pcap_file::PcapError) -> Self {
        Error::Export(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Export(e.to_string())
    }
}
