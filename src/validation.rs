//! Boundary validation of the user-provided template values

use crate::error::{Error, Result};
use crate::structs::{IpPattern, Octet, ValidationKind};

use pnet::util::MacAddr;

pub const MIN_IP_LENGTH: usize = 7;
pub const MAX_IP_LENGTH: usize = 17;
pub const MIN_MAC_LENGTH: usize = 12;
pub const MAX_MAC_LENGTH: usize = 17;
pub const MIN_PORT: u16 = 1;
pub const MIN_PACKET_LENGTH: usize = 48;
pub const MAX_PACKET_LENGTH: usize = 9000;
pub const MIN_NAME_LENGTH: usize = 1;
pub const MAX_NAME_LENGTH: usize = 31;
pub const MAX_SEED: u64 = i64::MAX as u64;

fn length_kind(len: usize, min: usize, max: usize) -> Option<ValidationKind> {
    if len > max {
        Some(ValidationKind::TooLong)
    } else if len < min {
        Some(ValidationKind::TooShort)
    } else {
        None
    }
}

/// Parse a dotted quad where each octet is either a decimal in 0..=255 or "*"
pub fn parse_ip_pattern(value: &str) -> Result<IpPattern> {
    let invalid = |kind| Error::InvalidIpPattern {
        value: value.to_string(),
        kind,
    };
    if let Some(kind) = length_kind(value.len(), MIN_IP_LENGTH, MAX_IP_LENGTH) {
        return Err(invalid(kind));
    }
    let tokens: Vec<&str> = value.split('.').collect();
    if tokens.len() != 4 {
        return Err(invalid(ValidationKind::WrongFormat));
    }
    let mut octets = [Octet::Wildcard; 4];
    for (octet, token) in octets.iter_mut().zip(tokens) {
        *octet = match token {
            "*" => Octet::Wildcard,
            t if !t.is_empty() && t.len() <= 3 && t.bytes().all(|b| b.is_ascii_digit()) => {
                let v: u16 = t
                    .parse()
                    .map_err(|_| invalid(ValidationKind::WrongFormat))?;
                Octet::Literal(u8::try_from(v).map_err(|_| invalid(ValidationKind::WrongValue))?)
            }
            _ => return Err(invalid(ValidationKind::WrongFormat)),
        };
    }
    Ok(IpPattern { octets })
}

/// Parse a MAC address written as X:X:X:X:X:X, X-X-X-X-X-X, XXXX.XXXX.XXXX or XXXXXXXXXXXX
pub fn parse_mac(value: &str) -> Result<MacAddr> {
    let invalid = |kind| Error::InvalidMac {
        value: value.to_string(),
        kind,
    };
    if let Some(kind) = length_kind(value.len(), MIN_MAC_LENGTH, MAX_MAC_LENGTH) {
        return Err(invalid(kind));
    }
    let digits: String = if value.contains(':') || value.contains('-') {
        let sep = if value.contains(':') { ':' } else { '-' };
        let groups: Vec<&str> = value.split(sep).collect();
        if groups.len() != 6 || groups.iter().any(|g| g.len() != 2) {
            return Err(invalid(ValidationKind::WrongFormat));
        }
        groups.concat()
    } else if value.contains('.') {
        let groups: Vec<&str> = value.split('.').collect();
        if groups.len() != 3 || groups.iter().any(|g| g.len() != 4) {
            return Err(invalid(ValidationKind::WrongFormat));
        }
        groups.concat()
    } else {
        value.to_string()
    };
    if digits.len() != 12 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid(ValidationKind::WrongFormat));
    }
    let mut octets = [0u8; 6];
    for (i, octet) in octets.iter_mut().enumerate() {
        *octet = u8::from_str_radix(&digits[2 * i..2 * i + 2], 16)
            .map_err(|_| invalid(ValidationKind::WrongFormat))?;
    }
    let [a, b, c, d, e, f] = octets;
    Ok(MacAddr::new(a, b, c, d, e, f))
}

/// Parse a port number in 1..=65535
pub fn parse_port(value: &str) -> Result<u16> {
    let invalid = |kind| Error::InvalidPort {
        value: value.to_string(),
        kind,
    };
    let port: i64 = value
        .trim()
        .parse()
        .map_err(|_| invalid(ValidationKind::WrongFormat))?;
    match u16::try_from(port) {
        Ok(p) if p >= MIN_PORT => Ok(p),
        _ => Err(invalid(ValidationKind::WrongValue)),
    }
}

pub fn validate_port(port: u16) -> Result<u16> {
    if port < MIN_PORT {
        return Err(Error::InvalidPort {
            value: port.to_string(),
            kind: ValidationKind::WrongValue,
        });
    }
    Ok(port)
}

/// Check a packet length against the accepted jumbo-frame bounds
pub fn validate_length(length: usize) -> Result<usize> {
    let kind = if length < MIN_PACKET_LENGTH {
        ValidationKind::TooShort
    } else if length > MAX_PACKET_LENGTH {
        ValidationKind::TooLong
    } else {
        return Ok(length);
    };
    Err(Error::InvalidLength {
        value: length.to_string(),
        kind,
    })
}

pub fn parse_length(value: &str) -> Result<usize> {
    let length: usize = value.trim().parse().map_err(|_| Error::InvalidLength {
        value: value.to_string(),
        kind: ValidationKind::WrongFormat,
    })?;
    validate_length(length)
}

/// Interface names are between 1 and 31 characters
pub fn validate_name(value: &str) -> Result<&str> {
    match length_kind(value.chars().count(), MIN_NAME_LENGTH, MAX_NAME_LENGTH) {
        Some(kind) => Err(Error::InvalidName {
            value: value.to_string(),
            kind,
        }),
        None => Ok(value),
    }
}

pub fn validate_seed(seed: u64) -> Result<u64> {
    if seed > MAX_SEED {
        Err(Error::InvalidSeed(seed))
    } else {
        Ok(seed)
    }
}
