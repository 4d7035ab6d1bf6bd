use crate::details::PacketTemplate;
use crate::error::{Error, Result};
use crate::generator::{self, Generator};
use crate::hosts::HostTemplate;
use crate::packet::Packet;
use crate::validation;

use rand_core::*;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Number of packets generated from a single seed
pub const PACKETS_PER_SEED: usize = 100;

/// Generation session: a finite sequence of packets drawn from a single seed.
///
/// For each packet, the target is resolved, then the source, then the descriptor, and finally
/// the packet is built (its payload is drawn last). The templates are never modified, so two
/// sessions with the same seed and templates yield the same packets. The sequence stops after
/// the first error.
#[derive(Debug, Clone)]
pub struct Session {
    target: HostTemplate,
    source: HostTemplate,
    details: PacketTemplate,
    generator: Generator,
    packet_count: usize,
    max_packets: usize,
    failed: bool,
}

/// Start a session of at most `max_packets` packets. Without a source template, the source
/// is fully random.
pub fn generate(
    target: &HostTemplate,
    details: &PacketTemplate,
    source: Option<&HostTemplate>,
    seed: Option<u64>,
    max_packets: usize,
) -> Result<Session> {
    details.validate()?;
    let generator = Generator::new(seed)?;
    log::info!("Packet generator seed: {}", generator.seed());
    Ok(Session {
        target: target.clone(),
        source: source.cloned().unwrap_or_default(),
        details: *details,
        generator,
        packet_count: 0,
        max_packets,
        failed: false,
    })
}

impl Session {
    pub fn seed(&self) -> u64 {
        self.generator.seed()
    }

    /// Number of packets produced so far
    pub fn packet_count(&self) -> usize {
        self.packet_count
    }

    fn next_packet(&mut self) -> Result<Packet> {
        let target = self.target.resolve(&mut self.generator)?;
        let source = self.source.resolve(&mut self.generator)?;
        let descriptor = self.details.resolve(&mut self.generator)?;
        Packet::build(&target, &source, descriptor, &mut self.generator)
    }
}

impl Iterator for Session {
    type Item = Result<Packet>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.packet_count >= self.max_packets {
            return None;
        }
        match self.next_packet() {
            Ok(packet) => {
                log::debug!("Packet #{}: {packet}", self.packet_count);
                self.packet_count += 1;
                Some(Ok(packet))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

impl std::iter::FusedIterator for Session {}

/// How the seed of each session of a campaign is chosen
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SeedPolicy {
    /// Every session restarts from the master seed, hence yields the same packets
    Reuse,
    /// Each session draws a fresh seed from a stream keyed by the master seed
    #[default]
    Advance,
}

impl FromStr for SeedPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "reuse" => Ok(SeedPolicy::Reuse),
            "advance" => Ok(SeedPolicy::Advance),
            _ => Err(Error::InvalidSeedPolicy(s.to_string())),
        }
    }
}

/// Seeds of the successive sessions of a campaign. The first one is always the master seed.
#[derive(Debug, Clone)]
pub struct SeedSequence {
    master: u64,
    policy: SeedPolicy,
    rng: Pcg32,
    first: bool,
}

impl SeedSequence {
    /// Without a master seed, the current time is used
    pub fn new(master: Option<u64>, policy: SeedPolicy) -> Result<Self> {
        let master = match master {
            Some(s) => validation::validate_seed(s)?,
            None => generator::clock_seed(),
        };
        Ok(SeedSequence {
            master,
            policy,
            rng: Pcg32::seed_from_u64(master),
            first: true,
        })
    }

    pub fn master(&self) -> u64 {
        self.master
    }
}

impl Iterator for SeedSequence {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if self.first || self.policy == SeedPolicy::Reuse {
            self.first = false;
            return Some(self.master);
        }
        Some(self.rng.next_u64() & validation::MAX_SEED)
    }
}
