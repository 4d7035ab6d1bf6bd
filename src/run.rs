use crate::config::TemplateRecord;
use crate::error::Result;
use crate::hosts::HostTemplate;
use crate::network::{InterfaceResolver, LivenessProber, Transmitter};
use crate::session::{self, SeedSequence};

use serde::Serialize;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// What a campaign did
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub packets: usize,
    pub sessions: usize,
    pub bytes: usize,
    /// The seed of each session, in order
    pub seeds: Vec<u64>,
}

/// A fuzzing campaign: chains generation sessions until the requested number of packets has
/// been handed to the transmitter, or until it is stopped.
#[derive(Debug, Clone)]
pub struct Campaign {
    record: TemplateRecord,
}

fn check_liveness<P: LivenessProber + ?Sized>(prober: &P, target: Option<Ipv4Addr>) {
    if let Some(ip) = target {
        if !prober.is_online(ip) {
            log::error!("Target is offline ({ip})");
        }
    }
}

impl Campaign {
    pub fn new(record: TemplateRecord) -> Self {
        Campaign { record }
    }

    pub fn record(&self) -> &TemplateRecord {
        &self.record
    }

    /// Run the campaign. The interface names and "self" MAC addresses of the templates are
    /// resolved first. The liveness of the target is checked around each session when its IP
    /// address has no wildcard; an offline target is only logged.
    pub fn run<R, P, T>(
        &self,
        resolver: &R,
        prober: &P,
        transmitter: &mut T,
        running: &AtomicBool,
    ) -> Result<Summary>
    where
        R: InterfaceResolver + ?Sized,
        P: LivenessProber + ?Sized,
        T: Transmitter + ?Sized,
    {
        let record = &self.record;
        let target = record.target.localize(resolver)?;
        let source: Option<HostTemplate> = record
            .source
            .as_ref()
            .map(|s| s.localize(resolver))
            .transpose()?;
        log::info!("Target({target})");
        if let Some(source) = &source {
            log::info!("Source({source})");
        }
        log::info!("PacketDetails({})", record.details);

        let mut summary = Summary::default();
        if record.packets_per_seed == 0 {
            log::warn!("No packet can be generated with zero packets per seed");
            return Ok(summary);
        }
        let mut seeds = SeedSequence::new(record.seed, record.seed_policy)?;
        log::info!(
            "Master seed: {} ({:?} policy)",
            seeds.master(),
            record.seed_policy
        );
        let exact_target = target.ip.and_then(|p| p.as_exact());
        let start = Instant::now();

        while summary.packets < record.packet_count && running.load(Ordering::Relaxed) {
            check_liveness(prober, exact_target);
            let Some(seed) = seeds.next() else { break };
            log::info!(
                "Starting packet generator (Pkt={}, Gen={})",
                summary.packets,
                summary.sessions
            );
            let session = session::generate(
                &target,
                &record.details,
                source.as_ref(),
                Some(seed),
                record.packets_per_seed,
            )?;
            summary.seeds.push(seed);
            for packet in session {
                let packet = packet?;
                transmitter.transmit(&packet, &record.interface)?;
                summary.packets += 1;
                summary.bytes += packet.len();
                if summary.packets >= record.packet_count || !running.load(Ordering::Relaxed) {
                    break;
                }
            }
            summary.sessions += 1;
            log::info!(
                "Terminated packet generator (Pkt={}, Gen={})",
                summary.packets,
                summary.sessions
            );
            check_liveness(prober, exact_target);
        }

        log::info!(
            "[Completed] Sent: {}, Time: {:.3}s",
            summary.packets,
            start.elapsed().as_secs_f64()
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::details::PacketTemplate;
    use crate::error::Error;
    use crate::network::{KnownHost, StaticNetwork};
    use crate::packet::Packet;
    use crate::session::SeedPolicy;
    use pnet::util::MacAddr;

    #[derive(Default)]
    struct Collector {
        frames: Vec<Vec<u8>>,
        interfaces: Vec<String>,
    }

    impl Transmitter for Collector {
        fn transmit(&mut self, packet: &Packet, interface: &str) -> Result<()> {
            self.frames.push(packet.to_bytes()?);
            self.interfaces.push(interface.to_string());
            Ok(())
        }
    }

    fn record(packet_count: usize, seed_policy: SeedPolicy) -> TemplateRecord {
        TemplateRecord {
            target: HostTemplate::parse(Some("10.0.0.1"), Some("self"), Some("80"), None).unwrap(),
            source: Some(HostTemplate::parse(None, None, None, Some("eth0")).unwrap()),
            details: PacketTemplate {
                min_length: 48,
                max_length: Some(64),
                ..Default::default()
            },
            seed: Some(3),
            packet_count,
            interface: "eth0".to_string(),
            packets_per_seed: 10,
            seed_policy,
        }
    }

    fn network() -> StaticNetwork {
        StaticNetwork::new(&[
            KnownHost {
                ip: "10.0.0.1".parse().unwrap(),
                mac: MacAddr::new(0, 0, 0, 0, 0, 1),
                interface: None,
            },
            KnownHost {
                ip: "10.0.0.2".parse().unwrap(),
                mac: MacAddr::new(0, 0, 0, 0, 0, 2),
                interface: Some("eth0".to_string()),
            },
        ])
    }

    #[test]
    fn test_campaign_counts() {
        let net = network();
        let running = AtomicBool::new(true);
        let mut collector = Collector::default();
        let summary = Campaign::new(record(25, SeedPolicy::Advance))
            .run(&net, &net, &mut collector, &running)
            .unwrap();
        assert_eq!(summary.packets, 25);
        assert_eq!(summary.sessions, 3);
        assert_eq!(summary.seeds.len(), 3);
        assert_eq!(summary.seeds[0], 3);
        assert_eq!(collector.frames.len(), 25);
        assert_eq!(
            summary.bytes,
            collector.frames.iter().map(|f| f.len()).sum::<usize>()
        );
        assert!(collector.interfaces.iter().all(|i| i == "eth0"));
        // resolved addresses
        let frame = &collector.frames[0];
        assert_eq!(&frame[0..6], &[0, 0, 0, 0, 0, 1]);
        assert_eq!(&frame[6..12], &[0, 0, 0, 0, 0, 2]);
    }

    #[test]
    fn test_reuse_repeats_sessions() {
        let net = network();
        let running = AtomicBool::new(true);
        let mut collector = Collector::default();
        let summary = Campaign::new(record(20, SeedPolicy::Reuse))
            .run(&net, &net, &mut collector, &running)
            .unwrap();
        assert_eq!(summary.seeds, vec![3, 3]);
        assert_eq!(collector.frames[..10], collector.frames[10..]);

        let mut collector = Collector::default();
        Campaign::new(record(20, SeedPolicy::Advance))
            .run(&net, &net, &mut collector, &running)
            .unwrap();
        assert_ne!(collector.frames[..10], collector.frames[10..]);
    }

    #[test]
    fn test_stopped_campaign() {
        let net = network();
        let running = AtomicBool::new(false);
        let mut collector = Collector::default();
        let summary = Campaign::new(record(20, SeedPolicy::Reuse))
            .run(&net, &net, &mut collector, &running)
            .unwrap();
        assert_eq!(summary, Summary::default());
    }

    #[test]
    fn test_unresolvable_target() {
        let net = StaticNetwork::default();
        let running = AtomicBool::new(true);
        let mut collector = Collector::default();
        let result = Campaign::new(record(20, SeedPolicy::Reuse)).run(
            &net,
            &net,
            &mut collector,
            &running,
        );
        assert!(matches!(result, Err(Error::RemoteMacResolution(_))));
    }
}
