use netfuzz::config::{DetailsConfig, HostConfig, Profile};
use netfuzz::session::SeedPolicy;
use netfuzz::structs::{Cast, InternetProtocol, TransportProtocol};

use clap::{Parser, Subcommand};

#[derive(Debug, Parser, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Generate random packets and write them into a pcap file
    CreatePcap {
        #[arg(
            short,
            long,
            default_value = "output.pcap",
            help = "Output pcap file for the generated packets"
        )]
        outfile: String,
        #[arg(
            short = 't',
            long,
            default_value = None,
            help = "Timestamp of the first packet as a Unix timestamp. By default, use current time"
        )]
        start_time: Option<u64>,
        #[command(flatten)]
        template: TemplateArgs,
    },
    /// Generate random packets and print their endpoints and descriptors as JSON lines
    Describe {
        #[arg(
            short,
            long,
            default_value = None,
            help = "Output file. By default, print on the standard output"
        )]
        outfile: Option<String>,
        #[command(flatten)]
        template: TemplateArgs,
    },
}

/// The packet template. Every option overrides the profile.
#[derive(Debug, clap::Args, Clone)]
pub struct TemplateArgs {
    #[arg(help = "Target IP address. Octets can be replaced by a wildcard, e.g. 192.168.1.*")]
    pub target_ip: Option<String>,
    #[arg(help = "Network interface the packets are meant for")]
    pub interface: Option<String>,
    #[arg(help = "Number of packets to generate")]
    pub packet_count: Option<usize>,
    #[arg(
        short,
        long,
        default_value = None,
        help = "Path to a TOML profile with the template and the known hosts"
    )]
    pub profile: Option<String>,
    #[arg(long, help = "Target MAC address, or \"self\" to resolve it")]
    pub target_mac: Option<String>,
    #[arg(long, help = "Target port")]
    pub target_port: Option<u16>,
    #[arg(long, help = "Target interface, whose addresses replace the target IP and MAC")]
    pub target_interface: Option<String>,
    #[arg(long, help = "Source IP address. Octets can be replaced by a wildcard")]
    pub source_ip: Option<String>,
    #[arg(long, help = "Source MAC address, or \"self\" to resolve it")]
    pub source_mac: Option<String>,
    #[arg(long, help = "Source port")]
    pub source_port: Option<u16>,
    #[arg(long, help = "Source interface, whose addresses replace the source IP and MAC")]
    pub source_interface: Option<String>,
    #[arg(long, help = "Internet protocol (IPv4 or IPv6). Random by default")]
    pub int_protocol: Option<InternetProtocol>,
    #[arg(long, help = "Transport protocol (TCP or UDP). Random by default")]
    pub trans_protocol: Option<TransportProtocol>,
    #[arg(long, help = "Cast type (unicast, multicast or broadcast). Random by default")]
    pub cast: Option<Cast>,
    #[arg(long, default_value_t = false, help = "Add a VLAN tag")]
    pub vlan: bool,
    #[arg(
        long,
        default_value_t = false,
        help = "Do not randomize the IP and TCP header fields"
    )]
    pub no_headers: bool,
    #[arg(long, help = "Minimum payload length")]
    pub min_length: Option<usize>,
    #[arg(long, help = "Maximum payload length. By default, fill the frame")]
    pub max_length: Option<usize>,
    #[arg(short, long, help = "Seed for random number generation")]
    pub seed: Option<u64>,
    #[arg(long, help = "Number of packets generated from each seed [default: 100]")]
    pub packets_per_seed: Option<usize>,
    #[arg(long, help = "Seed of the successive sessions (reuse or advance) [default: advance]")]
    pub seed_policy: Option<SeedPolicy>,
}

fn host_config(
    ip: &Option<String>,
    mac: &Option<String>,
    port: Option<u16>,
    interface: &Option<String>,
) -> Option<HostConfig> {
    if ip.is_none() && mac.is_none() && port.is_none() && interface.is_none() {
        return None;
    }
    Some(HostConfig {
        ip: ip.clone(),
        mac: mac.clone(),
        port,
        interface: interface.clone(),
    })
}

impl TemplateArgs {
    /// The profile made of the command line options only
    pub fn to_profile(&self) -> Profile {
        Profile {
            interface: self.interface.clone(),
            packet_count: self.packet_count,
            seed: self.seed,
            seed_policy: self.seed_policy,
            packets_per_seed: self.packets_per_seed,
            target: host_config(
                &self.target_ip,
                &self.target_mac,
                self.target_port,
                &self.target_interface,
            ),
            source: host_config(
                &self.source_ip,
                &self.source_mac,
                self.source_port,
                &self.source_interface,
            ),
            details: Some(DetailsConfig {
                internet_protocol: self.int_protocol,
                transport_protocol: self.trans_protocol,
                cast: self.cast,
                vlan: self.vlan.then_some(true),
                randomize_headers: self.no_headers.then_some(false),
                min_length: self.min_length,
                max_length: self.max_length,
            }),
            hosts: vec![],
        }
    }
}
