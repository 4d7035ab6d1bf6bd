use crate::details::ResolvedDescriptor;
use crate::error::Result;
use crate::hosts::Endpoint;
use crate::network::Transmitter;
use crate::packet::Packet;
use crate::structs::format_mac;

use pcap_file::pcap::{PcapPacket, PcapWriter};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::time::Duration;

/// Gap between the timestamps of two consecutive packets of a pcap export
pub const PACKET_INTERVAL: Duration = Duration::from_millis(1);

/// Writes the packets into a pcap stream. The timestamps start at `start` and grow by one
/// millisecond per packet, so that the same campaign always yields the same file.
pub struct PcapSink<W: Write> {
    writer: PcapWriter<W>,
    timestamp: Duration,
    count: usize,
}

impl PcapSink<BufWriter<File>> {
    pub fn create(outfile: &str, start: Duration) -> Result<Self> {
        let file_out = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(outfile)?;
        log::trace!("Saving into {outfile}");
        PcapSink::new(BufWriter::new(file_out), start)
    }
}

impl<W: Write> PcapSink<W> {
    pub fn new(writer: W, start: Duration) -> Result<Self> {
        Ok(PcapSink {
            writer: PcapWriter::new(writer)?,
            timestamp: start,
            count: 0,
        })
    }

    /// Write raw frame bytes with the next timestamp
    pub fn write_frame(&mut self, data: &[u8]) -> Result<()> {
        self.writer
            .write_packet(&PcapPacket::new(self.timestamp, data.len() as u32, data))?;
        self.timestamp += PACKET_INTERVAL;
        self.count += 1;
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Flush and give back the underlying writer
    pub fn finish(self) -> Result<W> {
        let mut writer = self.writer.into_writer();
        writer.flush()?;
        Ok(writer)
    }
}

impl<W: Write> Transmitter for PcapSink<W> {
    fn transmit(&mut self, packet: &Packet, _interface: &str) -> Result<()> {
        let data = packet.to_bytes()?;
        self.write_frame(&data)
    }
}

#[derive(Serialize)]
struct EndpointRecord {
    ip: String,
    mac: String,
    port: u16,
}

impl From<&Endpoint> for EndpointRecord {
    fn from(e: &Endpoint) -> Self {
        EndpointRecord {
            ip: e.ip.to_string(),
            mac: format_mac(&e.mac),
            port: e.port,
        }
    }
}

#[derive(Serialize)]
struct PacketRecord<'a> {
    index: usize,
    interface: &'a str,
    length: usize,
    target: EndpointRecord,
    source: EndpointRecord,
    descriptor: &'a ResolvedDescriptor,
}

/// Writes one JSON object per packet: its endpoints, its descriptor and its frame length
pub struct JsonLinesSink<W: Write> {
    writer: W,
    count: usize,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        JsonLinesSink { writer, count: 0 }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W: Write> Transmitter for JsonLinesSink<W> {
    fn transmit(&mut self, packet: &Packet, interface: &str) -> Result<()> {
        let record = PacketRecord {
            index: self.count,
            interface,
            length: packet.len(),
            target: packet.target().into(),
            source: packet.source().into(),
            descriptor: packet.descriptor(),
        };
        serde_json::to_writer(&mut self.writer, &record)?;
        self.writer.write_all(b"\n")?;
        self.count += 1;
        Ok(())
    }
}
