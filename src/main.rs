use netfuzz::config::{self, Profile, TemplateRecord};
use netfuzz::export::{JsonLinesSink, PcapSink};
use netfuzz::network::{StaticNetwork, Transmitter};
use netfuzz::packet::Packet;
use netfuzz::run::{Campaign, Summary};
use netfuzz::stats::{self, Stats};
mod cmd;

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Context};
use clap::Parser;
use crossbeam_channel::{bounded, Sender};

const CHANNEL_SIZE: usize = 50;

/// Hands each packet to the writer thread
struct ChannelTransmitter {
    tx: Sender<Packet>,
}

impl Transmitter for ChannelTransmitter {
    fn transmit(&mut self, packet: &Packet, _interface: &str) -> netfuzz::Result<()> {
        self.tx
            .send(packet.clone())
            .map_err(|_| netfuzz::Error::Export("the writer thread has stopped".to_string()))
    }
}

fn load_record(template: &cmd::TemplateArgs) -> anyhow::Result<(TemplateRecord, StaticNetwork)> {
    let profile = match &template.profile {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Cannot read the profile {path}"))?;
            config::import_profile(&content).with_context(|| format!("Invalid profile {path}"))?
        }
        None => Profile::default(),
    };
    let profile = profile.override_with(template.to_profile());
    let network = profile.network()?;
    let record = profile.to_record()?;
    Ok((record, network))
}

/// Run the campaign in the main thread while the sink is fed by a writer thread.
/// Returns the summary and the sink once every packet has been written.
fn run<S: Transmitter + Send + 'static>(
    record: TemplateRecord,
    network: StaticNetwork,
    mut sink: S,
) -> anyhow::Result<(Summary, S)> {
    let running = Arc::new(AtomicBool::new(true));
    let stats = Arc::new(Stats::new(record.packet_count as u64));

    // Handle ctrl+C
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || {
            log::warn!("Stopping the generation, please wait");
            running.store(false, Ordering::Relaxed);
        })
        .context("Cannot set the Ctrl-C handler")?;
    }

    let monitor = {
        let stats = Arc::clone(&stats);
        thread::Builder::new()
            .name("Monitor".to_string())
            .spawn(move || stats::run_monitor(stats))?
    };

    let (tx, rx) = bounded::<Packet>(CHANNEL_SIZE);
    let writer = {
        let stats = Arc::clone(&stats);
        let interface = record.interface.clone();
        thread::Builder::new()
            .name("Writer".to_string())
            .spawn(move || -> netfuzz::Result<S> {
                log::trace!("Start writer thread");
                for packet in rx {
                    if let Err(e) = sink.transmit(&packet, &interface) {
                        log::error!("Cannot write packet: {e}");
                        return Err(e);
                    }
                    stats.increase(packet.len());
                }
                Ok(sink)
            })?
    };

    let result = {
        let mut transmitter = ChannelTransmitter { tx };
        Campaign::new(record).run(&network, &network, &mut transmitter, &running)
    };

    let sink = writer
        .join()
        .map_err(|_| anyhow!("The writer thread panicked"))?
        .context("Export failed")?;
    stats.finish();
    monitor
        .join()
        .map_err(|_| anyhow!("The monitor thread panicked"))?;
    let summary = result.context("Generation failed")?;
    Ok((summary, sink))
}

fn log_summary(summary: &Summary) {
    log::info!(
        "Generated {} packets ({} bytes) in {} sessions",
        summary.packets,
        summary.bytes,
        summary.sessions
    );
    match serde_json::to_string(summary) {
        Ok(s) => log::debug!("Summary: {s}"),
        Err(e) => log::warn!("Cannot serialize the summary: {e}"),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = cmd::Args::parse();

    match args.command {
        cmd::Command::CreatePcap {
            outfile,
            start_time,
            template,
        } => {
            let (record, network) = load_record(&template)?;
            let start = match start_time {
                Some(s) => Duration::from_secs(s),
                None => SystemTime::now().duration_since(UNIX_EPOCH)?,
            };
            let sink = PcapSink::create(&outfile, start)
                .with_context(|| format!("Cannot create {outfile}"))?;
            let (summary, sink) = run(record, network, sink)?;
            log::info!("{} packets saved into {outfile}", sink.count());
            sink.finish()?;
            log_summary(&summary);
        }
        cmd::Command::Describe { outfile, template } => {
            let (record, network) = load_record(&template)?;
            let writer: Box<dyn Write + Send> = match &outfile {
                Some(path) => Box::new(
                    File::create(path).with_context(|| format!("Cannot create {path}"))?,
                ),
                None => Box::new(io::stdout()),
            };
            let sink = JsonLinesSink::new(BufWriter::new(writer));
            let (summary, sink) = run(record, network, sink)?;
            sink.finish()?;
            log_summary(&summary);
        }
    };
    Ok(())
}
