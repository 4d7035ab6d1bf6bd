use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Period of the throughput reports
pub const REPORT_PERIOD: Duration = Duration::from_secs(5);

const POLL_PERIOD: Duration = Duration::from_millis(100);

/// Counters shared between the generation thread and the monitor
pub struct Stats {
    pub start_time: Instant,
    pub packets_target: Option<u64>,
    pub packets_counter: AtomicU64,
    pub bytes_counter: AtomicU64,
    finished: AtomicBool,
}

impl Default for Stats {
    fn default() -> Self {
        Stats {
            start_time: Instant::now(),
            packets_target: None,
            packets_counter: AtomicU64::new(0),
            bytes_counter: AtomicU64::new(0),
            finished: AtomicBool::new(false),
        }
    }
}

impl Stats {
    pub fn new(packets_target: u64) -> Self {
        Stats {
            packets_target: Some(packets_target),
            ..Default::default()
        }
    }

    pub fn increase(&self, bytes: usize) {
        self.packets_counter.fetch_add(1, Ordering::Relaxed);
        self.bytes_counter
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn packets(&self) -> u64 {
        self.packets_counter.load(Ordering::Relaxed)
    }

    pub fn bytes(&self) -> u64 {
        self.bytes_counter.load(Ordering::Relaxed)
    }

    /// Bytes per second since the start
    pub fn throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.bytes() as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn finish(&self) {
        self.finished.store(true, Ordering::Relaxed);
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }

    fn report(&self) {
        match self.packets_target {
            Some(target) => log::info!(
                "Generated {}/{} packets ({:.0} B/s)",
                self.packets(),
                target,
                self.throughput()
            ),
            None => log::info!(
                "Generated {} packets ({:.0} B/s)",
                self.packets(),
                self.throughput()
            ),
        }
    }
}

/// Log the throughput every five seconds until the generation is finished
pub fn run_monitor(stats: Arc<Stats>) {
    log::trace!("Start monitor thread");
    let mut last_report = Instant::now();
    while !stats.is_finished() {
        thread::sleep(POLL_PERIOD);
        if last_report.elapsed() >= REPORT_PERIOD {
            stats.report();
            last_report = Instant::now();
        }
    }
    log::trace!("Monitor thread stopped");
}
