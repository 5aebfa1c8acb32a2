use std::fmt;
use std::time::Duration;

use crate::worker::ResultRecord;

// Import logger macros from crate root
use crate::{log_debug, log_info};

/// Run totals; only the aggregator writes to it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub total_requests: u64,
    pub total_errors: u64,
    pub total_bytes: u64,
    /// Sum of successful request durations
    pub total_duration_seconds: f64,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: &ResultRecord) {
        self.total_requests += 1;
        if record.error.is_some() {
            self.total_errors += 1;
        } else {
            self.total_bytes += record.bytes_read;
            self.total_duration_seconds += record.duration.as_secs_f64();
        }
    }

    pub fn successes(&self) -> u64 {
        self.total_requests - self.total_errors
    }

    /// Mean latency of successful requests
    pub fn mean_latency(&self) -> Option<Duration> {
        match self.successes() {
            0 => None,
            n => Some(Duration::from_secs_f64(self.total_duration_seconds / n as f64)),
        }
    }

    pub fn requests_per_second(&self, elapsed: Duration) -> f64 {
        let secs = elapsed.as_secs_f64();
        if secs > 0.0 {
            self.total_requests as f64 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} requests {} errors {} bytes {:.6} seconds",
            self.total_requests, self.total_errors, self.total_bytes, self.total_duration_seconds
        )
    }
}

pub struct StatsHandler;

impl StatsHandler {
    /// Print the summary line to stdout and the breakdown to the log
    pub fn print_final_stats(summary: &RunSummary, elapsed: Duration) {
        println!("{summary}");

        log_info!("📊 Final Statistics:");
        log_info!("  Total requests: {}", summary.total_requests);
        log_info!("  Successful: {}", summary.successes());
        log_info!("  Failed: {}", summary.total_errors);
        log_info!("  Wall time: {:.3}s", elapsed.as_secs_f64());
        log_info!(
            "  Throughput: {:.2} req/s",
            summary.requests_per_second(elapsed)
        );
        if let Some(mean) = summary.mean_latency() {
            log_debug!("  Mean latency: {:.2}ms", mean.as_secs_f64() * 1000.0);
        }
    }
}
