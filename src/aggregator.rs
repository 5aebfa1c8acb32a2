//! Result aggregation from the worker pool

use tokio::sync::mpsc;

use crate::stats::RunSummary;
use crate::worker::ResultRecord;

// Import logger macros from crate root
use crate::{log_debug, log_error};

/// Consume result records until `request_count` have arrived.
///
/// Stops early when the channel closes: every worker has exited, so no
/// further results can arrive (dispatch was cut short by cancellation or a
/// template error). Records arrive in completion order, not dispatch order.
pub async fn collect(mut results: mpsc::Receiver<ResultRecord>, request_count: u64) -> RunSummary {
    let mut summary = RunSummary::new();

    while summary.total_requests < request_count {
        let Some(record) = results.recv().await else {
            log_debug!(
                "Result channel closed after {} of {} results",
                summary.total_requests,
                request_count
            );
            break;
        };

        match &record.error {
            Some(e) => log_error!("{} (job {}): {}", record.url, record.seq, e),
            None => log_debug!("finished: {} {}", record.url, record.bytes_read),
        }
        summary.record(&record);
    }

    summary
}
