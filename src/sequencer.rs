use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Result;
use crate::url_randomizer::UrlRandomizer;

// Import logger macros from crate root
use crate::{log_debug, log_error, log_info, log_trace};

/// One rendered URL, executed by exactly one worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Dispatch order, starting at 1
    pub seq: u64,
    pub url: Url,
}

/// Single-pass job producer, cycling through the templates
pub struct JobSequencer {
    randomizer: UrlRandomizer,
    templates: Vec<String>,
    request_count: u64,
    produced: u64,
    cancel: CancellationToken,
    failed: bool,
}

impl JobSequencer {
    pub fn new(
        request_count: u64,
        templates: Vec<String>,
        randomizer: UrlRandomizer,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            randomizer,
            templates,
            request_count,
            produced: 0,
            cancel,
            failed: false,
        }
    }

    /// Fill `queue` and return the dispatched count; dropping the sender ends the run
    pub async fn feed(mut self, queue: flume::Sender<Job>) -> Result<u64> {
        let cancel = self.cancel.clone();
        let mut dispatched = 0u64;

        while let Some(next) = self.next() {
            let job = match next {
                Ok(job) => job,
                Err(e) => {
                    log_error!("Aborting dispatch after {} jobs: {}", dispatched, e);
                    return Err(e);
                }
            };
            log_trace!("Dispatching job {}: {}", job.seq, job.url);

            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                sent = queue.send_async(job) => {
                    if sent.is_err() {
                        log_debug!("Job queue closed, sequencer stopping");
                        break;
                    }
                    dispatched += 1;
                }
            }
        }

        if cancel.is_cancelled() {
            log_info!("Dispatch cancelled after {} of {} jobs", dispatched, self.request_count);
        } else {
            log_debug!("Sequencer finished: {} jobs dispatched", dispatched);
        }
        Ok(dispatched)
    }
}

impl Iterator for JobSequencer {
    type Item = Result<Job>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.produced >= self.request_count || self.cancel.is_cancelled() {
            return None;
        }

        let index = (self.produced % self.templates.len() as u64) as usize;
        match self.randomizer.render(&self.templates[index]) {
            Ok(url) => {
                self.produced += 1;
                Some(Ok(Job {
                    seq: self.produced,
                    url,
                }))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
