//! Worker pool: dequeue -> execute -> report -> repeat
//!
//! Workers pull from a shared multi-consumer queue, so a job is handed to
//! exactly one worker and idle workers wait in parallel. A worker never retries; each job yields exactly one
//! [`ResultRecord`], whatever the outcome. Workers exit once the queue is
//! closed and drained, or once nobody is listening for results.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use url::Url;

use crate::config::{Method, RunConfig};
use crate::error::RequestError;
use crate::http_client::{HttpExecutor, HttpRequest};
use crate::sequencer::Job;

// Import logger macros from crate root
use crate::{log_debug, log_trace};

/// Job queue; each worker holds its own clone of the receiver
pub type JobQueue = flume::Receiver<Job>;

/// Outcome of one job; never mutated after it is sent
#[derive(Debug, Clone)]
pub struct ResultRecord {
    pub seq: u64,
    pub url: Url,
    pub duration: Duration,
    pub bytes_read: u64,
    pub error: Option<RequestError>,
}

impl ResultRecord {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Method, headers and body shared by every request of a run
#[derive(Debug, Clone)]
pub struct RequestParts {
    pub method: Method,
    pub headers: HashMap<String, String>,
    pub body: Option<Vec<u8>>,
}

impl From<&RunConfig> for RequestParts {
    fn from(config: &RunConfig) -> Self {
        Self {
            method: config.method,
            headers: config.headers.clone(),
            body: config.body.clone(),
        }
    }
}

async fn perform(
    executor: &dyn HttpExecutor,
    parts: &RequestParts,
    url: &Url,
) -> Result<u64, RequestError> {
    let response = executor
        .execute(HttpRequest {
            method: parts.method,
            url,
            headers: &parts.headers,
            body: parts.body.as_deref(),
        })
        .await?;

    if !response.is_success() {
        return Err(RequestError::HttpStatus(response.status));
    }
    response.body.read_all().await
}

/// Execute one job and classify the outcome.
///
/// The duration covers sending the request through reading the full body.
pub async fn execute_job(
    executor: &dyn HttpExecutor,
    parts: &RequestParts,
    job: Job,
) -> ResultRecord {
    let start = Instant::now();
    let outcome = perform(executor, parts, &job.url).await;
    let duration = start.elapsed();

    let (bytes_read, error) = match outcome {
        Ok(bytes) => (bytes, None),
        Err(e) => (0, Some(e)),
    };
    ResultRecord {
        seq: job.seq,
        url: job.url,
        duration,
        bytes_read,
        error,
    }
}

pub struct Worker {
    id: usize,
    executor: Arc<dyn HttpExecutor>,
    parts: Arc<RequestParts>,
    jobs: JobQueue,
    results: mpsc::Sender<ResultRecord>,
}

impl Worker {
    pub fn new(
        id: usize,
        executor: Arc<dyn HttpExecutor>,
        parts: Arc<RequestParts>,
        jobs: JobQueue,
        results: mpsc::Sender<ResultRecord>,
    ) -> Self {
        Self {
            id,
            executor,
            parts,
            jobs,
            results,
        }
    }

    /// Run until the queue is exhausted. Returns the number of jobs executed.
    pub async fn run(self) -> u64 {
        let mut executed = 0u64;
        log_debug!("Worker {} started", self.id);

        loop {
            // Err once every sender is gone and the queue is drained
            let Ok(job) = self.jobs.recv_async().await else {
                break;
            };

            log_trace!("Worker {} took job {}", self.id, job.seq);
            let record = execute_job(self.executor.as_ref(), &self.parts, job).await;
            executed += 1;

            if self.results.send(record).await.is_err() {
                log_debug!("Worker {}: result channel closed, stopping", self.id);
                break;
            }
        }

        log_debug!("Worker {} finished after {} jobs", self.id, executed);
        executed
    }
}
