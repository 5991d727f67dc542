//! Concurrent ticket-detail fetch pipeline.
//!
//! A fixed set of long-lived workers consumes [`FetchJob`]s from one shared
//! bounded queue. Each worker authenticates once against the ticket source
//! and owns its session exclusively. Every job produces exactly one
//! [`FetchOutcome`] on the job's own result channel, success or failure, so
//! the collector can count completions instead of assuming every fetch
//! succeeds.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::source::{FetchedIssue, TicketSession, TicketSource};

/// A job to fetch one ticket, consumed exactly once by exactly one worker.
#[derive(Debug)]
pub struct FetchJob {
    pub key: String,
    /// Per-report-call result channel the outcome must be delivered on.
    pub responses: mpsc::Sender<FetchOutcome>,
}

/// Completion signal for one job.
#[derive(Debug)]
pub enum FetchOutcome {
    Fetched(Box<FetchedIssue>),
    Failed(FetchFailure),
}

impl FetchOutcome {
    pub fn key(&self) -> &str {
        match self {
            FetchOutcome::Fetched(issue) => &issue.key,
            FetchOutcome::Failed(failure) => &failure.key,
        }
    }
}

/// A fetch that did not produce an issue.
#[derive(Debug, Clone)]
pub struct FetchFailure {
    pub key: String,
    pub reason: String,
}

/// What came back for one batch of scheduled keys. Failures are reported,
/// never silently dropped.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub issues: Vec<FetchedIssue>,
    pub failures: Vec<FetchFailure>,
}

/// Pool sizing and deadlines.
#[derive(Debug, Clone)]
pub struct PoolOptions {
    /// Number of workers, each with its own ticket-source session.
    pub workers: usize,
    /// Job queue capacity. Defaults to the worker count.
    pub queue_capacity: Option<usize>,
    /// Deadline for a single issue fetch.
    pub fetch_timeout: Duration,
    /// How long the collector waits for any single completion before giving
    /// up on the remainder of a batch.
    pub collect_timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: None,
            fetch_timeout: Duration::from_secs(30),
            collect_timeout: Duration::from_secs(60),
        }
    }
}

/// A fixed pool of fetch workers sharing one bounded job queue.
///
/// Construct once and share by reference; concurrent report requests schedule
/// against the same workers but collect on per-call channels.
pub struct WorkerPool {
    inputs: async_channel::Sender<FetchJob>,
    collect_timeout: Duration,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Start `options.workers` workers. Workers authenticate lazily on their
    /// own tasks, so this returns immediately; a worker that fails
    /// authentication logs the error and exits without processing jobs.
    pub fn start<S: TicketSource>(source: Arc<S>, options: &PoolOptions) -> Self {
        let workers = options.workers.max(1);
        let capacity = options.queue_capacity.unwrap_or(workers).max(1);
        let (inputs, jobs) = async_channel::bounded::<FetchJob>(capacity);

        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let source = Arc::clone(&source);
            let jobs = jobs.clone();
            let fetch_timeout = options.fetch_timeout;
            handles.push(tokio::spawn(async move {
                worker_loop(id, source, jobs, fetch_timeout).await;
            }));
        }

        Self {
            inputs,
            collect_timeout: options.collect_timeout,
            handles,
        }
    }

    /// Fetch full details for every key: schedule one job per key in input
    /// order, then collect exactly as many completions as jobs scheduled.
    ///
    /// Scheduling runs on its own task so a full job queue can never
    /// deadlock against the collector. Completions arrive in whatever order
    /// the workers finish; callers that care about order sort afterwards.
    pub async fn fetch_issues(&self, keys: Vec<String>) -> FetchReport {
        let expected = keys.len();
        let mut report = FetchReport::default();
        if expected == 0 {
            return report;
        }

        let (responses, mut outcomes) = mpsc::channel::<FetchOutcome>(expected);
        let mut pending = keys.clone();
        let search_order: std::collections::HashMap<String, usize> = keys
            .iter()
            .enumerate()
            .map(|(position, key)| (key.clone(), position))
            .collect();

        let inputs = self.inputs.clone();
        tokio::spawn(async move {
            for key in keys {
                let job = FetchJob {
                    key,
                    responses: responses.clone(),
                };
                if inputs.send(job).await.is_err() {
                    log::debug!("Worker pool is shut down, dropping remaining jobs");
                    break;
                }
            }
        });

        for _ in 0..expected {
            match tokio::time::timeout(self.collect_timeout, outcomes.recv()).await {
                Ok(Some(outcome)) => {
                    if let Some(pos) = pending.iter().position(|key| key == outcome.key()) {
                        pending.remove(pos);
                    }
                    match outcome {
                        FetchOutcome::Fetched(issue) => report.issues.push(*issue),
                        FetchOutcome::Failed(failure) => {
                            log::warn!(
                                "Fetch of {} failed; report will be missing its rows: {}",
                                failure.key,
                                failure.reason
                            );
                            report.failures.push(failure);
                        }
                    }
                }
                Ok(None) => {
                    log::warn!("Result channel closed before all completions arrived");
                    break;
                }
                Err(_) => {
                    log::warn!(
                        "Gave up waiting for fetch completions after {:?}",
                        self.collect_timeout
                    );
                    break;
                }
            }
        }

        // Anything still pending never produced a completion (collector
        // timeout or pool shutdown). Account for it explicitly.
        for key in pending {
            report.failures.push(FetchFailure {
                key,
                reason: "no completion received before the collect deadline".to_string(),
            });
        }

        // Completions arrive in worker-finish order. Restore search order so
        // rows with equal timestamps sort deterministically downstream:
        // search order across issues, work-log order within an issue.
        report.issues.sort_by_key(|issue| {
            search_order
                .get(&issue.key)
                .copied()
                .unwrap_or(usize::MAX)
        });

        report
    }

    /// Close the job queue and wait for every worker to exit. Only needed
    /// for orderly teardown; dropping the pool also stops the workers once
    /// the queue drains.
    pub async fn shutdown(self) {
        self.inputs.close();
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

async fn worker_loop<S: TicketSource>(
    id: usize,
    source: Arc<S>,
    jobs: async_channel::Receiver<FetchJob>,
    fetch_timeout: Duration,
) {
    log::info!("Fetch worker {id} starting");

    // One-time authentication; a failure here is fatal to this worker.
    let session = match source.connect().await {
        Ok(session) => session,
        Err(e) => {
            log::error!("Fetch worker {id} could not connect: {e}");
            return;
        }
    };

    while let Ok(job) = jobs.recv().await {
        log::debug!("Fetch worker {id} processing {}", job.key);

        let outcome = match tokio::time::timeout(fetch_timeout, session.get_issue(&job.key)).await
        {
            Ok(Ok(issue)) => FetchOutcome::Fetched(Box::new(issue)),
            Ok(Err(e)) => FetchOutcome::Failed(FetchFailure {
                key: job.key.clone(),
                reason: e.to_string(),
            }),
            Err(_) => FetchOutcome::Failed(FetchFailure {
                key: job.key.clone(),
                reason: format!("fetch exceeded {fetch_timeout:?} deadline"),
            }),
        };

        if job.responses.send(outcome).await.is_err() {
            log::debug!("Fetch worker {id}: caller for {} went away", job.key);
        }
    }

    log::info!("Fetch worker {id} done");
}

/// Search for issues matching a JQL expression using a fresh session.
pub async fn search_issues<S: TicketSource>(
    source: &S,
    jql: &str,
    max_results: u32,
) -> Result<Vec<crate::source::IssueSummary>> {
    let session = source.connect().await?;
    let summaries = session.search_issues(jql, max_results).await?;
    log::info!(
        "There are {} issues selected by the query {jql}",
        summaries.len()
    );
    Ok(summaries)
}
