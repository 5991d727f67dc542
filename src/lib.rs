pub mod error;
pub mod fetch;
pub mod jql;
pub mod report;
pub mod source;
pub mod url;

pub use error::{Error, Result};
pub use fetch::{FetchFailure, FetchOutcome, FetchReport, PoolOptions, WorkerPool};
pub use jql::Jql;
pub use report::ReportRow;
pub use source::jira::JiraSource;
pub use source::{FetchedIssue, IssueSummary, TicketSession, TicketSource, WorkLogEntry};

use std::sync::Arc;

/// Options for a [`Timekeeper`] instance.
#[derive(Debug, Clone)]
pub struct TimekeeperOptions {
    /// Maximum issues returned by one search call. No further pagination is
    /// performed.
    pub max_results: u32,
    pub pool: PoolOptions,
}

impl Default for TimekeeperOptions {
    fn default() -> Self {
        Self {
            max_results: 100,
            pool: PoolOptions::default(),
        }
    }
}

/// Parameters for one report request. All fields are optional; see the
/// entry points for how each one defaults.
#[derive(Debug, Clone, Default)]
pub struct ReportParams {
    /// Project key to filter on.
    pub project: Option<String>,
    /// Sprint name; absent means the currently open sprints.
    pub sprint: Option<String>,
    /// Exact author identifier to keep; absent keeps every author.
    pub user: Option<String>,
    /// Staleness window as a tracker date expression (e.g. `-7d`); absent
    /// means the last 30 days.
    pub updated_since: Option<String>,
}

/// Main entry point: owns the shared fetch worker pool and produces
/// time-tracking reports. Safe to call concurrently from multiple tasks;
/// each call schedules against the shared pool but collects on its own
/// channel.
pub struct Timekeeper<S: TicketSource> {
    source: Arc<S>,
    endpoint: String,
    pool: WorkerPool,
    max_results: u32,
}

impl<S: TicketSource> Timekeeper<S> {
    /// Create a `Timekeeper` and start its worker pool. `endpoint` is the
    /// tracker's browse URL base used for row links.
    pub fn new(source: Arc<S>, endpoint: &str, options: &TimekeeperOptions) -> Self {
        let pool = WorkerPool::start(Arc::clone(&source), &options.pool);
        Self {
            source,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            pool,
            max_results: options.max_results,
        }
    }

    /// Time spent per work-log entry for a project/sprint, oldest first.
    ///
    /// Issues that cannot be fetched are logged and simply contribute no
    /// rows; the returned report does not indicate that rows are missing.
    pub async fn time_tracking(&self, params: &ReportParams) -> Result<Vec<ReportRow>> {
        let mut jql = Jql::sprint(params.sprint.as_deref());
        if let Some(project) = params.project.as_deref().filter(|p| !p.is_empty()) {
            jql = Jql::project(project).and(jql);
        }

        let mut rows = self.run_report(&jql, params.user.as_deref()).await?;
        report::sort_chronological(&mut rows);
        Ok(rows)
    }

    /// Work logged on recently updated issues, most recent first. The
    /// staleness window defaults to the last 30 days.
    ///
    /// Shares the silent-partial-result behavior of [`time_tracking`].
    ///
    /// [`time_tracking`]: Timekeeper::time_tracking
    pub async fn recent_activity(&self, params: &ReportParams) -> Result<Vec<ReportRow>> {
        let mut jql = Jql::updated_since(params.updated_since.as_deref());
        if let Some(project) = params.project.as_deref().filter(|p| !p.is_empty()) {
            jql = Jql::project(project).and(jql);
        }
        let jql = jql.order_by_updated_desc();

        let mut rows = self.run_report(&jql, params.user.as_deref()).await?;
        report::sort_most_recent_first(&mut rows);
        Ok(rows)
    }

    async fn run_report(&self, jql: &Jql, user_filter: Option<&str>) -> Result<Vec<ReportRow>> {
        let summaries =
            fetch::search_issues(self.source.as_ref(), &jql.render(), self.max_results).await?;
        let keys: Vec<String> = summaries.into_iter().map(|summary| summary.key).collect();
        let scheduled = keys.len();

        let fetched = self.pool.fetch_issues(keys).await;
        if !fetched.failures.is_empty() {
            log::warn!(
                "{} of {scheduled} issues could not be fetched; the report is incomplete",
                fetched.failures.len()
            );
        }

        Ok(report::aggregate(
            &fetched.issues,
            &self.endpoint,
            user_filter,
        ))
    }

    /// Stop the worker pool and wait for the workers to exit.
    pub async fn shutdown(self) {
        self.pool.shutdown().await;
    }
}
