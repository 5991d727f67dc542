//! The ticket source boundary: the data model for issues and work logs, and
//! the async traits a concrete tracker backend implements.

pub mod jira;
#[cfg(test)]
pub(crate) mod mock;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use crate::error::Result;

/// One issue summary from a search, in the order the source returned it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueSummary {
    pub key: String,
}

/// A fully fetched issue, including its work-log entries.
/// Read-only once it leaves the fetch pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchedIssue {
    pub key: String,
    pub summary: String,
    pub assignee: Option<String>,
    pub worklogs: Vec<WorkLogEntry>,
}

/// A timestamped record of time spent by one author on one issue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkLogEntry {
    pub id: String,
    /// Author identifier as the tracker knows it, e.g. `jane.smith`.
    pub author: String,
    /// Start instant in the offset the tracker encoded. Kept as-is; report
    /// dates render in this offset.
    pub started: DateTime<FixedOffset>,
    pub time_spent_seconds: i64,
}

/// A connectable ticket tracker. Each fetch worker calls [`connect`] once to
/// obtain its own exclusive session.
///
/// [`connect`]: TicketSource::connect
#[async_trait]
pub trait TicketSource: Send + Sync + 'static {
    type Session: TicketSession;

    /// Authenticate and open a session.
    async fn connect(&self) -> Result<Self::Session>;
}

/// An authenticated session against a ticket tracker.
#[async_trait]
pub trait TicketSession: Send + Sync {
    /// Search issues matching a JQL expression, in tracker order.
    async fn search_issues(&self, jql: &str, max_results: u32) -> Result<Vec<IssueSummary>>;

    /// Fetch one issue with its work-log entries.
    async fn get_issue(&self, key: &str) -> Result<FetchedIssue>;
}
