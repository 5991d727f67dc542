//! In-memory ticket source used by pipeline and entry-point tests.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;

use crate::error::{Error, Result};
use crate::source::{FetchedIssue, IssueSummary, TicketSession, TicketSource, WorkLogEntry};

/// Build a test issue. Each work log is `(author, started, seconds)` with
/// `started` in RFC 3339 form; ids are assigned sequentially from 1.
pub(crate) fn issue_with_worklogs(key: &str, worklogs: &[(&str, &str, i64)]) -> FetchedIssue {
    let worklogs = worklogs
        .iter()
        .enumerate()
        .map(|(i, (author, started, seconds))| WorkLogEntry {
            id: (i + 1).to_string(),
            author: (*author).to_string(),
            started: DateTime::parse_from_rfc3339(started).unwrap(),
            time_spent_seconds: *seconds,
        })
        .collect();
    FetchedIssue {
        key: key.to_string(),
        summary: format!("Summary of {key}"),
        assignee: Some("jane.smith".to_string()),
        worklogs,
    }
}

pub(crate) struct MockSource {
    issues: Vec<FetchedIssue>,
    fail_keys: HashSet<String>,
    delays: HashMap<String, Duration>,
    fail_auth: bool,
}

impl MockSource {
    pub fn new(issues: Vec<FetchedIssue>) -> Self {
        Self {
            issues,
            fail_keys: HashSet::new(),
            delays: HashMap::new(),
            fail_auth: false,
        }
    }

    /// Make every `get_issue` for `key` fail.
    pub fn failing_on(mut self, key: &str) -> Self {
        self.fail_keys.insert(key.to_string());
        self
    }

    /// Make every `get_issue` for `key` take at least `delay`, so tests can
    /// force completions to arrive out of schedule order.
    pub fn delayed_on(mut self, key: &str, delay: Duration) -> Self {
        self.delays.insert(key.to_string(), delay);
        self
    }

    /// Make every `connect` fail.
    pub fn failing_auth(mut self) -> Self {
        self.fail_auth = true;
        self
    }
}

#[async_trait]
impl TicketSource for MockSource {
    type Session = MockSession;

    async fn connect(&self) -> Result<MockSession> {
        if self.fail_auth {
            return Err(Error::Authentication {
                endpoint: "mock".to_string(),
                message: "credentials rejected".to_string(),
            });
        }
        Ok(MockSession {
            issues: self.issues.clone(),
            fail_keys: self.fail_keys.clone(),
            delays: self.delays.clone(),
        })
    }
}

pub(crate) struct MockSession {
    issues: Vec<FetchedIssue>,
    fail_keys: HashSet<String>,
    delays: HashMap<String, Duration>,
}

#[async_trait]
impl TicketSession for MockSession {
    async fn search_issues(&self, _jql: &str, max_results: u32) -> Result<Vec<IssueSummary>> {
        Ok(self
            .issues
            .iter()
            .take(max_results as usize)
            .map(|issue| IssueSummary {
                key: issue.key.clone(),
            })
            .collect())
    }

    async fn get_issue(&self, key: &str) -> Result<FetchedIssue> {
        if let Some(delay) = self.delays.get(key) {
            tokio::time::sleep(*delay).await;
        }
        if self.fail_keys.contains(key) {
            return Err(Error::Fetch {
                key: key.to_string(),
                message: "simulated fetch failure".to_string(),
            });
        }
        self.issues
            .iter()
            .find(|issue| issue.key == key)
            .cloned()
            .ok_or_else(|| Error::Fetch {
                key: key.to_string(),
                message: "issue does not exist".to_string(),
            })
    }
}
