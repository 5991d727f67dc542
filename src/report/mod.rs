//! Aggregation of fetched issues into time-tracking report rows, and the
//! stable orderings the report endpoints expose.

use chrono::Datelike;
use serde::Serialize;

use crate::source::FetchedIssue;
use crate::url::{ticket_url, worklog_url};

/// One line of a time-tracking report: one surviving work-log entry.
/// Immutable once created; only its position changes when sorting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    /// Ticket title.
    pub ticket: String,
    pub ticket_url: String,
    /// Author display name, e.g. `JohnDoe` for `john_doe.contractor`.
    pub user: String,
    /// Calendar date as `day/month/year`, in the offset the tracker encoded.
    pub date: String,
    /// Unix timestamp of the work-log start instant.
    pub timestamp: i64,
    /// Time spent, in fractional hours.
    pub duration: f64,
    pub worklog_url: String,
    pub worklog_id: String,
}

/// Expand fetched issues into report rows, one per work-log entry.
///
/// A non-empty `user_filter` keeps only entries whose author identifier
/// matches it exactly. Issues with no work-log data contribute zero rows and
/// one diagnostic naming the issue and its assignee.
pub fn aggregate(
    issues: &[FetchedIssue],
    endpoint: &str,
    user_filter: Option<&str>,
) -> Vec<ReportRow> {
    let filter = user_filter.filter(|user| !user.is_empty());
    let mut rows = Vec::new();

    for issue in issues {
        if issue.worklogs.is_empty() {
            log::warn!(
                "Issue {} assigned to {} doesn't have any work logged!",
                issue.key,
                issue.assignee.as_deref().unwrap_or("nobody")
            );
            continue;
        }

        for entry in &issue.worklogs {
            if let Some(user) = filter {
                if entry.author != user {
                    continue;
                }
            }

            rows.push(ReportRow {
                ticket: issue.summary.clone(),
                ticket_url: ticket_url(endpoint, &issue.key),
                user: display_name(&entry.author),
                date: format!(
                    "{}/{:02}/{}",
                    entry.started.day(),
                    entry.started.month(),
                    entry.started.year()
                ),
                timestamp: entry.started.timestamp(),
                duration: entry.time_spent_seconds as f64 / 3600.0,
                worklog_url: worklog_url(endpoint, &issue.key, &entry.id),
                worklog_id: entry.id.clone(),
            });
        }
    }

    log::info!("There are {} timetracking rows generated", rows.len());
    rows
}

/// Oldest first. Stable: rows with equal timestamps keep aggregation order.
pub fn sort_chronological(rows: &mut [ReportRow]) {
    rows.sort_by_key(|row| row.timestamp);
}

/// Most recent first. Stable, like [`sort_chronological`].
pub fn sort_most_recent_first(rows: &mut [ReportRow]) {
    rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

/// Derive a display name from an author identifier: the part before the
/// first `.`, converted from snake_case to CamelCase. Identifiers without a
/// `.` are converted whole.
pub fn display_name(author: &str) -> String {
    let base = author.split('.').next().unwrap_or(author);
    base.split('_').map(capitalize).collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
