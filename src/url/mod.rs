//! Pure construction of JIRA browse URLs. No network access.

/// Build the browse URL for a ticket.
pub fn ticket_url(endpoint: &str, ticket_key: &str) -> String {
    format!("{}/browse/{ticket_key}", endpoint.trim_end_matches('/'))
}

/// Build a permanent URL focusing one work-log entry on a ticket's
/// work-log tab.
pub fn worklog_url(endpoint: &str, ticket_key: &str, worklog_id: &str) -> String {
    format!(
        "{}/browse/{ticket_key}?focusedWorklogId={worklog_id}&page=com.atlassian.jira.plugin.system.issuetabpanels%3Aworklog-tabpanel#worklog-{worklog_id}",
        endpoint.trim_end_matches('/')
    )
}
