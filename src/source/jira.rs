//! JIRA REST implementation of the ticket source: session-cookie
//! authentication, JQL search, and issue-by-key fetch.

use async_trait::async_trait;
use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::source::{FetchedIssue, IssueSummary, TicketSession, TicketSource, WorkLogEntry};

/// Timestamp format JIRA uses for work-log start instants,
/// e.g. `2017-05-10T14:30:00.000+0200`.
const STARTED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

/// Issue fields requested on an issue-by-key fetch. Everything the
/// aggregation stage reads, nothing more.
const ISSUE_FIELDS: &str = "summary,assignee,worklog";

/// A JIRA server endpoint plus the credentials used to open sessions.
#[derive(Debug, Clone)]
pub struct JiraSource {
    endpoint: String,
    username: String,
    password: String,
}

impl JiraSource {
    /// Create a source for the given endpoint. Fails fast on an endpoint
    /// that is not a valid absolute URL.
    pub fn new(endpoint: &str, username: &str, password: &str) -> Result<Self> {
        url::Url::parse(endpoint)?;
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TicketSource for JiraSource {
    type Session = JiraSession;

    async fn connect(&self) -> Result<JiraSession> {
        // The session cookie issued here is carried by the client's cookie
        // store on every subsequent request.
        let client = reqwest::Client::builder().cookie_store(true).build()?;

        let response = client
            .post(format!("{}/rest/auth/1/session", self.endpoint))
            .json(&SessionRequest {
                username: &self.username,
                password: &self.password,
            })
            .send()
            .await
            .map_err(|e| Error::Authentication {
                endpoint: self.endpoint.clone(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            let message = if response.status() == reqwest::StatusCode::UNAUTHORIZED {
                "wrong username or associated password".to_string()
            } else {
                format!("unexpected status {}", response.status())
            };
            return Err(Error::Authentication {
                endpoint: self.endpoint.clone(),
                message,
            });
        }

        Ok(JiraSession {
            client,
            endpoint: self.endpoint.clone(),
        })
    }
}

/// An authenticated JIRA session. Owned exclusively by one worker or one
/// search call; never shared.
pub struct JiraSession {
    client: reqwest::Client,
    endpoint: String,
}

#[async_trait]
impl TicketSession for JiraSession {
    async fn search_issues(&self, jql: &str, max_results: u32) -> Result<Vec<IssueSummary>> {
        let response = self
            .client
            .get(format!("{}/rest/api/2/search", self.endpoint))
            .query(&[("jql", jql), ("maxResults", &max_results.to_string())])
            .send()
            .await
            .map_err(|e| Error::Search {
                jql: jql.to_string(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(Error::Search {
                jql: jql.to_string(),
                message: format!("unexpected status {}", response.status()),
            });
        }

        let body: SearchResponse = response.json().await.map_err(|e| Error::Search {
            jql: jql.to_string(),
            message: e.to_string(),
        })?;

        Ok(body
            .issues
            .into_iter()
            .map(|issue| IssueSummary { key: issue.key })
            .collect())
    }

    async fn get_issue(&self, key: &str) -> Result<FetchedIssue> {
        let response = self
            .client
            .get(format!("{}/rest/api/2/issue/{key}", self.endpoint))
            .query(&[("fields", ISSUE_FIELDS)])
            .send()
            .await
            .map_err(|e| Error::Fetch {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(Error::Fetch {
                key: key.to_string(),
                message: format!("unexpected status {}", response.status()),
            });
        }

        let raw: RawIssue = response.json().await.map_err(|e| Error::Fetch {
            key: key.to_string(),
            message: e.to_string(),
        })?;

        Ok(convert_issue(raw))
    }
}

// ── Wire format ────────────────────────────────────────────────

#[derive(Serialize)]
struct SessionRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<SearchIssue>,
}

#[derive(Debug, Deserialize)]
struct SearchIssue {
    key: String,
}

#[derive(Debug, Deserialize)]
struct RawIssue {
    key: String,
    fields: RawFields,
}

#[derive(Debug, Deserialize)]
struct RawFields {
    #[serde(default)]
    summary: String,
    assignee: Option<RawUser>,
    worklog: Option<RawWorklogContainer>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    #[serde(default)]
    name: String,
    #[serde(rename = "displayName")]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawWorklogContainer {
    #[serde(default)]
    worklogs: Vec<RawWorklog>,
}

#[derive(Debug, Deserialize)]
struct RawWorklog {
    id: String,
    author: RawUser,
    started: String,
    #[serde(rename = "timeSpentSeconds", default)]
    time_spent_seconds: i64,
}

fn convert_issue(raw: RawIssue) -> FetchedIssue {
    let assignee = raw.fields.assignee.map(|user| {
        user.display_name
            .filter(|name| !name.is_empty())
            .unwrap_or(user.name)
    });

    let mut worklogs = Vec::new();
    for entry in raw
        .fields
        .worklog
        .map(|container| container.worklogs)
        .unwrap_or_default()
    {
        match DateTime::parse_from_str(&entry.started, STARTED_FORMAT) {
            Ok(started) => worklogs.push(WorkLogEntry {
                id: entry.id,
                author: entry.author.name,
                started,
                time_spent_seconds: entry.time_spent_seconds,
            }),
            Err(e) => {
                log::warn!(
                    "Skipping worklog {} on {}: unparseable start '{}': {e}",
                    entry.id,
                    raw.key,
                    entry.started
                );
            }
        }
    }

    FetchedIssue {
        key: raw.key,
        summary: raw.fields.summary,
        assignee,
        worklogs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_new_rejects_invalid_endpoint() {
        assert!(JiraSource::new("not a url", "u", "p").is_err());
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let source = JiraSource::new("https://example.atlassian.net/", "u", "p").unwrap();
        assert_eq!(source.endpoint(), "https://example.atlassian.net");
    }

    #[test]
    fn test_deserialize_search_response() {
        let body = r#"{"startAt":0,"maxResults":100,"total":2,
            "issues":[{"key":"ABC-1"},{"key":"ABC-2"}]}"#;
        let parsed: SearchResponse = serde_json::from_str(body).unwrap();
        let keys: Vec<&str> = parsed.issues.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["ABC-1", "ABC-2"]);
    }

    #[test]
    fn test_convert_issue_with_worklogs() {
        let body = r#"{
            "key": "ABC-1",
            "fields": {
                "summary": "Fix the flux capacitor",
                "assignee": {"name": "jane.smith", "displayName": "Jane Smith"},
                "worklog": {
                    "worklogs": [
                        {"id": "10042",
                         "author": {"name": "jane.smith"},
                         "started": "2017-05-10T14:30:00.000+0200",
                         "timeSpentSeconds": 3600}
                    ]
                }
            }
        }"#;
        let raw: RawIssue = serde_json::from_str(body).unwrap();
        let issue = convert_issue(raw);
        assert_eq!(issue.key, "ABC-1");
        assert_eq!(issue.summary, "Fix the flux capacitor");
        assert_eq!(issue.assignee.as_deref(), Some("Jane Smith"));
        assert_eq!(issue.worklogs.len(), 1);
        let entry = &issue.worklogs[0];
        assert_eq!(entry.author, "jane.smith");
        assert_eq!(entry.time_spent_seconds, 3600);
        // Offset preserved, not normalized
        assert_eq!(entry.started.hour(), 14);
        assert_eq!(entry.started.offset().local_minus_utc(), 2 * 3600);
    }

    #[test]
    fn test_convert_issue_without_worklog_field() {
        let body = r#"{"key":"ABC-2","fields":{"summary":"No logs here","assignee":null}}"#;
        let raw: RawIssue = serde_json::from_str(body).unwrap();
        let issue = convert_issue(raw);
        assert!(issue.worklogs.is_empty());
        assert!(issue.assignee.is_none());
    }

    #[test]
    fn test_convert_issue_skips_unparseable_started() {
        let body = r#"{
            "key": "ABC-3",
            "fields": {
                "summary": "Bad clock",
                "worklog": {
                    "worklogs": [
                        {"id": "1", "author": {"name": "bob.jones"},
                         "started": "yesterday-ish", "timeSpentSeconds": 60},
                        {"id": "2", "author": {"name": "bob.jones"},
                         "started": "2017-05-10T09:00:00.000+0000", "timeSpentSeconds": 120}
                    ]
                }
            }
        }"#;
        let raw: RawIssue = serde_json::from_str(body).unwrap();
        let issue = convert_issue(raw);
        assert_eq!(issue.worklogs.len(), 1);
        assert_eq!(issue.worklogs[0].id, "2");
    }
}
