//! Opaque JQL filter expressions.
//!
//! Predicates are combined with [`Jql::and`] and only turned into a wire
//! string at [`Jql::render`], so quoting rules live in exactly one place.

use std::fmt;

/// A JQL filter expression, built from predicates and rendered once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Jql {
    clauses: Vec<Clause>,
    order_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Clause {
    /// An equality predicate whose value is quoted and escaped at render time.
    Equals { field: String, value: String },
    /// A pre-rendered fragment that needs no quoting (function calls,
    /// relative date expressions).
    Raw(String),
}

impl Jql {
    /// Filter on a sprint. An empty or absent name selects the currently
    /// open sprints, excluding sprints that have not started yet.
    pub fn sprint(sprint: Option<&str>) -> Self {
        match sprint {
            Some(name) if !name.is_empty() => Self::equals("sprint", name),
            _ => Self::raw("sprint in openSprints() AND sprint not in futureSprints()"),
        }
    }

    /// Equality filter on a project key.
    pub fn project(project: &str) -> Self {
        Self::equals("project", project)
    }

    /// Filter on last-update time. An empty or absent delay selects issues
    /// updated within the last 30 days; otherwise `delay` is a JIRA date
    /// expression (e.g. `-7d` or `2017-05-01`) passed through as-is.
    pub fn updated_since(delay: Option<&str>) -> Self {
        match delay {
            Some(d) if !d.is_empty() => Self::raw(format!("updated>{d}")),
            _ => Self::raw("updated>-30d"),
        }
    }

    /// Combine two expressions with a logical AND. The order-by clause of
    /// either side is kept (right side wins if both are set).
    pub fn and(mut self, other: Jql) -> Self {
        self.clauses.extend(other.clauses);
        if other.order_by.is_some() {
            self.order_by = other.order_by;
        }
        self
    }

    /// Append an `ORDER BY updated DESC` clause, for reports that want the
    /// most recently touched issues first.
    pub fn order_by_updated_desc(mut self) -> Self {
        self.order_by = Some("updated DESC".to_string());
        self
    }

    /// Render the expression to its wire format.
    pub fn render(&self) -> String {
        let mut out = self
            .clauses
            .iter()
            .map(|c| match c {
                Clause::Equals { field, value } => {
                    format!("{field}=\"{}\"", escape_quoted(value))
                }
                Clause::Raw(s) => s.clone(),
            })
            .collect::<Vec<_>>()
            .join(" AND ");
        if let Some(ref order) = self.order_by {
            out.push_str(" ORDER BY ");
            out.push_str(order);
        }
        out
    }

    fn equals(field: &str, value: &str) -> Self {
        Jql {
            clauses: vec![Clause::Equals {
                field: field.to_string(),
                value: value.to_string(),
            }],
            order_by: None,
        }
    }

    fn raw(fragment: impl Into<String>) -> Self {
        Jql {
            clauses: vec![Clause::Raw(fragment.into())],
            order_by: None,
        }
    }
}

impl fmt::Display for Jql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Escape a value embedded in a double-quoted JQL string.
fn escape_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
