use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Authentication failed against {endpoint}: {message}")]
    Authentication { endpoint: String, message: String },

    #[error("Search failed for JQL '{jql}': {message}")]
    Search { jql: String, message: String },

    #[error("Unable to fetch issue {key}: {message}")]
    Fetch { key: String, message: String },

    #[error("Ticket source API error: {0}")]
    Api(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Api(e.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::Config(format!("invalid endpoint URL: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
