// src/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Timeout error: {0}")]
    Timeout(#[from] tokio::time::error::Elapsed),

    /// Input rejected before any state was touched (e.g. delay out of range).
    #[error("{0}")]
    Validation(String),

    /// A lookup came back empty (no lyrics for the query).
    #[error("{0}")]
    NotFound(String),

    /// A remote lyrics provider failed in a way that is not "no result".
    #[error("Lyrics provider error: {0}")]
    Provider(String),

    /// A single chat message could not be delivered, but retrying later may work
    /// (rate limits, 5xx responses).
    #[error("Transient delivery error: {0}")]
    TransientDelivery(String),

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether the message can be shown to chat users verbatim.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::NotFound(_))
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Error::TransientDelivery(_) | Error::Timeout(_))
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Parse(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Parse(s.to_string())
    }
}
