use activity_core::{CoreError, RetryExhausted};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Retry(Box<RetryExhausted<SourceError>>),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SourceError::Timeout(e)
        } else {
            SourceError::Http(e)
        }
    }
}

impl From<RetryExhausted<SourceError>> for SourceError {
    fn from(e: RetryExhausted<SourceError>) -> Self {
        SourceError::Retry(Box::new(e))
    }
}

impl SourceError {
    /// HTTP status of the underlying failure, looking through retries.
    pub fn status(&self) -> Option<u16> {
        match self {
            SourceError::Status { status, .. } => Some(*status),
            SourceError::Retry(e) => e.source.status(),
            _ => None,
        }
    }
}
