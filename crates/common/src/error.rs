use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Quote source error: {0}")]
    QuoteSource(String),

    #[error("Fetch for '{code}' timed out after {secs}s")]
    FetchTimeout { code: String, secs: u64 },

    #[error("Insufficient data: need {needed} bars, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("Notification error: {0}")]
    Notify(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Unknown instrument: '{0}'")]
    UnknownInstrument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Errors a cycle recovers from by skipping the instrument until the next cycle.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::QuoteSource(_) | Error::FetchTimeout { .. }
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
