use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Exchange API error: {0}")]
    Exchange(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown strategy '{0}'")]
    UnknownStrategy(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Configuration errors stop a bot from starting; everything else is retried or logged.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Config(_) | Error::UnknownStrategy(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
