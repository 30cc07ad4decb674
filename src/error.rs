// src/error.rs
//! Crate error type.
//!
//! Only retrieval and configuration problems are errors. Anything wrong with
//! the *content* of a catalog is a warning string on the result instead.
//!
//! Errors are `Clone` so the result cache can hand the same failure to every
//! caller until a forced reload.

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Connection refused, DNS, TLS, timeouts: the request never got an answer.
    #[error("Transport error fetching {url}: {message}")]
    Transport { url: String, message: String },

    /// The server answered, but not with success.
    #[error("HTTP {status} fetching {url}")]
    Status { url: String, status: u16 },

    /// Local file missing or unreadable.
    #[error("IO error: {0}")]
    Io(String),

    #[error("JSON error in {what}: {message}")]
    Json { what: String, message: String },

    #[error("Config error: {0}")]
    Config(String),

    /// The spawned loader panicked or was aborted by the runtime.
    #[error("Load task failed: {0}")]
    TaskFailed(String),
}

impl Error {
    /// Retrieval failures that only cost us one source (degrade to a warning).
    pub fn is_soft(&self) -> bool {
        matches!(self, Error::Status { .. } | Error::Io(_) | Error::Json { .. })
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
