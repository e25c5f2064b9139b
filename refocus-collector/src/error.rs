//! Error types for the collector
//!
//! A heartbeat cycle can end in three ways besides success:
//! - `ValidationError`: bad identity config or a malformed generator; the
//!   cycle aborts before anything is sent
//! - `CollectorError::Io`: the generators directory could not be read
//! - `TransportError`: the controller round-trip failed; handed to the
//!   response handler instead of being returned

use std::path::PathBuf;

/// Reasons a parsed generator document is rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("generator is an array, expected an object")]
    Array,
    #[error("generator is not an object (found {0})")]
    NotAnObject(&'static str),
    #[error("generator has no \"name\" field")]
    MissingName,
    #[error("generator \"name\" must be a string")]
    NameNotString,
    #[error("generator \"name\" is empty")]
    EmptyName,
}

/// Fatal to the current cycle, raised before any payload is sent
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required config field: {0}")]
    MissingField(&'static str),
    #[error("invalid generator in {}: {source}", file.display())]
    Generator {
        file: PathBuf,
        #[source]
        source: DecodeError,
    },
}

/// Failure of the outbound heartbeat call
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("controller answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid controller response: {0}")]
    InvalidResponse(String),
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// Errors returned to the caller of a heartbeat cycle
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CollectorError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CollectorError::Io {
            path: path.into(),
            source,
        }
    }

    /// True when the cycle was rejected by validation rather than I/O
    pub fn is_validation(&self) -> bool {
        matches!(self, CollectorError::Validation(_))
    }
}

/// Configuration load/save failures
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not find a config directory for this platform")]
    NoConfigDir,
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}
