//! Error types for chainview

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum LedgerError {
    MalformedInput(String),
    NotFound(String),
    IoError(String),
    ConfigError(String),
    SourceError(String),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LedgerError::MalformedInput(msg) => write!(f, "Malformed ledger input: {}", msg),
            LedgerError::NotFound(msg) => write!(f, "Not found: {}", msg),
            LedgerError::IoError(msg) => write!(f, "IO error: {}", msg),
            LedgerError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            LedgerError::SourceError(msg) => write!(f, "Snapshot source error: {}", msg),
        }
    }
}

impl std::error::Error for LedgerError {}

impl LedgerError {
    /// True for errors the caller is expected to recover from, such as a
    /// lookup of a transaction that has not been mined yet.
    pub fn is_not_found(&self) -> bool {
        matches!(self, LedgerError::NotFound(_))
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::MalformedInput(err.to_string())
    }
}

impl From<toml::de::Error> for LedgerError {
    fn from(err: toml::de::Error) -> Self {
        LedgerError::ConfigError(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, LedgerError>;
