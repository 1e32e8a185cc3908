//! Where snapshots come from.
//!
//! The Ledger Service's transport is owned by the host; the core only needs
//! something that hands it a complete, freshly parsed snapshot.

use crate::blockchain::LedgerSnapshot;
use crate::error::LedgerError;
use std::path::PathBuf;

/// Abstraction for snapshot producers. Each call returns a new, complete
/// snapshot or an error; implementations never return partial chains.
pub trait SnapshotSource: Send + Sync {
    fn fetch(&self) -> Result<LedgerSnapshot, LedgerError>;

    /// Short label used in logs.
    fn describe(&self) -> String;
}

/// Reads a `{ "chain": [...] }` document from disk on every fetch.
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SnapshotSource for JsonFileSource {
    fn fetch(&self) -> Result<LedgerSnapshot, LedgerError> {
        let bytes = std::fs::read(&self.path).map_err(|e| {
            LedgerError::IoError(format!("Failed to read {}: {}", self.path.display(), e))
        })?;
        LedgerSnapshot::from_slice(&bytes)
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

/// Serves a fixed snapshot. Useful for embedding hosts and tests.
pub struct StaticSource {
    snapshot: LedgerSnapshot,
}

impl StaticSource {
    pub fn new(snapshot: LedgerSnapshot) -> Self {
        Self { snapshot }
    }
}

impl SnapshotSource for StaticSource {
    fn fetch(&self) -> Result<LedgerSnapshot, LedgerError> {
        Ok(self.snapshot.clone())
    }

    fn describe(&self) -> String {
        format!("static:{}", self.snapshot.id())
    }
}
