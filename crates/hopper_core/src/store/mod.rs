//! Durable registry storage.
//!
//! # Responsibility
//! - Load the registry snapshot at startup, absorbing corruption.
//! - Persist full snapshots through a single serialized write queue.
//!
//! # Invariants
//! - A reader never observes a half-written snapshot (temp file + rename).
//! - Writes never overlap; a later-enqueued write completes after an earlier one.
//! - Storage failures are logged, never propagated into domain operations.

use crate::model::registry::RegistryDocument;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

mod json_file;
mod write_queue;

pub use json_file::JsonFileStore;
pub use write_queue::{PersistQueue, QueueStats};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Serialize(serde_json::Error),
    /// The write queue worker thread could not be started.
    Worker(std::io::Error),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Serialize(err) => write!(f, "cannot serialize registry: {err}"),
            Self::Worker(err) => write!(f, "cannot start persistence worker: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Serialize(err) => Some(err),
            Self::Worker(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value)
    }
}

/// Destination for registry snapshots drained by `PersistQueue`.
pub trait SnapshotSink: Send + 'static {
    fn write_snapshot(&mut self, document: &RegistryDocument) -> StoreResult<()>;
}
