//! JSON snapshot file.
//!
//! # Invariants
//! - `load` never fails; unreadable or unparsable files yield an empty registry.
//! - `write` replaces the target atomically via `<file>.tmp` + rename.

use super::{SnapshotSink, StoreError, StoreResult};
use crate::model::normalize::{normalize_registry, NormalizeContext};
use crate::model::registry::{Registry, RegistryDocument};
use log::{debug, info, warn};
use serde_json::Value;
use std::fs::File;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Registry snapshot stored as one pretty-printed JSON document.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Reads the raw document, `Ok(None)` when the file does not exist yet.
    pub fn read_raw(&self) -> StoreResult<Option<Value>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Loads and normalizes the registry.
    ///
    /// Missing, unreadable or corrupted files start an empty registry.
    pub fn load(&self, ctx: &NormalizeContext) -> Registry {
        let started_at = Instant::now();
        match self.read_raw() {
            Ok(Some(raw)) => {
                let registry = normalize_registry(&raw, ctx);
                info!(
                    "event=registry_load module=store status=ok tasks={} duration_ms={}",
                    registry.tasks.len(),
                    started_at.elapsed().as_millis()
                );
                registry
            }
            Ok(None) => {
                info!("event=registry_load module=store status=empty reason=missing_file");
                Registry::empty(ctx.now_ms)
            }
            Err(err) => {
                warn!(
                    "event=registry_load module=store status=empty reason=unreadable error={}",
                    err
                );
                Registry::empty(ctx.now_ms)
            }
        }
    }

    /// Writes `document` atomically.
    pub fn write(&self, document: &RegistryDocument) -> StoreResult<()> {
        let started_at = Instant::now();
        let json = serde_json::to_vec_pretty(document)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let tmp_path = self.path.with_extension("tmp");
        write_synced(&tmp_path, &json).map_err(|source| StoreError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        std::fs::rename(&tmp_path, &self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;

        debug!(
            "event=registry_write module=store status=ok bytes={} tasks={} duration_ms={}",
            json.len(),
            document.tasks.len(),
            started_at.elapsed().as_millis()
        );
        Ok(())
    }
}

impl SnapshotSink for JsonFileStore {
    fn write_snapshot(&mut self, document: &RegistryDocument) -> StoreResult<()> {
        self.write(document)
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}
