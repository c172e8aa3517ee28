//! Managed upload namespace.
//!
//! # Responsibility
//! - Decide whether a file reference belongs to the managed upload directory.
//! - Map accepted references to on-disk paths and delete them best-effort.
//!
//! # Invariants
//! - Only `/uploads/<name>` with a flat, traversal-free `<name>` resolves.
//! - `remove` never fails and never touches paths outside the upload root.

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::ErrorKind;
use std::path::PathBuf;

/// URL prefix under which uploaded files are served.
pub const UPLOAD_URL_PREFIX: &str = "/uploads/";

static UPLOAD_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{0,127}$").expect("valid upload name regex")
});

/// Returns the file name part of a managed upload reference.
pub fn upload_file_name(reference: &str) -> Option<&str> {
    let name = reference.strip_prefix(UPLOAD_URL_PREFIX)?;
    if name.contains("..") || !UPLOAD_NAME_RE.is_match(name) {
        return None;
    }
    Some(name)
}

/// Whether `reference` points into the managed upload namespace.
pub fn is_managed_upload_ref(reference: &str) -> bool {
    upload_file_name(reference).is_some()
}

/// File-reference collaborator used by the service layer.
pub trait UploadStore: Send {
    /// Resolves a reference to its on-disk path, or `None` when it is not managed.
    fn resolve(&self, reference: &str) -> Option<PathBuf>;
    /// Deletes the referenced file; failures are ignored.
    fn remove(&self, reference: &str);
}

/// Upload store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct UploadDir {
    root: PathBuf,
}

impl UploadDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl UploadStore for UploadDir {
    fn resolve(&self, reference: &str) -> Option<PathBuf> {
        upload_file_name(reference).map(|name| self.root.join(name))
    }

    fn remove(&self, reference: &str) {
        let Some(path) = self.resolve(reference) else {
            return;
        };
        match std::fs::remove_file(&path) {
            Ok(()) => debug!("event=upload_remove module=uploads status=ok"),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => debug!(
                "event=upload_remove module=uploads status=ignored error={}",
                err
            ),
        }
    }
}
