//! # Lakehouse Port
//!
//! Contract for the remote side. A lakehouse client exposes the small set of
//! filesystem-style operations the replacer needs: existence checks,
//! directory create/delete, file upload/delete, and a recursive listing.
//!
//! All `path` arguments are canonical lakehouse paths as produced by
//! [`crate::domain::paths::normalize_lakehouse_path`], rooted at the
//! workspace filesystem.

use crate::domain::errors::Result;

/// One entry of a recursive directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Path of the entry relative to the workspace filesystem root.
    pub name: String,
    pub is_directory: bool,
}

/// `LakehousePort` is implemented by cloud storage clients.
pub trait LakehousePort: Send + Sync {
    /// Whether a directory exists at `path`.
    fn directory_exists(&self, workspace: &str, path: &str) -> Result<bool>;

    /// Creates a directory. Parents are created implicitly.
    fn create_directory(&self, workspace: &str, path: &str) -> Result<()>;

    /// Recursively deletes the directory at `path`. Deleting a directory
    /// that is already gone is not an error.
    fn delete_directory(&self, workspace: &str, path: &str) -> Result<()>;

    /// Deletes a single file.
    fn delete_file(&self, workspace: &str, path: &str) -> Result<()>;

    /// Uploads `data` as the file at `path`. With `overwrite` the upload
    /// replaces any existing file; without it, an existing file is an error.
    fn upload_file(&self, workspace: &str, path: &str, data: &[u8], overwrite: bool)
        -> Result<()>;

    /// Recursively lists everything under `directory`.
    fn list_paths(&self, workspace: &str, directory: &str) -> Result<Vec<RemoteEntry>>;

    /// Number of files (directories excluded) under `directory`.
    fn count_files(&self, workspace: &str, directory: &str) -> Result<usize> {
        Ok(self
            .list_paths(workspace, directory)?
            .iter()
            .filter(|entry| !entry.is_directory)
            .count())
    }
}
