//! Replaces a lakehouse table with the contents of a local table directory.
//!
//! The replace protocol is destructive and simple: make sure no table of the
//! same name remains remotely, then upload every file of the local directory
//! tree to the corresponding path under `Tables/`. There is no staging step
//! and no rollback; a failed upload leaves the files copied so far in place
//! and aborts the rest (see the failure-model tests below).

use crate::domain::errors::{CopyError, Result};
use crate::domain::paths::{normalize_lakehouse_path, PathKind};
use crate::ports::lakehouse_port::LakehousePort;
use log::debug;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use walkdir::WalkDir;

/// Copies local table directories into a lakehouse, replacing what is there.
pub struct TableReplacer {
    lakehouse: Arc<dyn LakehousePort>,
}

impl TableReplacer {
    pub fn new(lakehouse: Arc<dyn LakehousePort>) -> Self {
        Self { lakehouse }
    }

    /// Replaces the remote table named after `local_table_dir`'s basename.
    ///
    /// Uploads run in sorted filename order, parents before children, so the
    /// transaction log lands alongside its data files deterministically.
    pub fn replace(
        &self,
        local_table_dir: &Path,
        lakehouse_name: &str,
        workspace_name: &str,
    ) -> Result<()> {
        let table_name = local_table_dir
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                CopyError::ConfigError(format!(
                    "local table directory {} has no usable basename",
                    local_table_dir.display()
                ))
            })?;

        // 1. Make sure no previous version of the table remains.
        self.ensure_table_absent(workspace_name, lakehouse_name, table_name)?;

        // 2. Upload the directory tree file by file.
        let table_path =
            normalize_lakehouse_path(lakehouse_name, table_name, None, PathKind::Tables);
        for entry in WalkDir::new(local_table_dir).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = relative_slash_path(entry.path(), local_table_dir)?;
            let remote_path = format!("{}/{}", table_path, relative);
            debug!("Copying {} to {}", entry.path().display(), remote_path);

            let bytes = fs::read(entry.path())?;
            self.lakehouse
                .upload_file(workspace_name, &remote_path, &bytes, true)?;
        }

        Ok(())
    }

    /// Deletes the remote table if it exists. Calling this again once the
    /// table is gone is a no-op, so repeated invocations are safe.
    pub fn ensure_table_absent(
        &self,
        workspace_name: &str,
        lakehouse_name: &str,
        table_name: &str,
    ) -> Result<()> {
        let table_path =
            normalize_lakehouse_path(lakehouse_name, table_name, None, PathKind::Tables);
        if self.lakehouse.directory_exists(workspace_name, &table_path)? {
            debug!("Deleting existing table on lakehouse: {}", table_path);
            self.lakehouse
                .delete_directory(workspace_name, &table_path)?;
        }
        Ok(())
    }
}

/// Path of `file` relative to `base`, joined with forward slashes so remote
/// paths come out identical on every platform.
fn relative_slash_path(file: &Path, base: &Path) -> Result<String> {
    let relative = file.strip_prefix(base).map_err(|_| {
        CopyError::IoError(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} is not under {}", file.display(), base.display()),
        ))
    })?;
    Ok(relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/"))
}
