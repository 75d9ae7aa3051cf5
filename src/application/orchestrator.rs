//! The core application logic that orchestrates a copy run.
//!
//! This module coordinates between the extraction adapter, the local Delta
//! writer, and the remote table replacer: validate the request, expand the
//! source list, then move every source end to end.

use crate::application::table_replacer::TableReplacer;
use crate::domain::entities::{SourceDescriptor, UploadRequest, DEFAULT_TEMP_ROOT};
use crate::domain::errors::{CopyError, Result};
use crate::domain::naming::sanitize_table_name;
use crate::ports::confirm_port::ConfirmPort;
use crate::ports::extraction_port::ExtractionPort;
use crate::ports::lakehouse_port::LakehousePort;
use crate::ports::table_writer_port::TableWriterPort;
use log::{error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Orchestrates the end-to-end copy of one or more sources into a lakehouse.
pub struct UploadOrchestrator {
    extraction_port: Arc<dyn ExtractionPort>,
    writer_port: Arc<dyn TableWriterPort>,
    replacer: TableReplacer,
    confirm_port: Arc<dyn ConfirmPort>,
}

impl UploadOrchestrator {
    /// Creates a new orchestrator with the provided components.
    pub fn new(
        extraction_port: Arc<dyn ExtractionPort>,
        writer_port: Arc<dyn TableWriterPort>,
        lakehouse_port: Arc<dyn LakehousePort>,
        confirm_port: Arc<dyn ConfirmPort>,
    ) -> Self {
        Self {
            extraction_port,
            writer_port,
            replacer: TableReplacer::new(lakehouse_port),
            confirm_port,
        }
    }

    /// Entry point for one copy run.
    ///
    /// Sources are processed strictly one at a time. The remote
    /// delete-then-upload sequence is not safe to interleave against the
    /// same target path, and the local wipe-then-write is not safe either
    /// for runs sharing a staging root, so sequencing is the safety
    /// mechanism. Any failure stops the run; sources already replaced stay
    /// replaced, there is no partial-success report.
    pub fn upload(&self, request: &UploadRequest) -> Result<()> {
        let sources = request.sources.expand();

        // 1. Validate, before any I/O happens.
        if sources.is_empty() {
            return Err(CopyError::ConfigError("no sources given".to_string()));
        }
        if sources.len() == 1 && sources[0].is_query() && request.target_table.is_none() {
            error!("If source provided is a query, you MUST pass a target_table.");
            return Err(CopyError::ConfigError(
                "no target_table provided with query".to_string(),
            ));
        }

        // 2. A target name cannot drive more than one source. Attended runs
        // may confirm dropping it; everything else aborts here.
        let mut target_table = request.target_table.clone();
        if target_table.is_some() && sources.len() > 1 {
            warn!("target_table provided for a list of tables, which is not supported.");
            if !self
                .confirm_port
                .confirm("Ignore parameter target_table? (y to continue): ")
            {
                warn!("Exiting.");
                return Err(CopyError::ConflictError(
                    "target_table provided with multiple sources".to_string(),
                ));
            }
            target_table = None;
        }

        // 3. Copy each source end to end.
        for source in &sources {
            self.copy_source(request, source, target_table.as_deref(), sources.len())?;
        }

        Ok(())
    }

    fn copy_source(
        &self,
        request: &UploadRequest,
        source: &SourceDescriptor,
        target_table: Option<&str>,
        source_count: usize,
    ) -> Result<()> {
        let trimmed = source.as_str().trim();

        let data = self.extraction_port.fetch(&request.connection, trimmed)?;
        info!(
            "Extracted {} rows x {} columns from {}",
            data.row_count(),
            data.column_count(),
            trimmed
        );

        let table_name = resolve_table_name(trimmed, target_table, source_count);
        let location = resolve_local_location(&request.temp_root, &table_name, source_count);
        if location.exists() {
            fs::remove_dir_all(&location)?;
        }

        self.writer_port.write(&location, &data, request.mode)?;

        // The staging directory's basename decides the remote table name,
        // including when the staging root itself is the table directory.
        let remote_name = location
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                CopyError::ConfigError(format!(
                    "staging location {} has no usable basename",
                    location.display()
                ))
            })?;

        println!(
            "Starting:\t{}.{}.{} => /{}/{}/Tables/{}",
            request.connection.server,
            request.connection.database,
            table_name,
            request.workspace,
            request.lakehouse,
            remote_name
        );
        self.replacer
            .replace(&location, &request.lakehouse, &request.workspace)?;
        println!(
            "Finished:\t{}.{}.{} => /{}/{}/Tables/{}",
            request.connection.server,
            request.connection.database,
            table_name,
            request.workspace,
            request.lakehouse,
            remote_name
        );

        Ok(())
    }
}

/// Resolves the sanitized destination table name for one source. The
/// explicit override only applies when exactly one source is present.
fn resolve_table_name(source: &str, target_table: Option<&str>, source_count: usize) -> String {
    let effective = match (target_table, source_count) {
        (Some(target), 1) => target,
        _ => source,
    };
    sanitize_table_name(effective)
}

/// Picks where one table is staged locally. Tables stage under
/// `<temp_root>/<table_name>`, except that a single-source run with an
/// explicit non-default root uses the root itself as the table directory.
fn resolve_local_location(temp_root: &str, table_name: &str, source_count: usize) -> PathBuf {
    if source_count == 1 && temp_root != DEFAULT_TEMP_ROOT {
        PathBuf::from(temp_root)
    } else {
        Path::new(temp_root).join(table_name)
    }
}
