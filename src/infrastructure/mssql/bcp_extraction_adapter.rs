//! Extraction adapter backed by the `bcp` bulk-export utility.
//!
//! Each fetch shells out to `bcp ... out` (or `queryout` for queries) with a
//! trusted connection, landing a delimited text file in a temporary
//! directory, then parses that file back in. Character-mode bcp emits no
//! header row, so column names are synthesized (`col_1`, `col_2`, ...), and
//! it has no NULL marker, so NULLs come back as empty strings.

use crate::domain::entities::{looks_like_query, ConnectionDescriptor, TableData};
use crate::domain::errors::{CopyError, Result};
use crate::domain::naming::strip_brackets;
use crate::ports::extraction_port::ExtractionPort;
use log::debug;
use std::path::Path;
use std::process::{Command, Stdio};

/// Concrete implementation of `ExtractionPort` shelling out to `bcp`.
pub struct BcpExtractionAdapter {
    separator: u8,
}

impl BcpExtractionAdapter {
    pub fn new(separator: u8) -> Self {
        Self { separator }
    }
}

impl Default for BcpExtractionAdapter {
    fn default() -> Self {
        Self::new(b',')
    }
}

impl ExtractionPort for BcpExtractionAdapter {
    fn fetch(&self, connection: &ConnectionDescriptor, source: &str) -> Result<TableData> {
        let temp = tempfile::tempdir()?;
        let file_stem = if looks_like_query(source) {
            "query".to_string()
        } else {
            strip_brackets(source)
        };
        let out_file = temp.path().join(format!("{}.csv", file_stem));

        let args = build_bcp_args(connection, source, &out_file, self.separator);
        debug!("Running bcp with arguments: {:?}", args);

        let output = Command::new("bcp")
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| extraction_error(source, format!("failed to run bcp: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(extraction_error(
                source,
                format!("bcp exited with {}: {}", output.status, stderr.trim()),
            ));
        }

        read_delimited_file(&out_file, self.separator, source)
    }
}

/// Argument vector for one bcp invocation. Tables export with `out` and a
/// database-qualified name; queries use `queryout` plus `-d`.
fn build_bcp_args(
    connection: &ConnectionDescriptor,
    source: &str,
    out_file: &Path,
    separator: u8,
) -> Vec<String> {
    let is_query = looks_like_query(source);
    let mut args = Vec::new();
    if is_query {
        args.push(source.to_string());
        args.push("queryout".to_string());
    } else {
        args.push(format!("{}.{}", connection.database, source));
        args.push("out".to_string());
    }
    args.push(out_file.to_string_lossy().into_owned());
    args.push("-c".to_string());
    args.push(format!("-t{}", separator as char));
    args.push("-T".to_string());
    args.push("-S".to_string());
    args.push(connection.server.clone());
    if is_query {
        args.push("-d".to_string());
        args.push(connection.database.clone());
    }
    args
}

fn read_delimited_file(path: &Path, separator: u8, source: &str) -> Result<TableData> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(separator)
        // bcp writes raw text without quoting.
        .quoting(false)
        .from_path(path)
        .map_err(|e| extraction_error(source, e))?;

    let mut data = TableData::default();
    for record in reader.records() {
        let record = record.map_err(|e| extraction_error(source, e))?;
        if data.columns.is_empty() {
            data.columns = (1..=record.len()).map(|i| format!("col_{}", i)).collect();
        }
        data.push_row(record.iter().map(|value| Some(value.to_string())).collect());
    }
    Ok(data)
}

fn extraction_error(source: &str, reason: impl std::fmt::Display) -> CopyError {
    CopyError::ExtractionError {
        source_name: source.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_build_bcp_args_for_table() {
        let connection = ConnectionDescriptor::new("localhost", "AdventureWorksDW");
        let args = build_bcp_args(
            &connection,
            "dbo.Account",
            Path::new("/tmp/out/dbo.Account.csv"),
            b',',
        );
        assert_eq!(
            args,
            vec![
                "AdventureWorksDW.dbo.Account",
                "out",
                "/tmp/out/dbo.Account.csv",
                "-c",
                "-t,",
                "-T",
                "-S",
                "localhost",
            ]
        );
    }

    #[test]
    fn test_build_bcp_args_for_query() {
        let connection = ConnectionDescriptor::new("db01", "Sales");
        let args = build_bcp_args(
            &connection,
            "SELECT a FROM dbo.T",
            Path::new("/tmp/out/query.csv"),
            b'|',
        );
        assert_eq!(
            args,
            vec![
                "SELECT a FROM dbo.T",
                "queryout",
                "/tmp/out/query.csv",
                "-c",
                "-t|",
                "-T",
                "-S",
                "db01",
                "-d",
                "Sales",
            ]
        );
    }

    #[test]
    fn test_read_delimited_file_synthesizes_columns() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("Account.csv");
        fs::write(&path, "1|first|x\n2||y\n").unwrap();

        let data = read_delimited_file(&path, b'|', "dbo.Account").unwrap();
        assert_eq!(data.columns, vec!["col_1", "col_2", "col_3"]);
        assert_eq!(data.row_count(), 2);
        assert_eq!(data.rows[0][1].as_deref(), Some("first"));
        // No NULL marker in character mode; empties stay empty strings.
        assert_eq!(data.rows[1][1].as_deref(), Some(""));
    }

    #[test]
    fn test_read_delimited_file_empty_export() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("Empty.csv");
        fs::write(&path, "").unwrap();

        let data = read_delimited_file(&path, b',', "dbo.Empty").unwrap();
        assert_eq!(data.row_count(), 0);
        assert!(data.columns.is_empty());
    }
}
