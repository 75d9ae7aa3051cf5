//! Infrastructure adapter that writes an extracted dataset as a Delta table
//! on local disk: one or more Snappy-compressed Parquet data files plus a
//! `_delta_log` commit describing them.
//!
//! Values arrive as text, so every table gets an all-string, all-nullable
//! schema. A directory without a `_delta_log` is treated as absent, whatever
//! else it contains.

use crate::domain::entities::{TableData, WriteMode};
use crate::domain::errors::{CopyError, Result};
use crate::ports::table_writer_port::TableWriterPort;
use log::{debug, info};
use serde_json::json;
use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use arrow_array::{ArrayRef, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

const DELTA_LOG_DIR: &str = "_delta_log";

/// Writes [`TableData`] to a local Delta table directory.
pub struct DeltaTableWriter {
    batch_size: usize,
}

impl DeltaTableWriter {
    pub fn new(batch_size: usize) -> Self {
        Self { batch_size }
    }
}

impl Default for DeltaTableWriter {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl TableWriterPort for DeltaTableWriter {
    fn write(&self, location: &Path, data: &TableData, mode: WriteMode) -> Result<()> {
        if data.columns.is_empty() {
            return Err(CopyError::WriteError(
                "dataset has no columns".to_string(),
            ));
        }

        let table_exists = location.join(DELTA_LOG_DIR).is_dir();
        match (mode, table_exists) {
            (WriteMode::Error, true) => Err(CopyError::WriteError(format!(
                "a table already exists at {}",
                location.display()
            ))),
            (WriteMode::Ignore, true) => {
                debug!(
                    "Table at {} already exists, mode=ignore leaves it untouched",
                    location.display()
                );
                Ok(())
            }
            (WriteMode::Overwrite, true) => {
                fs::remove_dir_all(location)?;
                self.write_version(location, data, 0)
            }
            (WriteMode::Append, true) => {
                let version = next_version(&location.join(DELTA_LOG_DIR))?;
                self.write_version(location, data, version)
            }
            // No table yet: every mode starts a fresh one at version 0.
            (_, false) => self.write_version(location, data, 0),
        }
    }
}

impl DeltaTableWriter {
    fn write_version(&self, location: &Path, data: &TableData, version: u64) -> Result<()> {
        let log_dir = location.join(DELTA_LOG_DIR);
        fs::create_dir_all(&log_dir)?;

        // 1. Write the data file.
        let part_name = format!("part-{:05}-{}-c000.snappy.parquet", version, Uuid::new_v4());
        let part_path = location.join(&part_name);
        self.write_parquet(&part_path, data)?;
        let part_size = fs::metadata(&part_path)?.len();

        // 2. Commit it to the transaction log.
        let timestamp = chrono::Utc::now().timestamp_millis();
        let mut actions = Vec::new();
        if version == 0 {
            actions.push(json!({
                "protocol": { "minReaderVersion": 1, "minWriterVersion": 2 }
            }));
            actions.push(json!({
                "metaData": {
                    "id": Uuid::new_v4().to_string(),
                    "format": { "provider": "parquet", "options": {} },
                    "schemaString": schema_string(&data.columns),
                    "partitionColumns": [],
                    "configuration": {},
                    "createdTime": timestamp,
                }
            }));
        }
        actions.push(json!({
            "add": {
                "path": part_name,
                "partitionValues": {},
                "size": part_size,
                "modificationTime": timestamp,
                "dataChange": true,
            }
        }));

        let mut commit = actions
            .iter()
            .map(|action| action.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        commit.push('\n');
        fs::write(log_dir.join(format!("{:020}.json", version)), commit)?;

        info!(
            "Wrote {} rows to {} (version {})",
            data.row_count(),
            location.display(),
            version
        );
        Ok(())
    }

    fn write_parquet(&self, path: &Path, data: &TableData) -> Result<()> {
        // 1. Setup Arrow Schema
        let fields: Vec<Field> = data
            .columns
            .iter()
            .map(|name| Field::new(name, DataType::Utf8, true))
            .collect();
        let schema = Arc::new(Schema::new(fields));

        // 2. Setup Parquet Writer
        let file = File::create(path).map_err(CopyError::IoError)?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))
            .map_err(|e| CopyError::WriteError(e.to_string()))?;

        // 3. Batch the rows column-wise
        let column_count = data.columns.len();
        for chunk in data.rows.chunks(self.batch_size) {
            let mut columns_data: Vec<Vec<Option<String>>> =
                vec![Vec::with_capacity(chunk.len()); column_count];
            for row in chunk {
                if row.len() != column_count {
                    return Err(CopyError::WriteError(format!(
                        "row has {} values, expected {}",
                        row.len(),
                        column_count
                    )));
                }
                for (i, value) in row.iter().enumerate() {
                    columns_data[i].push(value.clone());
                }
            }
            write_batch(&mut writer, &schema, &columns_data)?;
        }

        writer
            .close()
            .map_err(|e| CopyError::WriteError(e.to_string()))?;
        Ok(())
    }
}

fn write_batch(
    writer: &mut ArrowWriter<File>,
    schema: &Arc<Schema>,
    columns_data: &[Vec<Option<String>>],
) -> Result<()> {
    let arrays: Vec<ArrayRef> = columns_data
        .iter()
        .map(|data| Arc::new(StringArray::from(data.clone())) as ArrayRef)
        .collect();

    let batch = RecordBatch::try_new(schema.clone(), arrays)
        .map_err(|e| CopyError::WriteError(e.to_string()))?;

    writer
        .write(&batch)
        .map_err(|e| CopyError::WriteError(e.to_string()))?;

    Ok(())
}

/// The Delta schema for an all-string table, serialized the way the log
/// expects it (a JSON document embedded as a string).
fn schema_string(columns: &[String]) -> String {
    let fields: Vec<serde_json::Value> = columns
        .iter()
        .map(|name| {
            json!({
                "name": name,
                "type": "string",
                "nullable": true,
                "metadata": {},
            })
        })
        .collect();
    json!({ "type": "struct", "fields": fields }).to_string()
}

/// Next commit version: one past the highest `<version>.json` in the log.
fn next_version(log_dir: &Path) -> Result<u64> {
    let mut max_version: Option<u64> = None;
    for entry in fs::read_dir(log_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(stem) = name.strip_suffix(".json") {
            if let Ok(version) = stem.parse::<u64>() {
                max_version = Some(max_version.map_or(version, |m| m.max(version)));
            }
        }
    }
    Ok(max_version.map_or(0, |m| m + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parquet::file::reader::{FileReader, SerializedFileReader};

    fn sample_data() -> TableData {
        let mut data = TableData::new(vec!["id".to_string(), "name".to_string()]);
        data.push_row(vec![Some("1".to_string()), Some("first".to_string())]);
        data.push_row(vec![Some("2".to_string()), None]);
        data.push_row(vec![Some("3".to_string()), Some("third".to_string())]);
        data
    }

    fn part_files(location: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(location)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".snappy.parquet"))
            .collect();
        names.sort();
        names
    }

    fn commit_files(location: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(location.join(DELTA_LOG_DIR))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_write_creates_table_layout() {
        let temp = tempfile::tempdir().unwrap();
        let location = temp.path().join("Orders");

        let writer = DeltaTableWriter::default();
        writer
            .write(&location, &sample_data(), WriteMode::Error)
            .unwrap();

        let parts = part_files(&location);
        assert_eq!(parts.len(), 1);
        assert!(parts[0].starts_with("part-00000-"));
        assert_eq!(commit_files(&location), vec!["00000000000000000000.json"]);

        let commit = fs::read_to_string(
            location.join(DELTA_LOG_DIR).join("00000000000000000000.json"),
        )
        .unwrap();
        let lines: Vec<serde_json::Value> = commit
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["protocol"]["minReaderVersion"], 1);

        let schema: serde_json::Value =
            serde_json::from_str(lines[1]["metaData"]["schemaString"].as_str().unwrap()).unwrap();
        assert_eq!(schema["fields"][0]["name"], "id");
        assert_eq!(schema["fields"][1]["type"], "string");

        assert_eq!(lines[2]["add"]["path"].as_str().unwrap(), parts[0]);
        assert_eq!(lines[2]["add"]["dataChange"], true);
    }

    #[test]
    fn test_parquet_holds_all_rows() {
        let temp = tempfile::tempdir().unwrap();
        let location = temp.path().join("Orders");

        // A tiny batch size forces the multi-batch path.
        let writer = DeltaTableWriter::new(2);
        writer
            .write(&location, &sample_data(), WriteMode::Overwrite)
            .unwrap();

        let part = part_files(&location).remove(0);
        let file = File::open(location.join(part)).unwrap();
        let reader = SerializedFileReader::new(file).unwrap();
        assert_eq!(reader.metadata().file_metadata().num_rows(), 3);
    }

    #[test]
    fn test_mode_error_fails_on_existing_table() {
        let temp = tempfile::tempdir().unwrap();
        let location = temp.path().join("Orders");

        let writer = DeltaTableWriter::default();
        writer
            .write(&location, &sample_data(), WriteMode::Error)
            .unwrap();
        let err = writer
            .write(&location, &sample_data(), WriteMode::Error)
            .unwrap_err();
        assert!(matches!(err, CopyError::WriteError(_)));
    }

    #[test]
    fn test_mode_ignore_keeps_existing_table() {
        let temp = tempfile::tempdir().unwrap();
        let location = temp.path().join("Orders");

        let writer = DeltaTableWriter::default();
        writer
            .write(&location, &sample_data(), WriteMode::Error)
            .unwrap();
        let before = part_files(&location);

        let mut other = TableData::new(vec!["x".to_string()]);
        other.push_row(vec![Some("y".to_string())]);
        writer.write(&location, &other, WriteMode::Ignore).unwrap();

        assert_eq!(part_files(&location), before);
        assert_eq!(commit_files(&location).len(), 1);
    }

    #[test]
    fn test_mode_append_adds_a_version() {
        let temp = tempfile::tempdir().unwrap();
        let location = temp.path().join("Orders");

        let writer = DeltaTableWriter::default();
        writer
            .write(&location, &sample_data(), WriteMode::Error)
            .unwrap();
        writer
            .write(&location, &sample_data(), WriteMode::Append)
            .unwrap();

        assert_eq!(part_files(&location).len(), 2);
        assert_eq!(
            commit_files(&location),
            vec!["00000000000000000000.json", "00000000000000000001.json"]
        );

        // An append commit carries only the add action.
        let commit = fs::read_to_string(
            location.join(DELTA_LOG_DIR).join("00000000000000000001.json"),
        )
        .unwrap();
        let lines: Vec<&str> = commit.lines().collect();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("\"add\""));
    }

    #[test]
    fn test_mode_overwrite_resets_table() {
        let temp = tempfile::tempdir().unwrap();
        let location = temp.path().join("Orders");

        let writer = DeltaTableWriter::default();
        writer
            .write(&location, &sample_data(), WriteMode::Error)
            .unwrap();
        writer
            .write(&location, &sample_data(), WriteMode::Append)
            .unwrap();
        writer
            .write(&location, &sample_data(), WriteMode::Overwrite)
            .unwrap();

        assert_eq!(part_files(&location).len(), 1);
        assert_eq!(commit_files(&location), vec!["00000000000000000000.json"]);
    }

    #[test]
    fn test_rejects_datasets_with_no_columns() {
        let temp = tempfile::tempdir().unwrap();
        let writer = DeltaTableWriter::default();
        let err = writer
            .write(
                &temp.path().join("Empty"),
                &TableData::default(),
                WriteMode::Overwrite,
            )
            .unwrap_err();
        assert!(matches!(err, CopyError::WriteError(_)));
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let temp = tempfile::tempdir().unwrap();
        let mut data = TableData::new(vec!["a".to_string(), "b".to_string()]);
        data.push_row(vec![Some("only one".to_string())]);

        let writer = DeltaTableWriter::default();
        let err = writer
            .write(&temp.path().join("Ragged"), &data, WriteMode::Overwrite)
            .unwrap_err();
        assert!(matches!(err, CopyError::WriteError(_)));
    }

    #[test]
    fn test_empty_result_set_still_creates_table() {
        let temp = tempfile::tempdir().unwrap();
        let location = temp.path().join("Empty");
        let data = TableData::new(vec!["id".to_string()]);

        let writer = DeltaTableWriter::default();
        writer.write(&location, &data, WriteMode::Error).unwrap();

        let part = part_files(&location).remove(0);
        let file = File::open(location.join(part)).unwrap();
        let reader = SerializedFileReader::new(file).unwrap();
        assert_eq!(reader.metadata().file_metadata().num_rows(), 0);
        assert_eq!(commit_files(&location).len(), 1);
    }
}
