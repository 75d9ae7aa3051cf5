//! Infrastructure adapter for extracting SQL Server data over ODBC.
//!
//! Connections are short-lived: one per fetch, authenticated as the current
//! OS user (trusted connection). Result sets are pulled through a bounded
//! text buffer, so arbitrarily wide values are capped at `max_text_len`
//! bytes per cell.

use crate::domain::entities::{looks_like_query, ConnectionDescriptor, TableData};
use crate::domain::errors::{CopyError, Result};
use crate::ports::extraction_port::ExtractionPort;
use log::{debug, info};
use odbc_api::buffers::TextRowSet;
use odbc_api::{ConnectionOptions, Cursor, Environment, ResultSetMetadata};

/// The driver name registered with the ODBC driver manager.
pub const DEFAULT_SQL_DRIVER: &str = "ODBC Driver 17 for SQL Server";

/// Concrete implementation of `ExtractionPort` for SQL Server via ODBC.
pub struct OdbcExtractionAdapter {
    environment: Environment,
    driver: String,
    batch_size: usize,
    max_text_len: usize,
}

impl OdbcExtractionAdapter {
    /// Creates a new adapter. `batch_size` is rows fetched per round trip,
    /// `max_text_len` the per-cell byte cap for the fetch buffers.
    pub fn new(driver: String, batch_size: usize, max_text_len: usize) -> Result<Self> {
        let environment = Environment::new().map_err(|e| {
            CopyError::ConfigError(format!("failed to initialize ODBC environment: {}", e))
        })?;
        Ok(Self {
            environment,
            driver,
            batch_size,
            max_text_len,
        })
    }
}

impl ExtractionPort for OdbcExtractionAdapter {
    fn fetch(&self, connection: &ConnectionDescriptor, source: &str) -> Result<TableData> {
        let query = build_query(source);
        debug!(
            "Connecting to {}/{} using a trusted connection",
            connection.server, connection.database
        );

        let conn = self
            .environment
            .connect_with_connection_string(
                &connection_string(&self.driver, connection),
                ConnectionOptions::default(),
            )
            .map_err(|e| extraction_error(source, e))?;

        info!("Executing query: {}", query);
        let cursor = conn
            .execute(&query, ())
            .map_err(|e| extraction_error(source, e))?;
        let mut cursor = match cursor {
            Some(cursor) => cursor,
            None => {
                return Err(CopyError::ExtractionError {
                    source_name: source.to_string(),
                    reason: "statement produced no result set".to_string(),
                })
            }
        };

        let columns: Vec<String> = cursor
            .column_names()
            .map_err(|e| extraction_error(source, e))?
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| extraction_error(source, e))?;
        let mut data = TableData::new(columns);

        let mut buffers =
            TextRowSet::for_cursor(self.batch_size, &mut cursor, Some(self.max_text_len))
                .map_err(|e| extraction_error(source, e))?;
        let mut row_set_cursor = cursor
            .bind_buffer(&mut buffers)
            .map_err(|e| extraction_error(source, e))?;

        while let Some(batch) = row_set_cursor
            .fetch()
            .map_err(|e| extraction_error(source, e))?
        {
            for row_index in 0..batch.num_rows() {
                let row: Vec<Option<String>> = (0..batch.num_cols())
                    .map(|col_index| {
                        batch
                            .at(col_index, row_index)
                            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                    })
                    .collect();
                data.push_row(row);
            }
        }

        Ok(data)
    }
}

/// Wraps a table identifier in a full select; queries pass through verbatim.
fn build_query(source: &str) -> String {
    if looks_like_query(source) {
        source.to_string()
    } else {
        format!("SELECT * FROM {}", source)
    }
}

fn connection_string(driver: &str, connection: &ConnectionDescriptor) -> String {
    format!(
        "Driver={{{}}};Server={};Database={};Trusted_Connection=yes;",
        driver, connection.server, connection.database
    )
}

fn extraction_error(source: &str, error: impl std::fmt::Display) -> CopyError {
    CopyError::ExtractionError {
        source_name: source.to_string(),
        reason: error.to_string(),
    }
}
