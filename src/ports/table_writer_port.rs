//! # Table Writer Port
//!
//! Contract for the local columnar writer: materialize an extracted dataset
//! as a table directory on disk, honoring the requested write mode.

use crate::domain::entities::{TableData, WriteMode};
use crate::domain::errors::Result;
use std::path::Path;

/// `TableWriterPort` writes one dataset to one local table directory.
pub trait TableWriterPort: Send + Sync {
    /// Writes `data` as a table at `location`.
    ///
    /// `mode` decides what happens when a table already exists there:
    /// `error` fails, `append` adds the rows, `overwrite` replaces the
    /// table, `ignore` leaves it untouched.
    fn write(&self, location: &Path, data: &TableData, mode: WriteMode) -> Result<()>;
}
