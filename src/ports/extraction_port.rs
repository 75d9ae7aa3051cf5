// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Extraction Port
//!
//! This Port defines the contract for the "Data Reader".
//!
//! Anything that implements `ExtractionPort` must be able to take a
//! connection descriptor plus a table name or query string and return the
//! full result set as an in-memory [`TableData`], with no implicit limit.

use crate::domain::entities::{ConnectionDescriptor, TableData};
use crate::domain::errors::Result;

/// `ExtractionPort` pulls a table or query result out of the database.
pub trait ExtractionPort: Send + Sync {
    /// Fetches all rows of the named table, or the result set of the given
    /// query. `source` is a schema-qualified table name unless it reads as a
    /// query.
    fn fetch(&self, connection: &ConnectionDescriptor, source: &str) -> Result<TableData>;
}
