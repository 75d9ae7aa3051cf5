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

//! Core error definitions for the SQL-to-Fabric copier.
//!
//! This module provides a centralized `CopyError` enum and a `Result` type
//! used throughout the application to handle configuration, extraction,
//! local-write, and remote-storage errors.

use thiserror::Error;

/// Error types encountered while copying tables to a lakehouse.
#[derive(Error, Debug)]
pub enum CopyError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A target table name was combined with multiple sources and the run
    /// was not (or could not be) confirmed interactively.
    #[error("Conflict: {0}")]
    ConflictError(String),

    #[error("Extraction failed for {source_name}: {reason}")]
    ExtractionError { source_name: String, reason: String },

    /// Writing the local Delta table failed, or the write mode forbids it.
    #[error("Local table write failed: {0}")]
    WriteError(String),

    /// A delete, upload, or list operation against the lakehouse failed.
    #[error("Remote I/O error: {0}")]
    RemoteIoError(String),

    #[error("Credential error: {0}")]
    CredentialError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A specialized Result type for the SQL-to-Fabric copier.
pub type Result<T> = std::result::Result<T, CopyError>;
