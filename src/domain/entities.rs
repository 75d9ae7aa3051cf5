//! # Domain Entities
//!
//! Entities are the "Nouns" of the copier. They are simple data structures
//! (structs and enums) that represent the things a run works with: sources,
//! connections, extracted datasets, and write modes.
//!
//! The `serde` crate (Deserialize) is used where an entity can be read
//! straight out of a configuration file.

use serde::Deserialize;
use std::fmt;

/// Local directory the per-source Delta tables are staged in when the caller
/// does not pick one.
pub const DEFAULT_TEMP_ROOT: &str = "output";

/// Heuristic that tells a SQL query apart from a table identifier.
///
/// Inherited convention: anything containing `" from "` (case-insensitive)
/// is treated as a query. A table literally named like `"x from y"` would
/// misclassify; callers that need certainty should build a
/// [`SourceDescriptor`] explicitly instead of relying on this sniffing.
pub fn looks_like_query(source: &str) -> bool {
    source.to_lowercase().contains(" from ")
}

/// `SourceDescriptor` identifies one thing to extract: either a table
/// (schema-qualified, e.g. `dbo.Orders`) or a raw SQL query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceDescriptor {
    Table(String),
    Query(String),
}

impl SourceDescriptor {
    /// Tags a raw string as table or query using [`looks_like_query`].
    pub fn classify(raw: &str) -> Self {
        if looks_like_query(raw) {
            SourceDescriptor::Query(raw.to_string())
        } else {
            SourceDescriptor::Table(raw.to_string())
        }
    }

    pub fn is_query(&self) -> bool {
        matches!(self, SourceDescriptor::Query(_))
    }

    /// The table identifier or query text, exactly as supplied.
    pub fn as_str(&self) -> &str {
        match self {
            SourceDescriptor::Table(s) => s,
            SourceDescriptor::Query(s) => s,
        }
    }
}

/// `SourceSpec` is what the caller hands to the orchestrator: either the raw
/// CLI string (which may be a query, one table, or a comma-delimited list of
/// tables) or an already-expanded list of descriptors.
#[derive(Debug, Clone)]
pub enum SourceSpec {
    Raw(String),
    List(Vec<SourceDescriptor>),
}

impl SourceSpec {
    /// Expands into individual descriptors.
    ///
    /// A raw string containing `,` is split into a table list unless it is a
    /// query; a query is never split. Elements are not trimmed here, the
    /// orchestrator trims each one as it processes it.
    pub fn expand(&self) -> Vec<SourceDescriptor> {
        match self {
            SourceSpec::Raw(raw) => {
                if raw.contains(',') && !looks_like_query(raw) {
                    raw.split(',').map(SourceDescriptor::classify).collect()
                } else {
                    vec![SourceDescriptor::classify(raw)]
                }
            }
            SourceSpec::List(descriptors) => descriptors.clone(),
        }
    }
}

/// `ConnectionDescriptor` names the SQL Server and database a source lives
/// in. Authentication is the adapter's concern (trusted connections only).
#[derive(Debug, Clone)]
pub struct ConnectionDescriptor {
    pub server: String,
    pub database: String,
}

impl ConnectionDescriptor {
    pub fn new(server: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            database: database.into(),
        }
    }
}

/// `TableData` is an extracted result set held in memory.
///
/// Every value is carried as text; the Delta writer materializes an
/// all-string schema. `None` marks a SQL NULL, distinct from an empty string.
#[derive(Debug, Clone, Default)]
pub struct TableData {
    /// Column names, in result-set order.
    pub columns: Vec<String>,
    /// Row-major values; each row has exactly `columns.len()` entries.
    pub rows: Vec<Vec<Option<String>>>,
}

impl TableData {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Option<String>>) {
        self.rows.push(row);
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

/// `WriteMode` defines what the local Delta writer does when the target
/// directory already holds a table. The remote replace step is always
/// delete-then-upload regardless of this mode.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Fail if a table already exists at the location.
    Error,
    /// Add the rows as a new version of the existing table.
    Append,
    /// Replace the existing table.
    #[default]
    Overwrite,
    /// Leave an existing table untouched and report success.
    Ignore,
}

impl WriteMode {
    /// Parses the lowercase mode names used on the CLI.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "error" => Some(WriteMode::Error),
            "append" => Some(WriteMode::Append),
            "overwrite" => Some(WriteMode::Overwrite),
            "ignore" => Some(WriteMode::Ignore),
            _ => None,
        }
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteMode::Error => write!(f, "error"),
            WriteMode::Append => write!(f, "append"),
            WriteMode::Overwrite => write!(f, "overwrite"),
            WriteMode::Ignore => write!(f, "ignore"),
        }
    }
}

/// `UploadRequest` is a full description of one copy run: where to read,
/// what to read, and which lakehouse to land the tables in.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub connection: ConnectionDescriptor,
    pub sources: SourceSpec,
    /// Fabric-enabled workspace name.
    pub workspace: String,
    /// Lakehouse name, with or without the `.Lakehouse` suffix.
    pub lakehouse: String,
    pub mode: WriteMode,
    /// Remote table name override. Required when the sole source is a query,
    /// unsupported when there are multiple sources.
    pub target_table: Option<String>,
    /// Local staging root for the written tables.
    pub temp_root: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_table_and_query() {
        assert_eq!(
            SourceDescriptor::classify("dbo.Orders"),
            SourceDescriptor::Table("dbo.Orders".to_string())
        );
        assert!(SourceDescriptor::classify("SELECT * FROM dbo.Orders").is_query());
        assert!(SourceDescriptor::classify("select a, b FROM t WHERE x = 1").is_query());
        // No surrounding spaces around "from" means it stays a table name.
        assert!(!SourceDescriptor::classify("dbo.FromAddresses").is_query());
    }

    #[test]
    fn test_expand_splits_table_lists_only() {
        let spec = SourceSpec::Raw("dbo.A,dbo.B, dbo.C".to_string());
        let expanded = spec.expand();
        assert_eq!(expanded.len(), 3);
        assert_eq!(expanded[0].as_str(), "dbo.A");
        assert_eq!(expanded[2].as_str(), " dbo.C");

        // A query containing commas is never split.
        let query = SourceSpec::Raw("SELECT a, b FROM dbo.T".to_string());
        let expanded = query.expand();
        assert_eq!(expanded.len(), 1);
        assert!(expanded[0].is_query());
    }

    #[test]
    fn test_expand_single_table() {
        let spec = SourceSpec::Raw("dbo.Orders".to_string());
        let expanded = spec.expand();
        assert_eq!(expanded, vec![SourceDescriptor::Table("dbo.Orders".into())]);
    }

    #[test]
    fn test_write_mode_from_name() {
        assert_eq!(WriteMode::from_name("overwrite"), Some(WriteMode::Overwrite));
        assert_eq!(WriteMode::from_name("ERROR"), Some(WriteMode::Error));
        assert_eq!(WriteMode::from_name("truncate"), None);
        assert_eq!(WriteMode::default(), WriteMode::Overwrite);
    }

    #[test]
    fn test_table_data_shape() {
        let mut data = TableData::new(vec!["id".into(), "name".into()]);
        data.push_row(vec![Some("1".into()), None]);
        assert_eq!(data.row_count(), 1);
        assert_eq!(data.column_count(), 2);
    }
}
