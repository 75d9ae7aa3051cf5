use crate::domain::entities::WriteMode;
use clap::Parser;
use serde::Deserialize;
use std::error::Error;
use std::fs::File;
use std::io::Read;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub connection: ConnectionConfig,
    pub upload: UploadConfig,
    pub azure: Option<AzureConfig>,
    pub extraction: Option<ExtractionConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConnectionConfig {
    pub server: String,
    pub database: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    pub source: Option<String>,
    pub workspace: String,
    pub lakehouse: String,
    pub target_table: Option<String>,
    pub mode: Option<WriteMode>,
    pub temp_table_location: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AzureConfig {
    pub storage_account: Option<String>,
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub exclude_managed_identity: Option<bool>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ExtractionConfig {
    /// "odbc" (default) or "bcp".
    pub backend: Option<String>,
    pub driver: Option<String>,
    pub batch_size: Option<usize>,
    pub max_text_length: Option<usize>,
    /// Field separator for bcp exports, a single character.
    pub separator: Option<String>,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file (YAML or JSON)
    #[arg(short, long)]
    pub config: Option<String>,

    // Overrides for ad-hoc runs
    /// SQL Server to copy from
    #[arg(long)]
    pub sql_server: Option<String>,
    /// Database holding the source tables
    #[arg(long)]
    pub database_name: Option<String>,
    /// Comma-separated tables, or a single query
    #[arg(long)]
    pub source: Option<String>,
    /// Fabric-enabled workspace name
    #[arg(long)]
    pub workspace_name: Option<String>,
    /// Lakehouse to copy the tables into
    #[arg(long)]
    pub lakehouse_name: Option<String>,
    /// Remote table name, for a single table or query source
    #[arg(long)]
    pub target_table: Option<String>,
    /// Local write mode: error, append, overwrite or ignore
    #[arg(long, value_parser = parse_write_mode)]
    pub mode: Option<WriteMode>,
    /// Local staging directory for the Delta tables
    #[arg(long)]
    pub temp_table_location: Option<String>,
    /// Storage account name, or a full https:// endpoint
    #[arg(long)]
    pub storage_account: Option<String>,
    #[arg(long)]
    pub tenant_id: Option<String>,
    #[arg(long)]
    pub client_id: Option<String>,
    #[arg(long)]
    pub client_secret: Option<String>,
    /// Skip the managed-identity probe and use the az CLI instead
    #[arg(long)]
    pub exclude_managed_identity: bool,
    /// Extraction backend: odbc or bcp
    #[arg(long)]
    pub extractor: Option<String>,
    /// off, error, warn, info, debug or trace
    #[arg(long)]
    pub log_level: Option<String>,
}

fn parse_write_mode(value: &str) -> Result<WriteMode, String> {
    WriteMode::from_name(value)
        .ok_or_else(|| format!("expected error, append, overwrite or ignore, got '{}'", value))
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self, Box<dyn Error>> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let config: AppConfig = if path.ends_with(".json") {
            serde_json::from_str(&contents)?
        } else {
            serde_yaml::from_str(&contents)?
        };

        Ok(config)
    }

    /// Builds a config from CLI arguments alone, for runs without a file.
    pub fn default_from_cli(args: &CliArgs) -> Self {
        Self {
            connection: ConnectionConfig {
                server: args.sql_server.clone().unwrap_or_default(),
                database: args.database_name.clone().unwrap_or_default(),
            },
            upload: UploadConfig {
                source: args.source.clone(),
                workspace: args.workspace_name.clone().unwrap_or_default(),
                lakehouse: args.lakehouse_name.clone().unwrap_or_default(),
                target_table: args.target_table.clone(),
                mode: args.mode,
                temp_table_location: args.temp_table_location.clone(),
            },
            azure: None,
            extraction: None,
        }
    }

    pub fn merge_cli(&mut self, args: &CliArgs) {
        if let Some(s) = &args.sql_server { self.connection.server = s.clone(); }
        if let Some(d) = &args.database_name { self.connection.database = d.clone(); }
        if let Some(s) = &args.source { self.upload.source = Some(s.clone()); }
        if let Some(w) = &args.workspace_name { self.upload.workspace = w.clone(); }
        if let Some(l) = &args.lakehouse_name { self.upload.lakehouse = l.clone(); }
        if let Some(t) = &args.target_table { self.upload.target_table = Some(t.clone()); }
        if let Some(m) = args.mode { self.upload.mode = Some(m); }
        if let Some(t) = &args.temp_table_location { self.upload.temp_table_location = Some(t.clone()); }

        if args.storage_account.is_some()
            || args.tenant_id.is_some()
            || args.client_id.is_some()
            || args.client_secret.is_some()
            || args.exclude_managed_identity
        {
            let azure = self.azure.get_or_insert_with(AzureConfig::default);
            if let Some(a) = &args.storage_account { azure.storage_account = Some(a.clone()); }
            if let Some(t) = &args.tenant_id { azure.tenant_id = Some(t.clone()); }
            if let Some(c) = &args.client_id { azure.client_id = Some(c.clone()); }
            if let Some(s) = &args.client_secret { azure.client_secret = Some(s.clone()); }
            if args.exclude_managed_identity { azure.exclude_managed_identity = Some(true); }
        }

        if let Some(e) = &args.extractor {
            let extraction = self.extraction.get_or_insert_with(ExtractionConfig::default);
            extraction.backend = Some(e.clone());
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.connection.server.is_empty() {
            return Err("connection.server is required (--sql-server)".to_string());
        }
        if self.connection.database.is_empty() {
            return Err("connection.database is required (--database-name)".to_string());
        }
        let source_given = self
            .upload
            .source
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty());
        if !source_given {
            return Err("upload.source is required (--source)".to_string());
        }
        if self.upload.workspace.is_empty() {
            return Err("upload.workspace is required (--workspace-name)".to_string());
        }
        if self.upload.lakehouse.is_empty() {
            return Err("upload.lakehouse is required (--lakehouse-name)".to_string());
        }
        if let Some(extraction) = &self.extraction {
            if let Some(backend) = &extraction.backend {
                if backend != "odbc" && backend != "bcp" {
                    return Err(format!(
                        "unknown extraction backend '{}' (expected odbc or bcp)",
                        backend
                    ));
                }
            }
            if let Some(separator) = &extraction.separator {
                if separator.len() != 1 {
                    return Err("extraction.separator must be a single character".to_string());
                }
            }
        }
        Ok(())
    }
}
