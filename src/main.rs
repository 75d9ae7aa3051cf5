//! # SQL Server to Fabric Lakehouse Copy
//!
//! Copies SQL Server tables (or the result of a single query) into Delta
//! tables under the `Tables` directory of a Microsoft Fabric lakehouse. Each
//! table is staged locally as a Delta table, then uploaded over the OneLake
//! DFS endpoint, replacing whatever the lakehouse held under that name.
//!
//! The application follows the **Hexagonal Architecture** (Ports and
//! Adapters) to keep the copy logic independent from SQL Server, the local
//! Delta writer and OneLake.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ports;

use crate::application::orchestrator::UploadOrchestrator;
use crate::config::{AppConfig, CliArgs};
use crate::domain::entities::{ConnectionDescriptor, SourceSpec, UploadRequest, DEFAULT_TEMP_ROOT};
use crate::domain::errors::CopyError;
use crate::infrastructure::delta::delta_table_writer::DeltaTableWriter;
use crate::infrastructure::mssql::bcp_extraction_adapter::BcpExtractionAdapter;
#[cfg(feature = "odbc")]
use crate::infrastructure::mssql::odbc_extraction_adapter::{
    OdbcExtractionAdapter, DEFAULT_SQL_DRIVER,
};
use crate::infrastructure::onelake::credentials::{DefaultCredentialOptions, TokenCredential};
use crate::infrastructure::onelake::onelake_adapter::OneLakeClient;
use crate::infrastructure::terminal::TerminalConfirm;
use crate::ports::extraction_port::ExtractionPort;
use clap::Parser;
use log::{error, info};
use std::process;
use std::str::FromStr;
use std::sync::Arc;

fn main() {
    // 1. Parse Arguments
    let args = CliArgs::parse();

    // 2. Initialize Logging
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Some(value) = &args.log_level {
        match log::LevelFilter::from_str(value) {
            Ok(level) => {
                builder.filter_level(level);
            }
            Err(_) => {
                eprintln!(
                    "Invalid log level '{}'. Valid levels: off, error, warn, info, debug, trace",
                    value
                );
                process::exit(1);
            }
        }
    }
    builder.init();

    // 3. Load Config
    let mut config = if let Some(config_path) = &args.config {
        match AppConfig::from_file(config_path) {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to load config: {}", e);
                process::exit(1);
            }
        }
    } else {
        // Construct default config from CLI if no config file
        AppConfig::default_from_cli(&args)
    };

    // Merge CLI overrides
    config.merge_cli(&args);

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        process::exit(1);
    }

    // 4. Initialize Hexagonal Components
    let azure = config.azure.clone().unwrap_or_default();
    let options = DefaultCredentialOptions::excluding_managed_identity(
        azure.exclude_managed_identity.unwrap_or(false),
    );
    let credential = TokenCredential::from_settings(
        azure.tenant_id.clone(),
        azure.client_id.clone(),
        azure.client_secret.clone(),
        options,
    );
    let lakehouse_port = match OneLakeClient::new(azure.storage_account.as_deref(), credential) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("Failed to create OneLake client: {}", e);
            process::exit(1);
        }
    };

    let extraction = config.extraction.clone().unwrap_or_default();
    let backend = extraction.backend.as_deref().unwrap_or("odbc");
    let extraction_port: Arc<dyn ExtractionPort> = match backend {
        "bcp" => {
            let separator = extraction
                .separator
                .as_deref()
                .and_then(|s| s.bytes().next())
                .unwrap_or(b',');
            Arc::new(BcpExtractionAdapter::new(separator))
        }
        _ => {
            #[cfg(feature = "odbc")]
            {
                let driver = extraction
                    .driver
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SQL_DRIVER.to_string());
                let batch_size = extraction.batch_size.unwrap_or(5000);
                let max_text_length = extraction.max_text_length.unwrap_or(4096);
                match OdbcExtractionAdapter::new(driver, batch_size, max_text_length) {
                    Ok(adapter) => Arc::new(adapter),
                    Err(e) => {
                        error!("Failed to initialize ODBC: {}", e);
                        process::exit(1);
                    }
                }
            }
            #[cfg(not(feature = "odbc"))]
            {
                error!("This build has no ODBC support; use --extractor bcp.");
                process::exit(1);
            }
        }
    };

    let writer_port = Arc::new(DeltaTableWriter::default());
    let confirm_port = Arc::new(TerminalConfirm);

    // 5. Run Orchestrator
    let orchestrator =
        UploadOrchestrator::new(extraction_port, writer_port, lakehouse_port, confirm_port);

    let request = UploadRequest {
        connection: ConnectionDescriptor::new(
            config.connection.server.clone(),
            config.connection.database.clone(),
        ),
        sources: SourceSpec::Raw(config.upload.source.clone().unwrap_or_default()),
        workspace: config.upload.workspace.clone(),
        lakehouse: config.upload.lakehouse.clone(),
        mode: config.upload.mode.unwrap_or_default(),
        target_table: config.upload.target_table.clone(),
        temp_root: config
            .upload
            .temp_table_location
            .clone()
            .unwrap_or_else(|| DEFAULT_TEMP_ROOT.to_string()),
    };

    info!(
        "Starting copy from {} to lakehouse {}",
        config.connection.server, config.upload.lakehouse
    );
    match orchestrator.upload(&request) {
        Ok(()) => info!("Copy finished."),
        Err(e @ CopyError::ConflictError(_)) => {
            error!("{}", e);
            process::exit(1);
        }
        Err(e) => {
            error!("Copy failed: {}", e);
            process::exit(2);
        }
    }
}
