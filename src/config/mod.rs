mod file_config;

pub use file_config::{FileConfig, WebSocketConfig};

use crate::server::websocket::{hub::DEFAULT_CHANNEL_CAPACITY, session::DEFAULT_QUEUE_CAPACITY};
use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub outbound_queue_capacity: usize,
    pub hub_channel_capacity: usize,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            db_dir: None,
            port: 4000,
            metrics_port: 9091,
            logging_level: RequestsLoggingLevel::default(),
            outbound_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            hub_channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub websocket: WebSocketSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebSocketSettings {
    pub outbound_queue_capacity: usize,
    pub hub_channel_capacity: usize,
}

impl Default for WebSocketSettings {
    fn default() -> Self {
        Self {
            outbound_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            hub_channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = match file.logging_level {
            Some(s) => match parse_logging_level(&s) {
                Some(level) => level,
                None => bail!("Invalid logging_level in config file: {}", s),
            },
            None => cli.logging_level.clone(),
        };

        let ws_file = file.websocket.unwrap_or_default();
        let websocket = WebSocketSettings {
            outbound_queue_capacity: ws_file
                .outbound_queue_capacity
                .unwrap_or(cli.outbound_queue_capacity),
            hub_channel_capacity: ws_file
                .hub_channel_capacity
                .unwrap_or(cli.hub_channel_capacity),
        };
        if websocket.outbound_queue_capacity == 0 {
            bail!("outbound_queue_capacity must be at least 1");
        }
        if websocket.hub_channel_capacity == 0 {
            bail!("hub_channel_capacity must be at least 1");
        }

        Ok(Self {
            db_dir,
            port,
            metrics_port,
            logging_level,
            websocket,
        })
    }

    pub fn user_db_path(&self) -> PathBuf {
        self.db_dir.join("users.db")
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
