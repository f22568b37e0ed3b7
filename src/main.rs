use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use beenzer_server::config::{self, AppConfig, FileConfig};
use beenzer_server::server::websocket::{hub::DEFAULT_CHANNEL_CAPACITY, session::DEFAULT_QUEUE_CAPACITY};
use beenzer_server::server::{metrics, run_server, RequestsLoggingLevel, ServerConfig};
use beenzer_server::user::{SqliteUserStore, UserStore};

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(format!("Error resolving path '{}': {}", s, msg));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(original_path))
}

fn parse_dir(s: &str) -> Result<PathBuf, String> {
    let path = parse_path(s)?;
    if !path.exists() {
        return Err(format!("Directory does not exist: {}", s));
    }
    if !path.is_dir() {
        return Err(format!("Path is not a directory: {}", s));
    }
    Ok(path)
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding the user database (users.db).
    /// Can also be specified in config file.
    #[clap(long, value_parser = parse_dir)]
    pub db_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 4000)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Frames a websocket session may have queued before sends to it are dropped.
    #[clap(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub outbound_queue_capacity: usize,

    /// Pending register/unregister/broadcast requests the hub buffers.
    #[clap(long, default_value_t = DEFAULT_CHANNEL_CAPACITY)]
    pub hub_channel_capacity: usize,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            db_dir: args.db_dir.clone(),
            port: args.port,
            metrics_port: args.metrics_port,
            logging_level: args.logging_level.clone(),
            outbound_queue_capacity: args.outbound_queue_capacity,
            hub_channel_capacity: args.hub_channel_capacity,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let app_config = AppConfig::resolve(&(&cli_args).into(), file_config)?;

    info!("Initializing metrics...");
    metrics::init_metrics();

    let user_db_path = app_config.user_db_path();
    info!("Opening user database at {:?}...", user_db_path);
    let user_store: Arc<dyn UserStore> = Arc::new(SqliteUserStore::new(&user_db_path)?);

    let server_config = ServerConfig {
        requests_logging_level: app_config.logging_level.clone(),
        port: app_config.port,
        metrics_port: app_config.metrics_port,
        outbound_queue_capacity: app_config.websocket.outbound_queue_capacity,
    };

    let shutdown_token = CancellationToken::new();
    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        signal_token.cancel();
    });

    info!("Ready to serve at port {}!", app_config.port);
    info!("Metrics available at port {}!", app_config.metrics_port);
    run_server(
        server_config,
        user_store,
        app_config.websocket.hub_channel_capacity,
        shutdown_token,
    )
    .await
}
