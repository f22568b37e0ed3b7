pub mod config;
mod http_layers;
pub mod metrics;
pub mod server;
pub mod state;
mod user_routes;
pub mod websocket;

pub use config::ServerConfig;
pub use http_layers::*;
pub use server::run_server;
