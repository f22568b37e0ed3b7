use super::RequestsLoggingLevel;
use crate::server::websocket::session::DEFAULT_QUEUE_CAPACITY;

#[derive(Clone)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    pub metrics_port: u16,
    /// Capacity of each websocket session's outbound queue.
    pub outbound_queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 4000,
            metrics_port: 9091,
            outbound_queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}
