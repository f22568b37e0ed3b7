use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all Beenzer metrics
const PREFIX: &str = "beenzer";

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // WebSocket Hub Metrics
    pub static ref WS_CONNECTED_SESSIONS: Gauge = Gauge::new(
        format!("{PREFIX}_ws_connected_sessions"),
        "Number of sessions currently registered with the hub"
    ).expect("Failed to create ws_connected_sessions metric");

    pub static ref WS_FRAMES_DROPPED_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_ws_frames_dropped_total"),
        "Direct sends dropped because the session queue was full"
    ).expect("Failed to create ws_frames_dropped_total metric");

    pub static ref WS_SESSIONS_EVICTED_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_ws_sessions_evicted_total"),
        "Sessions removed because they could not accept a broadcast"
    ).expect("Failed to create ws_sessions_evicted_total metric");

    pub static ref WS_BROADCASTS_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_ws_broadcasts_total"),
        "Broadcasts fanned out by the hub"
    ).expect("Failed to create ws_broadcasts_total metric");

    pub static ref WS_INBOUND_EVENTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_ws_inbound_events_total"), "Inbound client frames by event and outcome"),
        &["event", "outcome"]
    ).expect("Failed to create ws_inbound_events_total metric");

    pub static ref PROCESS_MEMORY_BYTES: Gauge = Gauge::new(
        format!("{PREFIX}_process_memory_bytes"),
        "Process memory usage in bytes"
    ).expect("Failed to create process_memory_bytes metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(WS_CONNECTED_SESSIONS.clone()));
    let _ = REGISTRY.register(Box::new(WS_FRAMES_DROPPED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(WS_SESSIONS_EVICTED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(WS_BROADCASTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(WS_INBOUND_EVENTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PROCESS_MEMORY_BYTES.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

pub fn set_ws_connected_sessions(count: usize) {
    WS_CONNECTED_SESSIONS.set(count as f64);
}

pub fn record_ws_frame_dropped() {
    WS_FRAMES_DROPPED_TOTAL.inc();
}

pub fn record_ws_session_evicted() {
    WS_SESSIONS_EVICTED_TOTAL.inc();
}

pub fn record_ws_broadcast() {
    WS_BROADCASTS_TOTAL.inc();
}

/// Record the outcome of dispatching one inbound frame.
/// `event` should be a bounded label; unknown event names are collapsed by the caller.
pub fn record_ws_inbound_event(event: &str, outcome: &str) {
    WS_INBOUND_EVENTS_TOTAL
        .with_label_values(&[event, outcome])
        .inc();
}

/// Update process memory usage
pub fn update_memory_usage() {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            let rss_kb = status
                .lines()
                .find(|line| line.starts_with("VmRSS:"))
                .and_then(|line| line.split_whitespace().nth(1))
                .and_then(|kb| kb.parse::<f64>().ok());
            if let Some(kb) = rss_kb {
                PROCESS_MEMORY_BYTES.set(kb * 1024.0);
            }
        }
    }
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    update_memory_usage();

    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_default();
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
