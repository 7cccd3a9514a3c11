use once_cell::sync::Lazy;
use prometheus::{register_int_counter, Encoder, IntCounter, TextEncoder};

// Prometheus metrics (default registry)
pub static LOADS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("shift_store_loads_total", "Total collection loads")
        .expect("register loads_total")
});

pub static SAVES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("shift_store_saves_total", "Total collection saves")
        .expect("register saves_total")
});

pub static DEFAULTS_WRITTEN_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "shift_store_defaults_written_total",
        "Collections created from a caller-supplied default on first load"
    )
    .expect("register defaults_written_total")
});

pub static CORRUPT_DOCUMENTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "shift_store_corrupt_documents_total",
        "Loads that found a file which is not valid JSON"
    )
    .expect("register corrupt_documents_total")
});

pub static STORE_ERRORS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("shift_store_errors_total", "Filesystem errors while loading or saving")
        .expect("register errors_total")
});

pub fn encode_metrics() -> (axum::http::StatusCode, String) {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encode error: {e}"),
        );
    }
    (
        axum::http::StatusCode::OK,
        String::from_utf8(buffer).unwrap_or_default(),
    )
}
