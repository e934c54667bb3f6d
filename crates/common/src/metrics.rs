//! Prometheus counters for the notes backend (default registry).

use once_cell::sync::Lazy;
use prometheus::{
    register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec, TextEncoder,
};

pub static REGISTRATIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("notes_registrations_total", "Total successful user registrations")
        .expect("register registrations_total")
});

pub static UPLOADS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("notes_uploads_total", "Total files stored")
        .expect("register uploads_total")
});

pub static UPLOAD_BYTES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("notes_upload_bytes_total", "Total bytes stored by uploads")
        .expect("register upload_bytes_total")
});

pub static DELETES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("notes_deletes_total", "Total files deleted")
        .expect("register deletes_total")
});

pub static REGISTRY_CONFLICTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "notes_registry_conflicts_total",
        "Registry writes rejected because the stored version moved"
    )
    .expect("register registry_conflicts_total")
});

/// Backing store calls, labelled by operation (`get`, `put`, `delete`, `list`).
pub static BACKING_STORE_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "notes_backing_store_requests_total",
        "Requests issued to the backing content store",
        &["op"]
    )
    .expect("register backing_store_requests_total")
});

pub static BACKING_STORE_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "notes_backing_store_errors_total",
        "Backing content store requests that failed",
        &["op"]
    )
    .expect("register backing_store_errors_total")
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_metrics_include_touched_counters() {
        UPLOADS_TOTAL.inc();
        BACKING_STORE_REQUESTS_TOTAL.with_label_values(&["get"]).inc();
        let (status, text) = encode_metrics();
        assert_eq!(status, axum::http::StatusCode::OK);
        assert!(text.contains("notes_uploads_total"));
        assert!(text.contains("notes_backing_store_requests_total{op=\"get\"}"));
    }
}
