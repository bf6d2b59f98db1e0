//! Prometheus metrics endpoint.

use crate::server::RelayMetrics;
use axum::{http::header::CONTENT_TYPE, response::IntoResponse, Extension};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Prometheus metrics handler.
///
/// Returns metrics in Prometheus text format. All values are counters,
/// monotonic since startup.
pub async fn metrics_handler(Extension(metrics): Extension<Arc<RelayMetrics>>) -> impl IntoResponse {
    let sessions = metrics.sessions_total.load(Ordering::Relaxed);
    let failed = metrics.sessions_failed.load(Ordering::Relaxed);
    let attempts = metrics.handshake_attempts.load(Ordering::Relaxed);
    let waits = metrics.retry_waits.load(Ordering::Relaxed);
    let bytes_up = metrics.bytes_to_device.load(Ordering::Relaxed);
    let bytes_down = metrics.bytes_to_client.load(Ordering::Relaxed);

    let body = format!(
        r#"# HELP jvc_relay_info Server information
# TYPE jvc_relay_info gauge
jvc_relay_info{{version="{version}"}} 1

# HELP jvc_relay_sessions_total Total client connections accepted
# TYPE jvc_relay_sessions_total counter
jvc_relay_sessions_total {sessions}

# HELP jvc_relay_sessions_failed_total Sessions dropped without a device handshake
# TYPE jvc_relay_sessions_failed_total counter
jvc_relay_sessions_failed_total {failed}

# HELP jvc_relay_handshake_attempts_total Device handshake attempts, including retries
# TYPE jvc_relay_handshake_attempts_total counter
jvc_relay_handshake_attempts_total {attempts}

# HELP jvc_relay_retry_waits_total Waits taken between handshake attempts
# TYPE jvc_relay_retry_waits_total counter
jvc_relay_retry_waits_total {waits}

# HELP jvc_relay_bytes_to_device_total Command bytes relayed client to device
# TYPE jvc_relay_bytes_to_device_total counter
jvc_relay_bytes_to_device_total {bytes_up}

# HELP jvc_relay_bytes_to_client_total Response bytes relayed device to client
# TYPE jvc_relay_bytes_to_client_total counter
jvc_relay_bytes_to_client_total {bytes_down}
"#,
        version = env!("CARGO_PKG_VERSION"),
    );

    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}
