//! Prometheus metrics for pos-service.
//!
//! HTTP request counters come from the shared `metrics_middleware`; this
//! module adds the business counters and renders everything for `/metrics`.

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use service_core::error::AppError;
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Call once at startup, before any
/// counter is touched.
pub fn init_metrics() -> Result<(), AppError> {
    let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
        tracing::error!("Failed to install Prometheus recorder: {}", e);
        AppError::InternalError(anyhow::anyhow!(e))
    })?;

    if METRICS_HANDLE.set(handle).is_err() {
        return Err(AppError::InternalError(anyhow::anyhow!(
            "metrics handle already initialized"
        )));
    }
    Ok(())
}

/// Current metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

pub fn record_bill_created() {
    counter!("pos_bills_created_total").increment(1);
}

pub fn record_bill_archived() {
    counter!("pos_bills_archived_total").increment(1);
}

/// `kind` is the export name, e.g. `bill-sales` or `day-summary`.
pub fn record_export(kind: &'static str) {
    counter!("pos_exports_total", "kind" => kind).increment(1);
}
