use axum::{extract::State, http::StatusCode, response::IntoResponse};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::api::AppState;

/// Admission decisions, labelled by `outcome` (add, replace, denied)
pub const ADMISSIONS_TOTAL: &str = "dnsconfig_webhook_admissions_total";

/// Config reload attempts, labelled by `result`
pub const CONFIG_RELOADS_TOTAL: &str = "dnsconfig_webhook_config_reloads_total";

/// Install the global Prometheus recorder
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    ::metrics::describe_counter!(ADMISSIONS_TOTAL, "Pod admission decisions by outcome");
    ::metrics::describe_counter!(CONFIG_RELOADS_TOTAL, "DNS config reload attempts by result");
    Ok(handle)
}

/// Prometheus metrics endpoint
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            handle.render(),
        ),
        None => (
            StatusCode::NOT_FOUND,
            [("content-type", "text/plain; charset=utf-8")],
            "metrics recorder not installed\n".to_string(),
        ),
    }
}
