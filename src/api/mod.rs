pub mod health;
pub mod metrics;

use metrics_exporter_prometheus::PrometheusHandle;

use crate::dns::DnsConfigStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Desired DNS configuration, swapped by the config watcher
    pub dns: DnsConfigStore,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(dns: DnsConfigStore) -> Self {
        Self { dns, metrics: None }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
