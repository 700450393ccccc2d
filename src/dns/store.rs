use std::sync::Arc;

use arc_swap::ArcSwap;

use super::{default_dns_config, DnsConfig};

/// Shared holder of the current desired DNS configuration.
///
/// Readers get an immutable snapshot without locking; `set` swaps the whole
/// value at once, so a reader sees either the old or the new configuration
/// and never a mix of both.
#[derive(Clone)]
pub struct DnsConfigStore {
    current: Arc<ArcSwap<DnsConfig>>,
}

impl DnsConfigStore {
    pub fn new(config: DnsConfig) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(config)),
        }
    }

    /// Snapshot of the current configuration
    pub fn get(&self) -> Arc<DnsConfig> {
        self.current.load_full()
    }

    /// Replace the current configuration
    pub fn set(&self, config: DnsConfig) {
        self.current.store(Arc::new(config));
    }
}

impl Default for DnsConfigStore {
    fn default() -> Self {
        Self::new(default_dns_config())
    }
}

impl std::fmt::Debug for DnsConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsConfigStore")
            .field("current", &self.get())
            .finish()
    }
}
