//! Desired DNS configuration
//!
//! This module owns the DNS configuration the webhook enforces:
//! - Loading it from the mounted config file, or the built-in default
//! - Sharing it between request handlers through an atomic-swap store
//! - Reloading it in the background when the file changes

mod source;
mod store;
mod watcher;

pub use source::{
    default_dns_config, load_initial, parse_dns_config, read_dns_config, InitialLoad,
    DEFAULT_CONFIG_PATH,
};
pub use store::DnsConfigStore;
pub use watcher::{spawn_config_watcher, ConfigWatcher, PollOutcome};

/// The Kubernetes native Pod DNS configuration type
pub use k8s_openapi::api::core::v1::PodDNSConfig as DnsConfig;
