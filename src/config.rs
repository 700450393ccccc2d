use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::dns::DEFAULT_CONFIG_PATH;

/// Environment variable prefix, e.g. `WEBHOOK_PORT`
const ENV_PREFIX: &str = "WEBHOOK";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_cert_file")]
    pub cert_file: PathBuf,

    #[serde(default = "default_key_file")]
    pub key_file: PathBuf,

    #[serde(default = "default_dns_config_path")]
    pub dns_config_path: PathBuf,

    #[serde(default = "default_reload_interval_secs")]
    pub reload_interval_secs: u64,

    #[serde(default = "default_read_header_timeout_secs")]
    pub read_header_timeout_secs: u64,
}

fn default_port() -> u16 {
    8443
}

fn default_cert_file() -> PathBuf {
    PathBuf::from("/etc/webhook/certs/tls.crt")
}

fn default_key_file() -> PathBuf {
    PathBuf::from("/etc/webhook/certs/tls.key")
}

fn default_dns_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_PATH)
}

fn default_reload_interval_secs() -> u64 {
    1
}

fn default_read_header_timeout_secs() -> u64 {
    3
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        config
            .try_deserialize()
            .context("invalid webhook configuration in environment")
    }

    /// Check that the TLS material is in place
    pub fn validate(&self) -> Result<()> {
        check_file("cert", &self.cert_file)?;
        check_file("key", &self.key_file)?;
        if self.reload_interval_secs == 0 {
            bail!("reload interval must be at least one second");
        }
        if self.read_header_timeout_secs == 0 {
            bail!("read header timeout must be at least one second");
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }

    pub fn reload_interval(&self) -> Duration {
        Duration::from_secs(self.reload_interval_secs)
    }

    /// How long a client gets to send its request headers
    pub fn read_header_timeout(&self) -> Duration {
        Duration::from_secs(self.read_header_timeout_secs)
    }
}

fn check_file(what: &str, path: &Path) -> Result<()> {
    std::fs::metadata(path)
        .with_context(|| format!("{} file not found: {}", what, path.display()))?;
    Ok(())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            cert_file: default_cert_file(),
            key_file: default_key_file(),
            dns_config_path: default_dns_config_path(),
            reload_interval_secs: default_reload_interval_secs(),
            read_header_timeout_secs: default_read_header_timeout_secs(),
        }
    }
}

/// Translate a `LOG_LEVEL` value into a tracing filter directive.
///
/// Numeric values follow klog verbosity (`0`-`1` info, `2`-`3` debug, `4`+
/// trace); anything else is passed through as a filter directive.
pub fn log_filter_from_level(level: &str) -> String {
    match level.trim().parse::<u8>() {
        Ok(0..=1) => "info".to_string(),
        Ok(2..=3) => "debug".to_string(),
        Ok(_) => "trace".to_string(),
        Err(_) => level.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 8443);
        assert_eq!(config.cert_file, PathBuf::from("/etc/webhook/certs/tls.crt"));
        assert_eq!(config.key_file, PathBuf::from("/etc/webhook/certs/tls.key"));
        assert_eq!(
            config.dns_config_path,
            PathBuf::from("/etc/webhook/config/config.yaml")
        );
        assert_eq!(config.reload_interval(), Duration::from_secs(1));
        assert_eq!(config.read_header_timeout(), Duration::from_secs(3));
        assert_eq!(config.bind_addr().port(), 8443);
    }

    #[test]
    fn test_validate_requires_tls_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config {
            cert_file: dir.path().join("tls.crt"),
            key_file: dir.path().join("tls.key"),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        std::fs::write(&config.cert_file, "cert").unwrap();
        assert!(config.validate().is_err());

        std::fs::write(&config.key_file, "key").unwrap();
        assert!(config.validate().is_ok());

        config.reload_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_header_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            cert_file: dir.path().join("tls.crt"),
            key_file: dir.path().join("tls.key"),
            read_header_timeout_secs: 0,
            ..Config::default()
        };
        std::fs::write(&config.cert_file, "cert").unwrap();
        std::fs::write(&config.key_file, "key").unwrap();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("read header timeout"));
    }

    #[test]
    fn test_log_filter_from_level() {
        assert_eq!(log_filter_from_level("0"), "info");
        assert_eq!(log_filter_from_level("2"), "debug");
        assert_eq!(log_filter_from_level("4"), "trace");
        assert_eq!(log_filter_from_level("warn"), "warn");
        assert_eq!(
            log_filter_from_level(" dnsconfig_webhook=debug "),
            "dnsconfig_webhook=debug"
        );
    }
}
