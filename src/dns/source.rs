//! Reading the desired DNS configuration from the mounted config file

use std::path::Path;
use std::time::SystemTime;

use k8s_openapi::api::core::v1::PodDNSConfigOption;
use serde_yaml::{Mapping, Value};
use tracing::{debug, info, warn};

use super::DnsConfig;
use crate::error::DnsConfigError;

/// Where the ConfigMap holding the DNS configuration is mounted
pub const DEFAULT_CONFIG_PATH: &str = "/etc/webhook/config/config.yaml";

/// Key holding a native `PodDNSConfig` document
const NATIVE_KEY: &str = "dnsConfig";

/// Built-in configuration used when the config file cannot be loaded at startup
pub fn default_dns_config() -> DnsConfig {
    DnsConfig {
        options: Some(vec![PodDNSConfigOption {
            name: Some("ndots".to_string()),
            value: Some("1".to_string()),
        }]),
        ..Default::default()
    }
}

/// Parse a DNS configuration document.
///
/// Two shapes are accepted. The native one nests a `PodDNSConfig` under
/// `dnsConfig`:
///
/// ```yaml
/// dnsConfig:
///   options:
///     - name: ndots
///       value: "5"
/// ```
///
/// The shorthand one maps resolver option names to values, with
/// `nameservers` and `searches` as reserved list keys:
///
/// ```yaml
/// ndots: "5"
/// nameservers: ["10.0.0.10"]
/// ```
pub fn parse_dns_config(data: &[u8]) -> Result<DnsConfig, DnsConfigError> {
    let document: Value = serde_yaml::from_slice(data)?;

    let mapping = match document {
        Value::Mapping(mapping) => mapping,
        Value::Null => return Err(DnsConfigError::invalid("document is empty")),
        _ => {
            return Err(DnsConfigError::invalid(
                "expected a mapping at the top level",
            ))
        }
    };

    let config = match mapping.get(NATIVE_KEY) {
        Some(native) => serde_yaml::from_value::<DnsConfig>(native.clone())?,
        None => parse_shorthand(&mapping)?,
    };

    validate(&config)?;
    Ok(config)
}

fn parse_shorthand(mapping: &Mapping) -> Result<DnsConfig, DnsConfigError> {
    let mut config = DnsConfig::default();
    let mut options = Vec::new();

    for (key, value) in mapping {
        let name = key
            .as_str()
            .ok_or_else(|| DnsConfigError::invalid(format!("non-string key {:?}", key)))?;

        match name {
            "nameservers" => config.nameservers = Some(string_list(name, value)?),
            "searches" => config.searches = Some(string_list(name, value)?),
            _ => options.push(PodDNSConfigOption {
                name: Some(name.to_string()),
                value: scalar_value(name, value)?,
            }),
        }
    }

    if !options.is_empty() {
        config.options = Some(options);
    }
    Ok(config)
}

fn scalar_value(name: &str, value: &Value) -> Result<Option<String>, DnsConfigError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        _ => Err(DnsConfigError::invalid(format!(
            "option {} must have a scalar value",
            name
        ))),
    }
}

fn string_list(name: &str, value: &Value) -> Result<Vec<String>, DnsConfigError> {
    let items = value
        .as_sequence()
        .ok_or_else(|| DnsConfigError::invalid(format!("{} must be a list", name)))?;

    items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                DnsConfigError::invalid(format!("{} entries must be strings", name))
            })
        })
        .collect()
}

fn validate(config: &DnsConfig) -> Result<(), DnsConfigError> {
    let options = config.options.as_deref().unwrap_or_default();
    if options.iter().any(|o| o.name.as_deref().unwrap_or("").is_empty()) {
        return Err(DnsConfigError::invalid("every option needs a name"));
    }

    let nameservers = config.nameservers.as_deref().unwrap_or_default();
    let searches = config.searches.as_deref().unwrap_or_default();
    if options.is_empty() && nameservers.is_empty() && searches.is_empty() {
        return Err(DnsConfigError::invalid(
            "no options, nameservers or searches configured",
        ));
    }

    Ok(())
}

/// Read and parse the config file at `path`
pub async fn read_dns_config(path: &Path) -> Result<DnsConfig, DnsConfigError> {
    let data = tokio::fs::read(path)
        .await
        .map_err(|source| DnsConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    parse_dns_config(&data)
}

/// Result of the startup load
#[derive(Debug, Clone)]
pub struct InitialLoad {
    pub config: DnsConfig,
    /// Modification time of the file the config came from; `None` when the
    /// built-in default is in use
    pub modified: Option<SystemTime>,
}

/// Load the configuration at startup, falling back to the built-in default
/// when the file is absent, unreadable or invalid.
pub async fn load_initial(path: &Path) -> InitialLoad {
    // Stat before reading so a write racing with startup is picked up by the
    // watcher on its first poll.
    let modified = tokio::fs::metadata(path)
        .await
        .and_then(|meta| meta.modified())
        .ok();

    match read_dns_config(path).await {
        Ok(config) => {
            info!("Loaded DNS configuration from {}", path.display());
            debug!(config = ?config, "Initial DNS configuration");
            InitialLoad { config, modified }
        }
        Err(e) => {
            warn!("{}; using built-in default DNS configuration", e);
            InitialLoad {
                config: default_dns_config(),
                modified: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(name: &str, value: Option<&str>) -> PodDNSConfigOption {
        PodDNSConfigOption {
            name: Some(name.to_string()),
            value: value.map(str::to_string),
        }
    }

    #[test]
    fn test_default_config_is_ndots_one() {
        let json = serde_json::to_value(default_dns_config()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"options": [{"name": "ndots", "value": "1"}]})
        );
    }

    #[test]
    fn test_parse_native_document() {
        let yaml = br#"
dnsConfig:
  nameservers:
    - 10.0.0.10
  searches:
    - svc.cluster.local
  options:
    - name: ndots
      value: "2"
    - name: edns0
"#;
        let config = parse_dns_config(yaml).unwrap();

        assert_eq!(config.nameservers, Some(vec!["10.0.0.10".to_string()]));
        assert_eq!(config.searches, Some(vec!["svc.cluster.local".to_string()]));
        assert_eq!(
            config.options,
            Some(vec![option("ndots", Some("2")), option("edns0", None)])
        );
    }

    #[test]
    fn test_parse_shorthand_document() {
        let config = parse_dns_config(b"ndots: \"5\"\n").unwrap();
        assert_eq!(config.options, Some(vec![option("ndots", Some("5"))]));
        assert_eq!(config.nameservers, None);
        assert_eq!(config.searches, None);
    }

    #[test]
    fn test_shorthand_keeps_document_order_and_stringifies() {
        let yaml = b"timeout: 2\nndots: 3\nrotate: ~\nuse-vc: true\nsearches: [a.local, b.local]\n";
        let config = parse_dns_config(yaml).unwrap();

        assert_eq!(
            config.options,
            Some(vec![
                option("timeout", Some("2")),
                option("ndots", Some("3")),
                option("rotate", None),
                option("use-vc", Some("true")),
            ])
        );
        assert_eq!(
            config.searches,
            Some(vec!["a.local".to_string(), "b.local".to_string()])
        );
    }

    #[test]
    fn test_parse_rejects_empty_and_malformed_documents() {
        assert!(matches!(
            parse_dns_config(b""),
            Err(DnsConfigError::Invalid(_))
        ));
        assert!(matches!(
            parse_dns_config(b"- ndots\n"),
            Err(DnsConfigError::Invalid(_))
        ));
        assert!(matches!(
            parse_dns_config(b"ndots: [1, 2]\n"),
            Err(DnsConfigError::Invalid(_))
        ));
        assert!(matches!(
            parse_dns_config(b"nameservers: 10.0.0.10\n"),
            Err(DnsConfigError::Invalid(_))
        ));
        assert!(matches!(
            parse_dns_config(b"ndots: \"5\n"),
            Err(DnsConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_parse_rejects_empty_native_config() {
        assert!(matches!(
            parse_dns_config(b"dnsConfig: {}\n"),
            Err(DnsConfigError::Invalid(_))
        ));
        assert!(matches!(
            parse_dns_config(b"dnsConfig:\n  options:\n    - value: \"1\"\n"),
            Err(DnsConfigError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_load_initial_falls_back_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_initial(&dir.path().join("config.yaml")).await;

        assert_eq!(loaded.config, default_dns_config());
        assert!(loaded.modified.is_none());
    }

    #[tokio::test]
    async fn test_load_initial_falls_back_when_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "dnsConfig: [").unwrap();

        let loaded = load_initial(&path).await;

        assert_eq!(loaded.config, default_dns_config());
        assert!(loaded.modified.is_none());
    }

    #[tokio::test]
    async fn test_load_initial_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "ndots: \"4\"\n").unwrap();

        let loaded = load_initial(&path).await;

        assert_eq!(loaded.config.options, Some(vec![option("ndots", Some("4"))]));
        assert!(loaded.modified.is_some());
    }
}
