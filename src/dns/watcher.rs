//! Background reload of the DNS configuration
//!
//! Polls the mounted config file and swaps the store contents when the file's
//! modification time moves past the last applied one. Failures keep the last
//! good configuration in place; the next tick simply tries again.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{read_dns_config, DnsConfigStore};
use crate::api::metrics::CONFIG_RELOADS_TOTAL;
use crate::error::DnsConfigError;

/// What a single poll did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// File not modified since the last applied reload
    Unchanged,
    /// New configuration installed in the store
    Reloaded,
    /// File could not be stat'ed (missing, remounting, ...)
    StatFailed,
    /// File changed but could not be read
    ReadFailed,
    /// File changed but did not contain a valid configuration
    ParseFailed,
}

impl PollOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            PollOutcome::Unchanged => "unchanged",
            PollOutcome::Reloaded => "reloaded",
            PollOutcome::StatFailed => "stat_failed",
            PollOutcome::ReadFailed => "read_failed",
            PollOutcome::ParseFailed => "parse_failed",
        }
    }
}

/// Polls the DNS config file and keeps the store in sync with it
#[derive(Debug)]
pub struct ConfigWatcher {
    path: PathBuf,
    store: DnsConfigStore,
    interval: Duration,
    last_applied: Option<SystemTime>,
}

impl ConfigWatcher {
    /// `last_applied` is the modification time of the file the store was
    /// initialised from, or `None` if the store holds the built-in default.
    pub fn new(
        path: impl Into<PathBuf>,
        store: DnsConfigStore,
        interval: Duration,
        last_applied: Option<SystemTime>,
    ) -> Self {
        Self {
            path: path.into(),
            store,
            interval,
            last_applied,
        }
    }

    pub fn last_applied(&self) -> Option<SystemTime> {
        self.last_applied
    }

    /// Run one Idle -> Reloading -> Idle cycle
    pub async fn poll_once(&mut self) -> PollOutcome {
        let modified = match tokio::fs::metadata(&self.path)
            .await
            .and_then(|meta| meta.modified())
        {
            Ok(modified) => modified,
            Err(e) => {
                warn!("Failed to stat DNS config {}: {}", self.path.display(), e);
                return PollOutcome::StatFailed;
            }
        };

        if self.last_applied.is_some_and(|last| modified <= last) {
            return PollOutcome::Unchanged;
        }

        info!("DNS config change detected, reloading {}", self.path.display());

        let outcome = match read_dns_config(&self.path).await {
            Ok(config) => {
                debug!(config = ?config, "Installing DNS configuration");
                self.store.set(config);
                self.last_applied = Some(modified);
                info!("Successfully reloaded DNS configuration");
                PollOutcome::Reloaded
            }
            Err(e @ DnsConfigError::Read { .. }) => {
                error!("Failed to read updated DNS config: {}", e);
                PollOutcome::ReadFailed
            }
            Err(e) => {
                error!("Failed to update DNS configuration: {}", e);
                PollOutcome::ParseFailed
            }
        };

        metrics::increment_counter!(CONFIG_RELOADS_TOTAL, "result" => outcome.as_str());
        outcome
    }

    /// Poll until `shutdown` is cancelled
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            "Watching {} for DNS config changes every {:?}",
            self.path.display(),
            self.interval
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the initial load already ran.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("DNS config watcher stopped");
                    return;
                }
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
            }
        }
    }
}

/// Spawn `watcher` on the runtime; it stops when `shutdown` is cancelled
pub fn spawn_config_watcher(watcher: ConfigWatcher, shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(watcher.run(shutdown))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::default_dns_config;
    use std::fs::File;
    use std::io::Write;
    use std::path::Path;

    fn write_with_mtime(path: &Path, contents: &str, secs: u64) -> SystemTime {
        let mut file = File::create(path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(secs);
        file.set_modified(mtime).unwrap();
        mtime
    }

    fn ndots_of(store: &DnsConfigStore) -> Option<String> {
        store
            .get()
            .options
            .as_ref()
            .and_then(|opts| opts.iter().find(|o| o.name.as_deref() == Some("ndots")))
            .and_then(|o| o.value.clone())
    }

    #[tokio::test]
    async fn test_missing_file_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let store = DnsConfigStore::default();
        let mut watcher = ConfigWatcher::new(
            dir.path().join("config.yaml"),
            store.clone(),
            Duration::from_secs(1),
            None,
        );

        assert_eq!(watcher.poll_once().await, PollOutcome::StatFailed);
        assert_eq!(watcher.poll_once().await, PollOutcome::StatFailed);
        assert_eq!(*store.get(), default_dns_config());
    }

    #[tokio::test]
    async fn test_reload_on_newer_mtime_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let store = DnsConfigStore::default();
        let mut watcher = ConfigWatcher::new(&path, store.clone(), Duration::from_secs(1), None);

        let first = write_with_mtime(&path, "ndots: \"3\"\n", 1_000);
        assert_eq!(watcher.poll_once().await, PollOutcome::Reloaded);
        assert_eq!(ndots_of(&store).as_deref(), Some("3"));
        assert_eq!(watcher.last_applied(), Some(first));

        assert_eq!(watcher.poll_once().await, PollOutcome::Unchanged);

        // Same mtime, different contents: not strictly newer
        write_with_mtime(&path, "ndots: \"9\"\n", 1_000);
        assert_eq!(watcher.poll_once().await, PollOutcome::Unchanged);
        assert_eq!(ndots_of(&store).as_deref(), Some("3"));

        write_with_mtime(&path, "ndots: \"4\"\n", 2_000);
        assert_eq!(watcher.poll_once().await, PollOutcome::Reloaded);
        assert_eq!(ndots_of(&store).as_deref(), Some("4"));
    }

    #[tokio::test]
    async fn test_parse_failure_keeps_last_good_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let applied = write_with_mtime(&path, "ndots: \"3\"\n", 1_000);
        let store = DnsConfigStore::new(crate::dns::parse_dns_config(b"ndots: \"3\"\n").unwrap());
        let mut watcher =
            ConfigWatcher::new(&path, store.clone(), Duration::from_secs(1), Some(applied));

        write_with_mtime(&path, "ndots: [\n", 2_000);
        let before = store.get();
        assert_eq!(watcher.poll_once().await, PollOutcome::ParseFailed);
        assert_eq!(*store.get(), *before);
        assert_eq!(watcher.last_applied(), Some(applied));

        // A later good write is still picked up
        write_with_mtime(&path, "ndots: \"6\"\n", 3_000);
        assert_eq!(watcher.poll_once().await, PollOutcome::Reloaded);
        assert_eq!(ndots_of(&store).as_deref(), Some("6"));
    }

    #[tokio::test]
    async fn test_read_failure_keeps_last_good_config() {
        let dir = tempfile::tempdir().unwrap();
        // A directory stats fine but cannot be read as a file
        let path = dir.path().join("config.yaml");
        std::fs::create_dir(&path).unwrap();
        let store = DnsConfigStore::default();
        let mut watcher = ConfigWatcher::new(&path, store.clone(), Duration::from_secs(1), None);

        assert_eq!(watcher.poll_once().await, PollOutcome::ReadFailed);
        assert_eq!(*store.get(), default_dns_config());
        assert_eq!(watcher.last_applied(), None);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = ConfigWatcher::new(
            dir.path().join("config.yaml"),
            DnsConfigStore::default(),
            Duration::from_millis(10),
            None,
        );
        let shutdown = CancellationToken::new();
        let handle = spawn_config_watcher(watcher, shutdown.clone());

        shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("watcher did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_run_picks_up_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let store = DnsConfigStore::default();
        let watcher = ConfigWatcher::new(&path, store.clone(), Duration::from_millis(10), None);
        let shutdown = CancellationToken::new();
        let handle = spawn_config_watcher(watcher, shutdown.clone());

        write_with_mtime(&path, "ndots: \"7\"\n", 5_000);

        let mut reloaded = false;
        for _ in 0..200 {
            if ndots_of(&store).as_deref() == Some("7") {
                reloaded = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        shutdown.cancel();
        handle.await.unwrap();
        assert!(reloaded, "watcher never installed the new config");
    }
}
