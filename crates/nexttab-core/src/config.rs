//! Storage configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use nexttab_cell::CellOptions;
use nexttab_storage::SyncQuota;

use crate::error::CoreError;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub data_dir: PathBuf,
    /// Database backing the synced area
    pub sync_database_path: PathBuf,
    /// Database backing the local area, opened on first use
    pub local_database_path: PathBuf,
    pub sync_quota: SyncQuota,
    /// Apply changes written by other contexts as they happen
    pub live_update: bool,
}

impl Config {
    pub const DATA_DIR_ENV: &'static str = "NEXTTAB_DATA_DIR";

    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            sync_database_path: data_dir.join("nexttab-sync.db"),
            local_database_path: data_dir.join("nexttab-local.db"),
            data_dir,
            sync_quota: SyncQuota::default(),
            live_update: true,
        }
    }

    /// `$NEXTTAB_DATA_DIR` if set, else `nexttab` under the platform's local
    /// data directory.
    pub fn default_data_dir() -> PathBuf {
        if let Some(dir) = std::env::var_os(Self::DATA_DIR_ENV).filter(|d| !d.is_empty()) {
            return PathBuf::from(dir);
        }
        dirs::data_local_dir()
            .map(|d| d.join("nexttab"))
            .unwrap_or_else(|| PathBuf::from(".nexttab"))
    }

    /// Reads a JSON config file. Missing fields take their defaults, with
    /// database paths following `data_dir`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let partial: PartialConfig = serde_json::from_str(&text)
            .map_err(|e| CoreError::Config(format!("{}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(partial.resolve())
    }

    pub fn cell_options(&self) -> CellOptions {
        CellOptions {
            live_update: self.live_update,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::default_data_dir())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PartialConfig {
    data_dir: Option<PathBuf>,
    sync_database_path: Option<PathBuf>,
    local_database_path: Option<PathBuf>,
    sync_quota: Option<SyncQuota>,
    live_update: Option<bool>,
}

impl PartialConfig {
    fn resolve(self) -> Config {
        let mut config = Config::new(self.data_dir.unwrap_or_else(Config::default_data_dir));
        if let Some(path) = self.sync_database_path {
            config.sync_database_path = path;
        }
        if let Some(path) = self.local_database_path {
            config.local_database_path = path;
        }
        if let Some(quota) = self.sync_quota {
            config.sync_quota = quota;
        }
        if let Some(live_update) = self.live_update {
            config.live_update = live_update;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_follow_data_dir() {
        let config = Config::new(PathBuf::from("/tmp/nt"));
        assert_eq!(config.sync_database_path, PathBuf::from("/tmp/nt/nexttab-sync.db"));
        assert_eq!(config.local_database_path, PathBuf::from("/tmp/nt/nexttab-local.db"));
        assert!(config.live_update);
        assert_eq!(config.sync_quota, SyncQuota::default());
    }

    #[test]
    fn test_load_fills_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"data_dir": "/srv/nexttab", "live_update": false, "sync_quota": {"max_items": 10}}"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/nexttab"));
        assert_eq!(config.sync_database_path, PathBuf::from("/srv/nexttab/nexttab-sync.db"));
        assert!(!config.cell_options().live_update);
        assert_eq!(config.sync_quota.max_items, 10);
        assert_eq!(config.sync_quota.bytes_per_item, 8_192);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Config::load(dir.path().join("missing.json")),
            Err(CoreError::Config(_))
        ));

        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Config::load(&path), Err(CoreError::Config(_))));
    }
}
