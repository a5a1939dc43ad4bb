//! User settings record

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::ops::Deref;
use std::sync::Arc;

use nexttab_cell::{CellOptions, StorageCell};
use nexttab_storage::Backend;

use crate::Result;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WallpaperType {
    /// Remote image referenced by `wallpaper_url`, syncs with the profile
    #[default]
    Url,
    /// Image held in this device's local store only
    Local,
}

impl WallpaperType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WallpaperType::Url => "url",
            WallpaperType::Local => "local",
        }
    }

    /// The value safe to carry to another device. A local image never
    /// travels, so `Local` maps to `Url`.
    pub fn synced_equivalent(self) -> Self {
        WallpaperType::Url
    }
}

/// Connection settings for the remote command server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MqttSettings {
    pub enabled: bool,
    pub username: String,
    pub secret_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub use_history_suggestion: bool,
    pub show_bookmarks_in_quick_url_menu: bool,
    pub show_open_tabs_in_quick_url_menu: bool,
    pub wallpaper_url: Option<String>,
    pub wallpaper_type: WallpaperType,
    pub mqtt_settings: MqttSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            use_history_suggestion: true,
            show_bookmarks_in_quick_url_menu: true,
            show_open_tabs_in_quick_url_menu: true,
            wallpaper_url: None,
            wallpaper_type: WallpaperType::Url,
            mqtt_settings: MqttSettings::default(),
        }
    }
}

#[derive(Clone)]
pub struct SettingsStore {
    cell: StorageCell<Settings>,
}

impl SettingsStore {
    pub const KEY: &'static str = "settings-storage-key";

    pub fn new(backend: Arc<dyn Backend>, options: CellOptions) -> Self {
        Self {
            cell: StorageCell::with_options(backend, Self::KEY, Settings::default(), options),
        }
    }

    /// Deep-merges a partial settings record; fields not in `patch` keep
    /// their current values.
    pub async fn merge(&self, patch: &Value) -> Result<Settings> {
        Ok(self.cell.patch(patch).await?)
    }

    pub async fn use_wallpaper_url(&self, url: impl Into<String>) -> Result<Settings> {
        self.merge(&json!({ "wallpaperUrl": url.into(), "wallpaperType": "url" }))
            .await
    }

    pub async fn use_local_wallpaper(&self) -> Result<Settings> {
        self.merge(&json!({ "wallpaperType": "local" })).await
    }
}

impl Deref for SettingsStore {
    type Target = StorageCell<Settings>;

    fn deref(&self) -> &Self::Target {
        &self.cell
    }
}
