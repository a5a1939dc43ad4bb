//! Owner of every storage cell
//!
//! Cells are built here once and handed out as clones. Warm-up is an
//! explicit step the caller awaits.

use std::sync::Arc;

use nexttab_cell::StorageCell;
use nexttab_storage::{Backend, Database, LocalStore, SyncArea};

use crate::commands::{CommandSettings, COMMAND_SETTINGS_KEY};
use crate::config::Config;
use crate::error::CoreError;
use crate::onboarding::OnboardingStore;
use crate::quick_links::QuickLinkStore;
use crate::settings::SettingsStore;
use crate::theme::Theme;
use crate::transfer::DataTransfer;
use crate::wallpaper::LocalWallpaperStore;
use crate::Result;

/// Store name of the synced area
pub const SYNC_STORE: &str = "nexttab";
/// Store name of the local area
pub const LOCAL_STORE: &str = "nexttab-local";

pub struct StorageRegistry {
    config: Config,
    settings: SettingsStore,
    quick_links: QuickLinkStore,
    theme: StorageCell<Theme>,
    command_settings: StorageCell<CommandSettings>,
    onboarding: OnboardingStore,
    local_wallpaper: LocalWallpaperStore,
}

impl StorageRegistry {
    /// Opens the synced database. The local database is only opened when a
    /// local cell is first used.
    pub fn open(config: Config) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        if let Some(parent) = config.sync_database_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&config.sync_database_path)?;
        let sync_area = SyncArea::new(db, SYNC_STORE, config.sync_quota);
        let local_store = LocalStore::at_path(config.local_database_path.clone(), LOCAL_STORE);

        tracing::info!(
            sync = %config.sync_database_path.display(),
            local = %config.local_database_path.display(),
            "Opened storage registry"
        );
        Ok(Self::from_backends(config, &sync_area, &local_store))
    }

    /// Registry over in-memory databases, nothing touches disk.
    pub fn in_memory() -> Result<Self> {
        let config = Config::default();
        let sync_area = SyncArea::new(Database::open_in_memory()?, SYNC_STORE, config.sync_quota);
        let local_store = LocalStore::in_memory(LOCAL_STORE);
        Ok(Self::from_backends(config, &sync_area, &local_store))
    }

    /// Binds every cell to one context of each area.
    pub fn from_backends(config: Config, sync_area: &SyncArea, local_store: &LocalStore) -> Self {
        let options = config.cell_options();
        let synced: Arc<dyn Backend> = Arc::new(sync_area.context());
        let local: Arc<dyn Backend> = Arc::new(local_store.context());

        Self {
            settings: SettingsStore::new(synced.clone(), options),
            quick_links: QuickLinkStore::new(synced.clone(), options),
            theme: StorageCell::with_options(synced.clone(), Theme::KEY, Theme::default(), options),
            command_settings: StorageCell::with_options(
                synced,
                COMMAND_SETTINGS_KEY,
                CommandSettings::new(),
                options,
            ),
            // Onboarding state is per device and never syncs
            onboarding: OnboardingStore::new(local.clone(), options),
            local_wallpaper: LocalWallpaperStore::new(local, options),
            config,
        }
    }

    /// Warms up every cell concurrently. Each failure is logged; the first
    /// one is returned after all cells have been tried.
    pub async fn warm_up(&self) -> Result<()> {
        let (settings, quick_links, theme, command_settings, onboarding, local_wallpaper) = tokio::join!(
            self.settings.warm_up(),
            self.quick_links.warm_up(),
            self.theme.warm_up(),
            self.command_settings.warm_up(),
            self.onboarding.warm_up(),
            self.local_wallpaper.warm_up(),
        );

        let results = [
            (self.settings.key(), settings),
            (self.quick_links.key(), quick_links),
            (self.theme.key(), theme),
            (self.command_settings.key(), command_settings),
            (self.onboarding.key(), onboarding),
            (self.local_wallpaper.key(), local_wallpaper),
        ];

        let mut first_error = None;
        for (key, result) in results {
            if let Err(e) = result {
                tracing::warn!(key = %key, error = %e, "Failed to warm up storage cell");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn quick_links(&self) -> &QuickLinkStore {
        &self.quick_links
    }

    pub fn theme(&self) -> &StorageCell<Theme> {
        &self.theme
    }

    pub fn command_settings(&self) -> &StorageCell<CommandSettings> {
        &self.command_settings
    }

    pub fn onboarding(&self) -> &OnboardingStore {
        &self.onboarding
    }

    pub fn local_wallpaper(&self) -> &LocalWallpaperStore {
        &self.local_wallpaper
    }

    /// Export and import over this registry's synced cells.
    pub fn transfer(&self) -> DataTransfer {
        DataTransfer::new(
            self.settings.clone(),
            self.quick_links.clone(),
            self.theme.clone(),
            self.command_settings.clone(),
        )
    }
}

// Filesystem errors while preparing the data directory
impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quick_links::QuickLink;
    use nexttab_storage::BackendKind;

    #[tokio::test]
    async fn test_warm_up_populates_every_cell() {
        let registry = StorageRegistry::in_memory().unwrap();
        assert!(registry.theme().snapshot().is_none());

        registry.warm_up().await.unwrap();

        assert_eq!(registry.theme().snapshot(), Some(Theme::System));
        assert_eq!(registry.onboarding().snapshot(), Some(false));
        assert_eq!(registry.quick_links().snapshot(), Some(Vec::new()));
        assert!(registry.local_wallpaper().snapshot().is_some());
    }

    #[test]
    fn test_cells_bind_to_their_area() {
        let registry = StorageRegistry::in_memory().unwrap();

        assert_eq!(registry.settings().backend_kind(), BackendKind::Synced);
        assert_eq!(registry.quick_links().backend_kind(), BackendKind::Synced);
        assert_eq!(registry.theme().backend_kind(), BackendKind::Synced);
        assert_eq!(registry.command_settings().backend_kind(), BackendKind::Synced);
        assert_eq!(registry.onboarding().backend_kind(), BackendKind::Local);
        assert_eq!(registry.local_wallpaper().backend_kind(), BackendKind::Local);
    }

    #[tokio::test]
    async fn test_reopen_reads_persisted_values() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(dir.path().join("data"));

        {
            let registry = StorageRegistry::open(config.clone()).unwrap();
            registry.theme().set(Theme::Dark).await.unwrap();
            registry.onboarding().mark_completed().await.unwrap();
            registry
                .quick_links()
                .add(QuickLink::new("Docs", "https://docs.rs/"))
                .await
                .unwrap();
            registry
                .local_wallpaper()
                .set_image_data(Some("data:image/png;base64,AAAA".to_string()))
                .await
                .unwrap();
        }

        let registry = StorageRegistry::open(config).unwrap();
        registry.warm_up().await.unwrap();
        assert_eq!(registry.theme().snapshot(), Some(Theme::Dark));
        assert_eq!(registry.onboarding().snapshot(), Some(true));
        assert_eq!(registry.quick_links().get().await.unwrap().len(), 1);
        assert_eq!(
            registry.local_wallpaper().get().await.unwrap().image_data.as_deref(),
            Some("data:image/png;base64,AAAA")
        );
    }

    #[tokio::test]
    async fn test_unavailable_local_area_degrades_only_local_cells() {
        let config = Config::new(std::path::PathBuf::from("/unused"));
        let sync_area = SyncArea::new(
            Database::open_in_memory().unwrap(),
            SYNC_STORE,
            config.sync_quota,
        );
        let local_store = LocalStore::disabled(LOCAL_STORE, "no local storage in this context");
        let registry = StorageRegistry::from_backends(config, &sync_area, &local_store);

        registry.warm_up().await.unwrap();
        registry
            .local_wallpaper()
            .set_image_data(Some("img".to_string()))
            .await
            .unwrap();

        registry.onboarding().mark_completed().await.unwrap();

        assert!(registry.local_wallpaper().is_degraded());
        assert!(registry.onboarding().is_degraded());
        assert!(!registry.theme().is_degraded());
        assert_eq!(registry.onboarding().snapshot(), Some(true));
        assert_eq!(
            registry.local_wallpaper().get().await.unwrap().image_data.as_deref(),
            Some("img")
        );
    }
}
