//! NextTab Core
//!
//! The settings and small record collections of a new-tab page, each held
//! in its own storage cell, plus export and import of all of them as one
//! bundle. The [`StorageRegistry`] owns every cell and their warm-up.

mod commands;
mod config;
mod error;
mod onboarding;
mod quick_links;
mod registry;
pub mod schema;
mod settings;
mod theme;
mod transfer;
mod wallpaper;

pub use commands::{CommandSettings, PluginCommandSettings};
pub use config::Config;
pub use error::CoreError;
pub use onboarding::OnboardingStore;
pub use quick_links::{QuickLink, QuickLinkStore};
pub use registry::StorageRegistry;
pub use schema::{FieldFailure, SchemaError, Section};
pub use settings::{MqttSettings, Settings, SettingsStore, WallpaperType};
pub use theme::Theme;
pub use transfer::{DataTransfer, ExportBundle, ImportReport, FORMAT_VERSION};
pub use wallpaper::{LocalWallpaper, LocalWallpaperStore};

// Re-export the cell and backend layers
pub use nexttab_cell::{CellError, CellOptions, StorageCell, Subscription, Update};
pub use nexttab_storage::{BackendKind, LocalStore, StorageError, SyncArea, SyncQuota};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
