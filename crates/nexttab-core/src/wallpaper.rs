//! Device-local wallpaper image
//!
//! Lives in the local area so large images neither count against the sync
//! quota nor leave the device. Never part of an export bundle.

use serde::{Deserialize, Serialize};
use std::ops::Deref;
use std::sync::Arc;

use nexttab_cell::{CellOptions, StorageCell};
use nexttab_storage::Backend;

use crate::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalWallpaper {
    /// Image as a data URL
    pub image_data: Option<String>,
}

#[derive(Clone)]
pub struct LocalWallpaperStore {
    cell: StorageCell<LocalWallpaper>,
}

impl LocalWallpaperStore {
    pub const KEY: &'static str = "local-wallpaper";

    pub fn new(backend: Arc<dyn Backend>, options: CellOptions) -> Self {
        Self {
            cell: StorageCell::with_options(backend, Self::KEY, LocalWallpaper::default(), options),
        }
    }

    /// Sets the image, or clears it with `None`.
    pub async fn set_image_data(&self, image_data: Option<String>) -> Result<()> {
        self.cell.set(LocalWallpaper { image_data }).await?;
        Ok(())
    }
}

impl Deref for LocalWallpaperStore {
    type Target = StorageCell<LocalWallpaper>;

    fn deref(&self) -> &Self::Target {
        &self.cell
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexttab_storage::LocalStore;

    #[tokio::test]
    async fn test_large_image_round_trips_through_local_store() {
        let store = LocalStore::in_memory("wallpaper");
        let wallpaper = LocalWallpaperStore::new(Arc::new(store.context()), CellOptions::default());
        let image = format!("data:image/png;base64,{}", "A".repeat(512 * 1024));

        wallpaper.set_image_data(Some(image.clone())).await.unwrap();

        let reader = LocalWallpaperStore::new(Arc::new(store.context()), CellOptions::default());
        assert_eq!(reader.get().await.unwrap().image_data, Some(image));

        wallpaper.set_image_data(None).await.unwrap();
        assert_eq!(reader.get().await.unwrap(), LocalWallpaper::default());
    }
}
