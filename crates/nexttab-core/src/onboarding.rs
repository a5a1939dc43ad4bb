use std::ops::Deref;
use std::sync::Arc;

use nexttab_cell::{CellOptions, StorageCell};
use nexttab_storage::Backend;

use crate::Result;

/// Whether the first-run onboarding has been completed.
#[derive(Clone)]
pub struct OnboardingStore {
    cell: StorageCell<bool>,
}

impl OnboardingStore {
    pub const KEY: &'static str = "onboarding-completed-key";

    pub fn new(backend: Arc<dyn Backend>, options: CellOptions) -> Self {
        Self {
            cell: StorageCell::with_options(backend, Self::KEY, false, options),
        }
    }

    pub async fn mark_completed(&self) -> Result<()> {
        self.cell.set(true).await?;
        tracing::info!("Onboarding completed");
        Ok(())
    }

    pub async fn reset(&self) -> Result<()> {
        self.cell.set(false).await?;
        Ok(())
    }

    pub async fn is_completed(&self) -> Result<bool> {
        Ok(self.cell.get().await?)
    }
}

impl Deref for OnboardingStore {
    type Target = StorageCell<bool>;

    fn deref(&self) -> &Self::Target {
        &self.cell
    }
}
