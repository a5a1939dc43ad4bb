//! Quick links shown on the new-tab page and in the popup

use serde::{Deserialize, Serialize};
use std::ops::Deref;
use std::sync::Arc;
use url::Url;
use uuid::Uuid;

use nexttab_cell::{CellOptions, StorageCell};
use nexttab_storage::Backend;

use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickLink {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl QuickLink {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            url: url.into(),
            icon: None,
        }
    }

    /// Hostname of the link, `None` if the URL does not parse.
    pub fn host(&self) -> Option<String> {
        host_of(&self.url)
    }
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}

/// Ordered list of quick links. Ids are expected to be unique but are not
/// checked here.
#[derive(Clone)]
pub struct QuickLinkStore {
    cell: StorageCell<Vec<QuickLink>>,
}

impl QuickLinkStore {
    pub const KEY: &'static str = "quick-url-items-storage-key";

    pub fn new(backend: Arc<dyn Backend>, options: CellOptions) -> Self {
        Self {
            cell: StorageCell::with_options(backend, Self::KEY, Vec::new(), options),
        }
    }

    pub async fn add(&self, link: QuickLink) -> Result<Vec<QuickLink>> {
        tracing::debug!(id = %link.id, url = %link.url, "Adding quick link");
        Ok(self
            .cell
            .update(move |links| {
                let mut links = links.clone();
                links.push(link);
                links
            })
            .await?)
    }

    pub async fn remove_link(&self, id: &str) -> Result<Vec<QuickLink>> {
        let id = id.to_string();
        Ok(self
            .cell
            .update(move |links| links.iter().filter(|l| l.id != id).cloned().collect())
            .await?)
    }

    /// Moves the link with `id` to `new_index`, clamped to the list length.
    pub async fn move_link(&self, id: &str, new_index: usize) -> Result<Vec<QuickLink>> {
        let id = id.to_string();
        Ok(self
            .cell
            .update(move |links| {
                let mut links = links.clone();
                if let Some(current) = links.iter().position(|l| l.id == id) {
                    let link = links.remove(current);
                    let insert_at = new_index.min(links.len());
                    links.insert(insert_at, link);
                }
                links
            })
            .await?)
    }

    pub async fn contains_url(&self, url: &str) -> Result<bool> {
        Ok(self.current().await?.iter().any(|l| l.url == url))
    }

    /// True if any saved link points at the same host as `url`.
    pub async fn has_host(&self, url: &str) -> Result<bool> {
        let Some(host) = host_of(url) else {
            return Ok(false);
        };
        Ok(self
            .current()
            .await?
            .iter()
            .any(|l| l.host().as_deref() == Some(host.as_str())))
    }

    async fn current(&self) -> Result<Vec<QuickLink>> {
        match self.cell.snapshot() {
            Some(links) => Ok(links),
            None => Ok(self.cell.get().await?),
        }
    }
}

impl Deref for QuickLinkStore {
    type Target = StorageCell<Vec<QuickLink>>;

    fn deref(&self) -> &Self::Target {
        &self.cell
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexttab_storage::{Database, SyncArea, SyncQuota};

    fn store() -> QuickLinkStore {
        let area = SyncArea::new(
            Database::open_in_memory().unwrap(),
            "nexttab",
            SyncQuota::default(),
        );
        QuickLinkStore::new(Arc::new(area.context()), CellOptions::default())
    }

    fn titles(links: &[QuickLink]) -> Vec<&str> {
        links.iter().map(|l| l.title.as_str()).collect()
    }

    #[tokio::test]
    async fn test_add_move_remove() {
        let store = store();
        let docs = QuickLink::new("Docs", "https://docs.rs/");
        let crates = QuickLink::new("Crates", "https://crates.io/");
        let news = QuickLink::new("News", "https://news.ycombinator.com/");

        store.add(docs.clone()).await.unwrap();
        store.add(crates.clone()).await.unwrap();
        let links = store.add(news.clone()).await.unwrap();
        assert_eq!(titles(&links), vec!["Docs", "Crates", "News"]);

        let links = store.move_link(&news.id, 0).await.unwrap();
        assert_eq!(titles(&links), vec!["News", "Docs", "Crates"]);

        let links = store.remove_link(&docs.id).await.unwrap();
        assert_eq!(titles(&links), vec!["News", "Crates"]);
        assert_eq!(store.get().await.unwrap(), links);
    }

    #[tokio::test]
    async fn test_exact_and_host_matches() {
        let store = store();
        store
            .add(QuickLink::new("Rust", "https://www.rust-lang.org/learn"))
            .await
            .unwrap();

        assert!(store.contains_url("https://www.rust-lang.org/learn").await.unwrap());
        assert!(!store.contains_url("https://www.rust-lang.org/").await.unwrap());
        assert!(store.has_host("https://www.rust-lang.org/tools").await.unwrap());
        assert!(!store.has_host("https://rust-lang.org/").await.unwrap());
        assert!(!store.has_host("not a url").await.unwrap());
    }

    #[test]
    fn test_new_links_get_distinct_ids() {
        let a = QuickLink::new("A", "https://a.example");
        let b = QuickLink::new("A", "https://a.example");
        assert_ne!(a.id, b.id);
    }
}
