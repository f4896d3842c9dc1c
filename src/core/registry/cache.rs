//! Per-process cache de-duplicating feed metadata lookups

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared cache for service-index resolutions and version lists
#[derive(Debug, Default)]
pub struct SourceCache {
    no_cache: bool,
    base_addresses: RwLock<HashMap<String, String>>,
    versions: RwLock<HashMap<String, Arc<Vec<String>>>>,
}

impl SourceCache {
    pub fn new(no_cache: bool) -> Self {
        Self {
            no_cache,
            ..Default::default()
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.no_cache
    }

    /// Package base address resolved for a source URL
    pub async fn base_address(&self, source_url: &str) -> Option<String> {
        if self.no_cache {
            return None;
        }
        self.base_addresses.read().await.get(source_url).cloned()
    }

    pub async fn store_base_address(&self, source_url: &str, address: String) {
        if self.no_cache {
            return;
        }
        self.base_addresses
            .write()
            .await
            .insert(source_url.to_string(), address);
    }

    /// Version list fetched from a URL
    pub async fn versions(&self, url: &str) -> Option<Arc<Vec<String>>> {
        if self.no_cache {
            return None;
        }
        self.versions.read().await.get(url).cloned()
    }

    pub async fn store_versions(&self, url: &str, versions: Arc<Vec<String>>) {
        if self.no_cache {
            return;
        }
        self.versions.write().await.insert(url.to_string(), versions);
    }

    pub async fn clear(&self) {
        self.base_addresses.write().await.clear();
        self.versions.write().await.clear();
    }
}
