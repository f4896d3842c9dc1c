//! Feeds backed by a local or network-share folder

use crate::core::error::{FeedError, FeedResult};
use crate::core::identity::PackageIdentity;
use crate::core::logging::RegistryLogger;
use crate::core::registry::{PackageMetadataResource, SourceCache};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// File extension of package archives in folder feeds
pub const PACKAGE_EXTENSION: &str = "nupkg";

/// Folder feed supporting both the flat (`id.version.nupkg`) and the
/// hierarchical (`id/version/`) layouts
pub struct LocalFolderResource {
    root: PathBuf,
    display: String,
}

impl LocalFolderResource {
    pub fn new(root: PathBuf) -> Self {
        let display = root.display().to_string();
        Self { root, display }
    }
}

#[async_trait::async_trait]
impl PackageMetadataResource for LocalFolderResource {
    fn source_url(&self) -> &str {
        &self.display
    }

    async fn exists(
        &self,
        identity: &PackageIdentity,
        _cache: &SourceCache,
        logger: &RegistryLogger,
        cancel: &CancellationToken,
    ) -> FeedResult<bool> {
        if cancel.is_cancelled() {
            return Err(FeedError::Canceled);
        }
        if !tokio::fs::metadata(&self.root)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            return Err(FeedError::Configuration(format!(
                "Feed folder {} does not exist",
                self.display
            )));
        }

        let version = identity.normalized_version();
        let hierarchical = self.root.join(identity.lower_id()).join(&version);
        if tokio::fs::metadata(&hierarchical)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            logger.log_verbose(&format!("  found {}", hierarchical.display()));
            return Ok(true);
        }

        let wanted = format!("{}.{}.{}", identity.lower_id(), version, PACKAGE_EXTENSION);
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_lowercase();
            if name == wanted {
                logger.log_verbose(&format!("  found {}", entry.path().display()));
                return Ok(true);
            }
        }

        Ok(false)
    }
}
