//! Metadata resources answering "does this package version exist on the feed?"

pub mod cache;
pub mod client;
pub mod local;

pub use cache::SourceCache;
pub use client::{HttpFeedResource, PACKAGE_BASE_ADDRESS_TYPE};
pub use local::{LocalFolderResource, PACKAGE_EXTENSION};

use crate::core::credentials::CredentialService;
use crate::core::error::{FeedError, FeedResult};
use crate::core::identity::PackageIdentity;
use crate::core::logging::RegistryLogger;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Existence queries against one feed
#[async_trait::async_trait]
pub trait PackageMetadataResource: Send + Sync {
    /// The feed this resource is bound to
    fn source_url(&self) -> &str;

    /// Whether `identity` is already present on the feed
    async fn exists(
        &self,
        identity: &PackageIdentity,
        cache: &SourceCache,
        logger: &RegistryLogger,
        cancel: &CancellationToken,
    ) -> FeedResult<bool>;
}

/// Build the metadata resource for a feed URL
pub fn create_resource(
    source_url: &str,
    http: &reqwest::Client,
    credentials: Arc<CredentialService>,
) -> FeedResult<Arc<dyn PackageMetadataResource>> {
    let trimmed = source_url.trim();
    if trimmed.is_empty() {
        return Err(FeedError::Configuration(
            "Feed URL cannot be empty".to_string(),
        ));
    }

    match Url::parse(trimmed) {
        // Single-letter schemes are Windows drive letters
        Ok(url) if url.scheme().len() > 1 => match url.scheme() {
            "http" | "https" => Ok(Arc::new(HttpFeedResource::new(
                trimmed.to_string(),
                http.clone(),
                credentials,
            ))),
            "file" => {
                let path = url.to_file_path().map_err(|_| {
                    FeedError::Configuration(format!("Malformed file feed URL: {}", trimmed))
                })?;
                Ok(Arc::new(LocalFolderResource::new(path)))
            }
            other => Err(FeedError::Configuration(format!(
                "Unsupported feed URL scheme '{}': {}",
                other, trimmed
            ))),
        },
        _ if Path::new(trimmed).is_absolute() => {
            Ok(Arc::new(LocalFolderResource::new(trimmed.into())))
        }
        Err(e) => Err(FeedError::Configuration(format!(
            "Malformed feed URL '{}': {}",
            trimmed, e
        ))),
        Ok(_) => Err(FeedError::Configuration(format!(
            "Malformed feed URL: {}",
            trimmed
        ))),
    }
}
