//! HTTP client for v3 package feeds
//!
//! Existence is answered through the service index: the first
//! `PackageBaseAddress/3.0.0` resource lists every version of a package at
//! `{base}/{lowercase id}/index.json`.

use crate::core::credentials::{AuthScheme, Credential, CredentialRequestKind, CredentialService};
use crate::core::error::{FeedError, FeedResult};
use crate::core::identity::PackageIdentity;
use crate::core::logging::RegistryLogger;
use crate::core::registry::{PackageMetadataResource, SourceCache};
use reqwest::header::{HeaderMap, AUTHORIZATION, WWW_AUTHENTICATE};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use url::{Origin, Url};

/// Service index resource type used for existence queries
pub const PACKAGE_BASE_ADDRESS_TYPE: &str = "PackageBaseAddress/3.0.0";

/// Anonymous send, credentialed send, one retry lookup
const MAX_AUTH_ATTEMPTS: usize = 3;

#[derive(Debug, Deserialize)]
struct ServiceIndex {
    #[serde(default)]
    resources: Vec<ServiceIndexResource>,
}

#[derive(Debug, Deserialize)]
struct ServiceIndexResource {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@type")]
    resource_type: ResourceType,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ResourceType {
    One(String),
    Many(Vec<String>),
}

impl ResourceType {
    fn is(&self, wanted: &str) -> bool {
        match self {
            ResourceType::One(t) => t == wanted,
            ResourceType::Many(types) => types.iter().any(|t| t == wanted),
        }
    }
}

#[derive(Debug, Deserialize)]
struct VersionList {
    #[serde(default)]
    versions: Vec<String>,
}

/// Whether a 401 response allows basic authentication
fn offers_basic(headers: &HeaderMap) -> bool {
    let mut challenges = headers.get_all(WWW_AUTHENTICATE).iter().peekable();
    if challenges.peek().is_none() {
        return true;
    }
    challenges.any(|value| {
        value.to_str().is_ok_and(|v| {
            v.split(',')
                .any(|part| AuthScheme::from_challenge(part.trim()) == Some(AuthScheme::Basic))
        })
    })
}

/// Metadata resource for an HTTP(S) v3 feed.
///
/// Credentials accepted by the feed are reused only for requests to the
/// source URL's origin.
pub struct HttpFeedResource {
    source_url: String,
    source_origin: Option<Origin>,
    client: Client,
    credentials: Arc<CredentialService>,
    accepted_credential: Mutex<Option<Credential>>,
}

impl HttpFeedResource {
    pub fn new(source_url: String, client: Client, credentials: Arc<CredentialService>) -> Self {
        let source_origin = Url::parse(&source_url).ok().map(|u| u.origin());
        Self {
            source_url,
            source_origin,
            client,
            credentials,
            accepted_credential: Mutex::new(None),
        }
    }

    /// Same scheme, host and port as the source URL
    fn is_source_origin(&self, url: &str) -> bool {
        match (&self.source_origin, Url::parse(url)) {
            (Some(origin), Ok(target)) => *origin == target.origin(),
            _ => false,
        }
    }

    fn remembered_credential(&self) -> Option<Credential> {
        self.accepted_credential
            .lock()
            .map(|c| c.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    fn remember_credential(&self, credential: Credential) {
        let mut slot = self
            .accepted_credential
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(credential);
    }

    /// GET, asking the provider chain on 401.
    ///
    /// Requests to the source origin start with the remembered credential and
    /// look credentials up by the source URL. Other origins start anonymous and
    /// look them up by their own URL.
    async fn get(
        &self,
        url: &str,
        logger: &RegistryLogger,
        cancel: &CancellationToken,
    ) -> FeedResult<Response> {
        let same_origin = self.is_source_origin(url);
        let credential_uri = if same_origin {
            self.source_url.as_str()
        } else {
            url
        };
        let mut credential = if same_origin {
            self.remembered_credential()
        } else {
            None
        };

        for _ in 0..MAX_AUTH_ATTEMPTS {
            let mut request = self.client.get(url);
            if let Some(header) = credential
                .as_ref()
                .and_then(|c| c.authorization_header(AuthScheme::Basic))
            {
                request = request.header(AUTHORIZATION, header);
            }

            logger.log_verbose(&format!("  GET {}", url));
            let response = request.send().await?;
            let status = response.status();
            logger.log_verbose(&format!("  {} {}", status.as_u16(), url));

            if status == StatusCode::FORBIDDEN {
                return Err(FeedError::Unauthorized(format!(
                    "Access to {} is forbidden",
                    url
                )));
            }
            if status != StatusCode::UNAUTHORIZED {
                if let Some(accepted) = credential.filter(|_| same_origin) {
                    self.remember_credential(accepted);
                }
                return Ok(response);
            }

            if !offers_basic(response.headers()) {
                return Err(FeedError::Unauthorized(format!(
                    "{} requires an authentication scheme other than basic",
                    url
                )));
            }

            let is_retry = credential.is_some();
            credential = self
                .credentials
                .get_credentials(
                    credential_uri,
                    CredentialRequestKind::Unauthorized,
                    is_retry,
                    cancel,
                )
                .await?;

            if credential.is_none() {
                let reason = if is_retry {
                    "rejected the supplied credentials"
                } else {
                    "requires credentials and none are configured"
                };
                return Err(FeedError::Unauthorized(format!("{} {}", url, reason)));
            }
        }

        Err(FeedError::Unauthorized(format!(
            "{} still unauthorized after {} attempts",
            url, MAX_AUTH_ATTEMPTS
        )))
    }

    async fn package_base_address(
        &self,
        cache: &SourceCache,
        logger: &RegistryLogger,
        cancel: &CancellationToken,
    ) -> FeedResult<String> {
        if let Some(address) = cache.base_address(&self.source_url).await {
            return Ok(address);
        }

        let response = self.get(&self.source_url, logger, cancel).await?;
        if !response.status().is_success() {
            return Err(FeedError::Network(format!(
                "Failed to fetch service index {}: HTTP {}",
                self.source_url,
                response.status()
            )));
        }

        let body = response.text().await?;
        let index: ServiceIndex = serde_json::from_str(&body).map_err(|e| {
            FeedError::Protocol(format!(
                "Malformed service index at {}: {}",
                self.source_url, e
            ))
        })?;

        let address = index
            .resources
            .iter()
            .find(|r| r.resource_type.is(PACKAGE_BASE_ADDRESS_TYPE))
            .map(|r| r.id.trim_end_matches('/').to_string())
            .ok_or_else(|| {
                FeedError::Protocol(format!(
                    "Service index {} has no {} resource",
                    self.source_url, PACKAGE_BASE_ADDRESS_TYPE
                ))
            })?;

        cache.store_base_address(&self.source_url, address.clone()).await;
        Ok(address)
    }

    async fn versions(
        &self,
        identity: &PackageIdentity,
        cache: &SourceCache,
        logger: &RegistryLogger,
        cancel: &CancellationToken,
    ) -> FeedResult<Arc<Vec<String>>> {
        let base = self.package_base_address(cache, logger, cancel).await?;
        let url = format!("{}/{}/index.json", base, identity.lower_id());

        if let Some(versions) = cache.versions(&url).await {
            return Ok(versions);
        }

        let response = self.get(&url, logger, cancel).await?;
        let versions = match response.status() {
            StatusCode::NOT_FOUND => Vec::new(),
            status if status.is_success() => {
                let body = response.text().await?;
                let list: VersionList = serde_json::from_str(&body).map_err(|e| {
                    FeedError::Protocol(format!("Malformed version list at {}: {}", url, e))
                })?;
                list.versions
            }
            status => {
                return Err(FeedError::Network(format!(
                    "Failed to fetch versions of {}: HTTP {}",
                    identity.id(),
                    status
                )))
            }
        };

        let versions = Arc::new(versions);
        cache.store_versions(&url, versions.clone()).await;
        Ok(versions)
    }
}

#[async_trait::async_trait]
impl PackageMetadataResource for HttpFeedResource {
    fn source_url(&self) -> &str {
        &self.source_url
    }

    async fn exists(
        &self,
        identity: &PackageIdentity,
        cache: &SourceCache,
        logger: &RegistryLogger,
        cancel: &CancellationToken,
    ) -> FeedResult<bool> {
        if cancel.is_cancelled() {
            return Err(FeedError::Canceled);
        }

        let versions = self.versions(identity, cache, logger, cancel).await?;
        Ok(versions.iter().any(|v| identity.matches_version(v)))
    }
}
