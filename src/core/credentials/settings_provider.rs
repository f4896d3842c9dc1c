//! Credential resolver backed by the credentials stored with configured sources

use crate::core::credentials::{
    Credential, CredentialProvider, CredentialRequestKind, CredentialResponse,
};
use crate::core::error::{FeedError, FeedResult};
use crate::core::sources::PackageSourceProvider;
use percent_encoding::percent_decode_str;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

const METADATA_SUFFIX: &str = "$metadata";

/// Normalize a feed URI for credential matching.
///
/// Trailing slashes and a trailing `$metadata` segment are dropped.
pub fn normalize_source_uri(raw: &str) -> Option<Url> {
    let mut trimmed = raw.trim().trim_end_matches('/');

    let split = trimmed.len().checked_sub(METADATA_SUFFIX.len());
    if let Some(idx) = split {
        let has_suffix = trimmed
            .get(idx..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(METADATA_SUFFIX));
        if has_suffix {
            trimmed = trimmed[..idx].trim_end_matches('/');
        }
    }

    Url::parse(trimmed).ok()
}

fn decoded_path(url: &Url) -> String {
    let decoded = percent_decode_str(url.path()).decode_utf8_lossy();
    decoded.trim_end_matches('/').to_lowercase()
}

/// Whether a requested URI addresses the same feed as a configured source URI
pub fn source_uri_matches(requested: &Url, source: &str) -> bool {
    let source = match normalize_source_uri(source) {
        Some(url) => url,
        None => return false,
    };

    let same_host = match (requested.host_str(), source.host_str()) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        (None, None) => true,
        _ => false,
    };

    requested.scheme().eq_ignore_ascii_case(source.scheme())
        && same_host
        && requested.port_or_known_default() == source.port_or_known_default()
        && decoded_path(requested) == decoded_path(&source)
}

/// Supplies basic-auth credentials from configured package sources
pub struct SettingsCredentialProvider {
    sources: Arc<PackageSourceProvider>,
}

impl SettingsCredentialProvider {
    pub fn new(sources: Arc<PackageSourceProvider>) -> Self {
        Self { sources }
    }
}

#[async_trait::async_trait]
impl CredentialProvider for SettingsCredentialProvider {
    fn id(&self) -> &str {
        "settings"
    }

    async fn get_credentials(
        &self,
        uri: &str,
        kind: CredentialRequestKind,
        is_retry: bool,
        cancel: &CancellationToken,
    ) -> FeedResult<CredentialResponse> {
        if cancel.is_cancelled() {
            return Err(FeedError::Canceled);
        }
        if uri.trim().is_empty() {
            return Err(FeedError::InvalidArgument(
                "Credential request URI cannot be empty".to_string(),
            ));
        }

        // Stored credentials already failed once; proxies are not configured here
        if is_retry || kind == CredentialRequestKind::Proxy {
            return Ok(CredentialResponse::NotApplicable);
        }

        let requested = normalize_source_uri(uri).ok_or_else(|| {
            FeedError::InvalidArgument(format!("Invalid credential request URI: {}", uri))
        })?;

        for source in self.sources.load_package_sources() {
            if !source_uri_matches(&requested, &source.url) {
                continue;
            }
            if let Some(ref credentials) = source.credentials {
                if credentials.is_valid() {
                    return Ok(CredentialResponse::Credentials(Credential::basic(
                        credentials.username.clone(),
                        credentials.password.clone(),
                    )));
                }
            }
        }

        Ok(CredentialResponse::NotApplicable)
    }
}
