//! Credential provider fed by an environment variable listing feed endpoints
//!
//! CI systems inject credentials for the feeds a job may talk to as JSON:
//!
//! ```json
//! {"endpointCredentials": [{"endpoint": "https://pkgs.example.com/v3/index.json",
//!                           "username": "ci", "password": "token"}]}
//! ```

use crate::core::credentials::{
    normalize_source_uri, source_uri_matches, Credential, CredentialProvider,
    CredentialRequestKind, CredentialResponse,
};
use crate::core::error::{FeedError, FeedResult};
use serde::Deserialize;
use std::env;
use tokio_util::sync::CancellationToken;

/// Environment variable holding the endpoint credential document
pub const FEED_ENDPOINTS_ENV: &str = "FEEDCHECK_FEED_ENDPOINTS";

/// One endpoint entry
#[derive(Clone, Deserialize)]
pub struct EndpointCredential {
    pub endpoint: String,
    #[serde(default)]
    pub username: Option<String>,
    pub password: String,
}

impl std::fmt::Debug for EndpointCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointCredential")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EndpointDocument {
    #[serde(default)]
    endpoint_credentials: Vec<EndpointCredential>,
}

/// Supplies credentials listed in [`FEED_ENDPOINTS_ENV`]
#[derive(Debug, Clone)]
pub struct EndpointCredentialProvider {
    endpoints: Vec<EndpointCredential>,
}

impl EndpointCredentialProvider {
    /// Read the environment; `None` when the variable is unset or blank
    pub fn from_env() -> FeedResult<Option<Self>> {
        match env::var(FEED_ENDPOINTS_ENV) {
            Ok(raw) if !raw.trim().is_empty() => Self::from_json(&raw).map(Some),
            _ => Ok(None),
        }
    }

    pub fn from_json(raw: &str) -> FeedResult<Self> {
        let document: EndpointDocument = serde_json::from_str(raw).map_err(|e| {
            FeedError::Configuration(format!("Invalid {}: {}", FEED_ENDPOINTS_ENV, e))
        })?;
        Ok(Self {
            endpoints: document.endpoint_credentials,
        })
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

#[async_trait::async_trait]
impl CredentialProvider for EndpointCredentialProvider {
    fn id(&self) -> &str {
        "endpoints"
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
        if is_retry || kind == CredentialRequestKind::Proxy {
            return Ok(CredentialResponse::NotApplicable);
        }

        let requested = normalize_source_uri(uri).ok_or_else(|| {
            FeedError::InvalidArgument(format!("Invalid credential request URI: {}", uri))
        })?;

        let found = self
            .endpoints
            .iter()
            .find(|e| !e.password.is_empty() && source_uri_matches(&requested, &e.endpoint));

        Ok(match found {
            Some(endpoint) => CredentialResponse::Credentials(Credential::basic(
                endpoint.username.clone().unwrap_or_else(|| "feedcheck".to_string()),
                endpoint.password.clone(),
            )),
            None => CredentialResponse::NotApplicable,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"{
        "endpointCredentials": [
            {"endpoint": "https://pkgs.example.com/v3/index.json", "username": "ci", "password": "token"},
            {"endpoint": "https://tokens.example.com/index.json", "password": "pat"}
        ]
    }"#;

    #[tokio::test]
    async fn test_matching_endpoint_returns_basic_credentials() {
        let provider = EndpointCredentialProvider::from_json(DOCUMENT).unwrap();
        assert_eq!(provider.len(), 2);

        let response = provider
            .get_credentials(
                "https://pkgs.example.com/v3/index.json/",
                CredentialRequestKind::Unauthorized,
                false,
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        match response {
            CredentialResponse::Credentials(c) => assert_eq!(c.username(), "ci"),
            CredentialResponse::NotApplicable => panic!("expected credentials"),
        }

        let response = provider
            .get_credentials(
                "https://tokens.example.com/index.json",
                CredentialRequestKind::Unauthorized,
                false,
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        match response {
            CredentialResponse::Credentials(c) => assert_eq!(c.username(), "feedcheck"),
            CredentialResponse::NotApplicable => panic!("expected credentials"),
        }
    }

    #[tokio::test]
    async fn test_retry_is_not_applicable() {
        let provider = EndpointCredentialProvider::from_json(DOCUMENT).unwrap();
        let response = provider
            .get_credentials(
                "https://pkgs.example.com/v3/index.json",
                CredentialRequestKind::Unauthorized,
                true,
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(response, CredentialResponse::NotApplicable);
    }

    #[test]
    fn test_malformed_document() {
        assert!(matches!(
            EndpointCredentialProvider::from_json("{not json"),
            Err(FeedError::Configuration(_))
        ));
        let empty = EndpointCredentialProvider::from_json("{}").unwrap();
        assert!(empty.is_empty());
    }
}
