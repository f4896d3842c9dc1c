//! Credential providers for authenticated feed requests
//!
//! Providers are consulted in order by [`CredentialService`]; the first one that
//! returns credentials wins.

pub mod endpoints;
pub mod settings_provider;

pub use endpoints::{EndpointCredential, EndpointCredentialProvider, FEED_ENDPOINTS_ENV};
pub use settings_provider::{normalize_source_uri, source_uri_matches, SettingsCredentialProvider};

use crate::core::error::{FeedError, FeedResult};
use crate::core::logging::RegistryLogger;
use base64::{engine::general_purpose::STANDARD, Engine};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Why a request needs credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialRequestKind {
    /// The proxy answered 407
    Proxy,
    /// The feed answered 401
    Unauthorized,
    /// The feed answered 403
    Forbidden,
}

/// HTTP authentication schemes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthScheme {
    Basic,
    Bearer,
    Digest,
    Negotiate,
    Ntlm,
}

impl AuthScheme {
    /// Parse the scheme token of a `WWW-Authenticate` challenge
    pub fn from_challenge(challenge: &str) -> Option<Self> {
        let token = challenge.split_whitespace().next()?.trim_end_matches(',');
        match token.to_ascii_lowercase().as_str() {
            "basic" => Some(AuthScheme::Basic),
            "bearer" => Some(AuthScheme::Bearer),
            "digest" => Some(AuthScheme::Digest),
            "negotiate" => Some(AuthScheme::Negotiate),
            "ntlm" => Some(AuthScheme::Ntlm),
            _ => None,
        }
    }
}

/// Username/password pair restricted to a set of authentication schemes
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    username: String,
    password: String,
    schemes: Vec<AuthScheme>,
}

impl Credential {
    /// Credentials usable for basic authentication only
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            schemes: vec![AuthScheme::Basic],
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn supports(&self, scheme: AuthScheme) -> bool {
        self.schemes.contains(&scheme)
    }

    /// `Authorization` header value for `scheme`, if these credentials may be used with it
    pub fn authorization_header(&self, scheme: AuthScheme) -> Option<String> {
        if !self.supports(scheme) {
            return None;
        }
        match scheme {
            AuthScheme::Basic => {
                let raw = format!("{}:{}", self.username, self.password);
                Some(format!("Basic {}", STANDARD.encode(raw)))
            }
            _ => None,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("schemes", &self.schemes)
            .finish()
    }
}

/// Outcome of a provider lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialResponse {
    Credentials(Credential),
    NotApplicable,
}

/// A source of credentials for feed requests
#[async_trait::async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Identifier used in diagnostics
    fn id(&self) -> &str;

    async fn get_credentials(
        &self,
        uri: &str,
        kind: CredentialRequestKind,
        is_retry: bool,
        cancel: &CancellationToken,
    ) -> FeedResult<CredentialResponse>;
}

/// Ordered chain of credential providers
pub struct CredentialService {
    providers: Vec<Arc<dyn CredentialProvider>>,
    logger: Arc<RegistryLogger>,
}

impl CredentialService {
    pub fn new(providers: Vec<Arc<dyn CredentialProvider>>, logger: Arc<RegistryLogger>) -> Self {
        Self { providers, logger }
    }

    /// Provider ids in consultation order
    pub fn provider_ids(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.id().to_string()).collect()
    }

    /// Ask each provider in turn; `None` when no provider applies
    pub async fn get_credentials(
        &self,
        uri: &str,
        kind: CredentialRequestKind,
        is_retry: bool,
        cancel: &CancellationToken,
    ) -> FeedResult<Option<Credential>> {
        for provider in &self.providers {
            if cancel.is_cancelled() {
                return Err(FeedError::Canceled);
            }

            match provider.get_credentials(uri, kind, is_retry, cancel).await? {
                CredentialResponse::Credentials(credential) => {
                    self.logger.log_debug(&format!(
                        "Credentials for {} supplied by {}",
                        uri,
                        provider.id()
                    ));
                    return Ok(Some(credential));
                }
                CredentialResponse::NotApplicable => continue,
            }
        }

        self.logger
            .log_debug(&format!("No credential provider applies to {}", uri));
        Ok(None)
    }
}

impl fmt::Debug for CredentialService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialService")
            .field("providers", &self.provider_ids())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::core::logging::MemorySink;

    struct FixedProvider {
        id: String,
        response: CredentialResponse,
    }

    #[async_trait::async_trait]
    impl CredentialProvider for FixedProvider {
        fn id(&self) -> &str {
            &self.id
        }

        async fn get_credentials(
            &self,
            _uri: &str,
            _kind: CredentialRequestKind,
            _is_retry: bool,
            _cancel: &CancellationToken,
        ) -> FeedResult<CredentialResponse> {
            Ok(self.response.clone())
        }
    }

    fn logger() -> Arc<RegistryLogger> {
        Arc::new(RegistryLogger::new(Arc::new(MemorySink::new())))
    }

    #[test]
    fn test_basic_credential_is_basic_only() {
        let credential = Credential::basic("ci", "secret");
        assert_eq!(
            credential.authorization_header(AuthScheme::Basic).unwrap(),
            "Basic Y2k6c2VjcmV0"
        );
        assert!(credential.authorization_header(AuthScheme::Bearer).is_none());
        assert!(credential.authorization_header(AuthScheme::Ntlm).is_none());
        assert!(!format!("{:?}", credential).contains("secret"));
    }

    #[test]
    fn test_scheme_from_challenge() {
        assert_eq!(
            AuthScheme::from_challenge("Basic realm=\"feed\""),
            Some(AuthScheme::Basic)
        );
        assert_eq!(
            AuthScheme::from_challenge("Bearer authorization_uri=x"),
            Some(AuthScheme::Bearer)
        );
        assert_eq!(AuthScheme::from_challenge("NTLM"), Some(AuthScheme::Ntlm));
        assert_eq!(AuthScheme::from_challenge("Custom"), None);
        assert_eq!(AuthScheme::from_challenge(""), None);
    }

    #[tokio::test]
    async fn test_chain_returns_first_applicable() {
        let service = CredentialService::new(
            vec![
                Arc::new(FixedProvider {
                    id: "plugin".to_string(),
                    response: CredentialResponse::NotApplicable,
                }),
                Arc::new(FixedProvider {
                    id: "first".to_string(),
                    response: CredentialResponse::Credentials(Credential::basic("a", "1")),
                }),
                Arc::new(FixedProvider {
                    id: "second".to_string(),
                    response: CredentialResponse::Credentials(Credential::basic("b", "2")),
                }),
            ],
            logger(),
        );

        let credential = service
            .get_credentials(
                "https://example.com/index.json",
                CredentialRequestKind::Unauthorized,
                false,
                &CancellationToken::new(),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(credential.username(), "a");
    }

    #[tokio::test]
    async fn test_chain_honours_cancellation() {
        let service = CredentialService::new(
            vec![Arc::new(FixedProvider {
                id: "first".to_string(),
                response: CredentialResponse::Credentials(Credential::basic("a", "1")),
            })],
            logger(),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = service
            .get_credentials(
                "https://example.com/index.json",
                CredentialRequestKind::Unauthorized,
                false,
                &cancel,
            )
            .await;
        assert!(matches!(result, Err(FeedError::Canceled)));
    }

    #[tokio::test]
    async fn test_empty_chain_is_none() {
        let service = CredentialService::new(Vec::new(), logger());
        let result = service
            .get_credentials(
                "https://example.com/index.json",
                CredentialRequestKind::Unauthorized,
                false,
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert!(result.is_none());
    }
}
