//! Registry context construction and one-time bootstrap
//!
//! A [`RegistryContext`] bundles everything feeds share: the logger, the loaded
//! settings, the package sources, the credential provider chain, the lookup
//! cache and the HTTP client. [`Bootstrap`] builds it at most once.

use crate::core::credentials::{
    CredentialProvider, CredentialService, EndpointCredentialProvider, SettingsCredentialProvider,
};
use crate::core::error::{FeedError, FeedResult};
use crate::core::logging::{DiagnosticsSink, RegistryLogger};
use crate::core::registry::SourceCache;
use crate::core::settings::{ClientOptions, Settings};
use crate::core::sources::PackageSourceProvider;
use once_cell::sync::OnceCell;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// What the embedding host provides
#[derive(Clone)]
pub struct HostContext {
    pub sink: Arc<dyn DiagnosticsSink>,
    pub working_dir: PathBuf,
}

impl HostContext {
    pub fn new(sink: Arc<dyn DiagnosticsSink>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            sink,
            working_dir: working_dir.into(),
        }
    }

    /// Host rooted at the process working directory
    pub fn from_current_dir(sink: Arc<dyn DiagnosticsSink>) -> FeedResult<Self> {
        let working_dir = std::env::current_dir()?;
        Ok(Self::new(sink, working_dir))
    }
}

/// Shared, read-only state used by every feed
pub struct RegistryContext {
    logger: Arc<RegistryLogger>,
    settings: Arc<Settings>,
    sources: Arc<PackageSourceProvider>,
    credentials: Arc<CredentialService>,
    cache: Arc<SourceCache>,
    http: reqwest::Client,
    cancel: CancellationToken,
}

impl RegistryContext {
    /// Load settings relative to the host's working directory and build the context
    pub fn initialize(
        host: &HostContext,
        plugin_providers: Vec<Arc<dyn CredentialProvider>>,
    ) -> FeedResult<Self> {
        let logger = Arc::new(RegistryLogger::new(host.sink.clone()));
        let settings = Settings::load(&host.working_dir)?;
        for file in &settings.files {
            logger.log_debug(&format!("Using settings file {}", file.display()));
        }
        Self::from_settings(settings, logger, plugin_providers)
    }

    /// Build the context from already-loaded settings.
    ///
    /// Provider order: plugin providers, environment endpoints, configured sources.
    pub fn from_settings(
        settings: Settings,
        logger: Arc<RegistryLogger>,
        plugin_providers: Vec<Arc<dyn CredentialProvider>>,
    ) -> FeedResult<Self> {
        let sources = Arc::new(PackageSourceProvider::from_settings(&settings));

        let mut chain = plugin_providers;
        if let Some(endpoints) = EndpointCredentialProvider::from_env()? {
            logger.log_debug(&format!(
                "Loaded {} endpoint credential(s) from the environment",
                endpoints.len()
            ));
            chain.push(Arc::new(endpoints));
        }
        chain.push(Arc::new(SettingsCredentialProvider::new(sources.clone())));

        let credentials = Arc::new(CredentialService::new(chain, logger.clone()));
        logger.log_debug(&format!(
            "Credential providers: {}",
            credentials.provider_ids().join(", ")
        ));

        let http = build_http_client(&settings.options)?;
        let cache = Arc::new(SourceCache::new(settings.options.no_cache));

        Ok(Self {
            logger,
            settings: Arc::new(settings),
            sources,
            credentials,
            cache,
            http,
            cancel: CancellationToken::new(),
        })
    }

    pub fn logger(&self) -> &Arc<RegistryLogger> {
        &self.logger
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn options(&self) -> &ClientOptions {
        &self.settings.options
    }

    pub fn sources(&self) -> &Arc<PackageSourceProvider> {
        &self.sources
    }

    pub fn credentials(&self) -> &Arc<CredentialService> {
        &self.credentials
    }

    pub fn cache(&self) -> &SourceCache {
        &self.cache
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Token observed by credential lookups and before each existence query
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }
}

fn build_http_client(options: &ClientOptions) -> FeedResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(options.user_agent.clone())
        .timeout(Duration::from_secs(options.http_timeout_secs))
        .build()
        .map_err(|e| FeedError::Configuration(format!("Failed to create HTTP client: {}", e)))
}

/// Builds the registry context once per process
#[derive(Default)]
pub struct Bootstrap {
    plugin_providers: Vec<Arc<dyn CredentialProvider>>,
    context: OnceCell<Arc<RegistryContext>>,
}

impl Bootstrap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a credential provider consulted before the built-in ones.
    /// Has no effect once the context is built.
    pub fn with_plugin_provider(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.plugin_providers.push(provider);
        self
    }

    /// Build the context on first call; later calls return the same logger
    pub fn ensure_initialized(&self, host: &HostContext) -> FeedResult<Arc<RegistryLogger>> {
        let context = self.context.get_or_try_init(|| {
            RegistryContext::initialize(host, self.plugin_providers.clone()).map(Arc::new)
        })?;
        Ok(context.logger.clone())
    }

    /// The built context, if [`Bootstrap::ensure_initialized`] succeeded
    pub fn context(&self) -> Option<Arc<RegistryContext>> {
        self.context.get().cloned()
    }
}
