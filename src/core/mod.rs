//! Core modules: settings, credentials, feed metadata and the existence check

pub mod context;
pub mod credentials;
pub mod error;
pub mod feed;
pub mod identity;
pub mod logging;
pub mod registry;
pub mod settings;
pub mod sources;

// Re-export main types for convenience
pub use context::{Bootstrap, HostContext, RegistryContext};
pub use credentials::{
    AuthScheme, Credential, CredentialProvider, CredentialRequestKind, CredentialResponse,
    CredentialService, EndpointCredentialProvider, SettingsCredentialProvider,
};
pub use error::{FeedError, FeedResult};
pub use feed::{Feed, Partition};
pub use identity::{parse_package_version, PackageIdentity, ProjectToPublish};
pub use logging::{DiagnosticsSink, LogLevel, LogMessage, MemorySink, RegistryLogger, TracingSink};
pub use registry::{
    create_resource, HttpFeedResource, LocalFolderResource, PackageMetadataResource, SourceCache,
};
pub use settings::{ClientOptions, PackageSource, Settings, SourceCredentials};
pub use sources::{PackageSourceProvider, SourceSummary};
