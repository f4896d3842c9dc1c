//! # feedcheck
//!
//! Determines which packages of a build still need to be pushed to one or more
//! package feeds, and supplies stored credentials for the feed requests.
//!
//! ## Architecture
//!
//! - [`core::context`] builds the shared [`RegistryContext`] once: logger,
//!   settings, package sources, credential provider chain, lookup cache.
//! - [`core::feed::Feed`] runs the existence check for one feed and splits
//!   the candidates into "already published" and "to publish".
//! - [`core::credentials`] resolves basic-auth credentials for feed URIs.
//! - [`core::registry`] answers existence queries for HTTP v3 and folder feeds.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use feedcheck::{Bootstrap, Feed, HostContext, ProjectToPublish, TracingSink};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let host = HostContext::from_current_dir(Arc::new(TracingSink))?;
//!     let bootstrap = Bootstrap::new();
//!     bootstrap.ensure_initialized(&host)?;
//!     let context = bootstrap.context().ok_or("context not built")?;
//!
//!     let feed = Feed::new("nuget.org", "https://api.nuget.org/v3/index.json", context)?;
//!     let candidates = vec![ProjectToPublish::new("Contoso.Core")];
//!     feed.check_existence(&candidates, "1.4.0").await?;
//!
//!     println!("{}", feed.describe_status(&candidates));
//!     Ok(())
//! }
//! ```

pub mod core;

pub use core::context::{Bootstrap, HostContext, RegistryContext};
pub use core::error::{FeedError, FeedResult};
pub use core::feed::{Feed, Partition};
pub use core::identity::{PackageIdentity, ProjectToPublish};
pub use core::logging::{DiagnosticsSink, LogLevel, RegistryLogger, TracingSink};

/// Version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging (safe for testing)
pub fn init_logging(verbose: bool) {
    // Only initialize logging once
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;

        let default = if verbose { "feedcheck=debug" } else { "feedcheck=warn" };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into());

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .finish();

        // This will fail silently if already initialized
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
