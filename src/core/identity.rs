//! Package identities and the projects a build wants to publish

use crate::core::error::{FeedError, FeedResult};
use semver::{BuildMetadata, Version};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Parse a target version string
pub fn parse_package_version(input: &str) -> FeedResult<Version> {
    Version::parse(input.trim()).map_err(|source| FeedError::Parse {
        input: input.to_string(),
        source,
    })
}

/// Normalized, lowercase form of a version used for feed comparisons.
/// Build metadata does not participate in package identity.
pub fn normalize_version(version: &Version) -> String {
    let mut normalized = version.clone();
    normalized.build = BuildMetadata::EMPTY;
    normalized.to_string().to_lowercase()
}

/// A project the build pipeline would publish as a package
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectToPublish {
    pub name: String,
}

impl ProjectToPublish {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for ProjectToPublish {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl From<&str> for ProjectToPublish {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Name and version of a package on a feed
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageIdentity {
    id: String,
    version: Version,
}

impl PackageIdentity {
    /// Create a new identity with validation
    pub fn new(id: impl Into<String>, version: Version) -> FeedResult<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(FeedError::InvalidArgument(
                "Package id cannot be empty".to_string(),
            ));
        }
        if id.contains('/') || id.contains('\\') {
            return Err(FeedError::InvalidArgument(format!(
                "Package id '{}' cannot contain path separators",
                id
            )));
        }
        if id.starts_with('.') {
            return Err(FeedError::InvalidArgument(format!(
                "Package id '{}' cannot start with '.'",
                id
            )));
        }
        Ok(Self { id, version })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Lowercase id as used by feed URLs and folder layouts
    pub fn lower_id(&self) -> String {
        self.id.to_lowercase()
    }

    pub fn normalized_version(&self) -> String {
        normalize_version(&self.version)
    }

    /// Whether a version string reported by a feed denotes this identity's version
    pub fn matches_version(&self, reported: &str) -> bool {
        match Version::parse(reported.trim()) {
            Ok(v) => normalize_version(&v) == self.normalized_version(),
            Err(_) => false,
        }
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.version)
    }
}
