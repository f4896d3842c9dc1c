//! Read-only view over the package sources loaded from settings

use crate::core::settings::{PackageSource, Settings};
use serde::Serialize;

/// Source listing entry, safe to print (no secrets)
#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary {
    pub name: String,
    pub url: String,
    pub enabled: bool,
    pub has_credentials: bool,
}

/// Package sources in load order
#[derive(Debug, Clone, Default)]
pub struct PackageSourceProvider {
    sources: Vec<PackageSource>,
}

impl PackageSourceProvider {
    pub fn new(sources: Vec<PackageSource>) -> Self {
        Self { sources }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.sources.clone())
    }

    /// All sources, including disabled ones, in load order
    pub fn load_package_sources(&self) -> &[PackageSource] {
        &self.sources
    }

    pub fn enabled_sources(&self) -> impl Iterator<Item = &PackageSource> {
        self.sources.iter().filter(|s| s.enabled)
    }

    /// Look up a source by name (case-insensitive)
    pub fn find_by_name(&self, name: &str) -> Option<&PackageSource> {
        self.sources
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn summaries(&self) -> Vec<SourceSummary> {
        self.sources
            .iter()
            .map(|s| SourceSummary {
                name: s.name.clone(),
                url: s.url.clone(),
                enabled: s.enabled,
                has_credentials: s.credentials.as_ref().is_some_and(|c| c.is_valid()),
            })
            .collect()
    }
}
