//! Local settings: package sources, their credentials, and client options
//!
//! Settings live in `feedcheck.toml` files. Files are discovered from the working
//! directory up to the filesystem root, followed by the user-level file. The
//! nearest file wins for every value it sets.

use crate::core::error::{FeedError, FeedResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name searched for in the working directory and its parents
pub const SETTINGS_FILE_NAME: &str = "feedcheck.toml";

/// Environment variable overriding the user-level config directory
pub const CONFIG_DIR_ENV: &str = "FEEDCHECK_CONFIG_DIR";

/// On-disk layout of a settings file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SettingsFile {
    #[serde(default)]
    pub config: ClientOptionsFile,

    #[serde(default)]
    pub sources: Vec<SourceEntry>,
}

/// `[config]` section; every value is optional so files can be layered
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClientOptionsFile {
    #[serde(default)]
    pub http_timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_concurrency: Option<usize>,
    #[serde(default)]
    pub no_cache: Option<bool>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

/// `[[sources]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEntry {
    pub name: String,
    pub url: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub credentials: Option<CredentialsEntry>,
}

fn default_enabled() -> bool {
    true
}

/// `[sources.credentials]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsEntry {
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    /// Read the password from this environment variable instead
    #[serde(default)]
    pub password_env: Option<String>,
}

/// Resolved client options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    pub http_timeout_secs: u64,
    pub max_concurrency: usize,
    pub no_cache: bool,
    pub user_agent: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            http_timeout_secs: 100,
            max_concurrency: 1,
            no_cache: false,
            user_agent: format!("feedcheck/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Stored credentials of a package source
#[derive(Clone, PartialEq, Eq)]
pub struct SourceCredentials {
    pub username: String,
    pub password: String,
}

impl SourceCredentials {
    /// Credentials are usable only when both parts are present
    pub fn is_valid(&self) -> bool {
        !self.username.trim().is_empty() && !self.password.is_empty()
    }
}

impl std::fmt::Debug for SourceCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A configured package source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSource {
    pub name: String,
    pub url: String,
    pub enabled: bool,
    pub credentials: Option<SourceCredentials>,
}

/// Settings merged from every discovered file
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub options: ClientOptions,
    pub sources: Vec<PackageSource>,
    /// Files that contributed, nearest first
    pub files: Vec<PathBuf>,
}

impl Settings {
    /// Discover and load settings relative to a working directory
    pub fn load(working_dir: &Path) -> FeedResult<Self> {
        if !working_dir.is_dir() {
            return Err(FeedError::Configuration(format!(
                "Working directory {} does not exist",
                working_dir.display()
            )));
        }

        let mut files = discover_settings_files(working_dir);
        if let Some(user_file) = user_settings_path() {
            if user_file.is_file() && !files.contains(&user_file) {
                files.push(user_file);
            }
        }

        Self::load_files(&files)
    }

    /// Load and merge an explicit list of files, nearest first
    pub fn load_files(files: &[PathBuf]) -> FeedResult<Self> {
        let mut parsed = Vec::with_capacity(files.len());
        for path in files {
            debug!("Loading settings from {}", path.display());
            parsed.push(read_settings_file(path)?);
        }

        let mut settings = Self::merge(parsed)?;
        settings.files = files.to_vec();
        Ok(settings)
    }

    /// Merge parsed files, nearest first
    pub fn merge(files: Vec<SettingsFile>) -> FeedResult<Self> {
        let mut options = ClientOptions::default();
        let mut timeout = None;
        let mut concurrency = None;
        let mut no_cache = None;
        let mut user_agent = None;
        let mut sources: Vec<PackageSource> = Vec::new();

        for file in files {
            timeout = timeout.or(file.config.http_timeout_secs);
            concurrency = concurrency.or(file.config.max_concurrency);
            no_cache = no_cache.or(file.config.no_cache);
            user_agent = user_agent.or(file.config.user_agent);

            for entry in file.sources {
                if sources.iter().any(|s| s.name.eq_ignore_ascii_case(&entry.name)) {
                    continue;
                }
                sources.push(resolve_source(entry)?);
            }
        }

        if let Some(t) = timeout {
            options.http_timeout_secs = t;
        }
        if let Some(c) = concurrency {
            if c == 0 {
                return Err(FeedError::Configuration(
                    "max_concurrency must be at least 1".to_string(),
                ));
            }
            options.max_concurrency = c;
        }
        if let Some(n) = no_cache {
            options.no_cache = n;
        }
        if let Some(ua) = user_agent {
            options.user_agent = ua;
        }

        Ok(Self {
            options,
            sources,
            files: Vec::new(),
        })
    }
}

/// Walk up from `start` collecting settings files, nearest first
pub fn discover_settings_files(start: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut current = Some(start);
    while let Some(dir) = current {
        let candidate = dir.join(SETTINGS_FILE_NAME);
        if candidate.is_file() {
            found.push(candidate);
        }
        current = dir.parent();
    }
    found
}

/// User-level settings file location
pub fn user_settings_path() -> Option<PathBuf> {
    if let Ok(dir) = env::var(CONFIG_DIR_ENV) {
        return Some(PathBuf::from(dir).join(SETTINGS_FILE_NAME));
    }
    dirs::config_dir().map(|d| d.join("feedcheck").join(SETTINGS_FILE_NAME))
}

fn read_settings_file(path: &Path) -> FeedResult<SettingsFile> {
    let content = fs::read_to_string(path).map_err(|e| {
        FeedError::Configuration(format!(
            "Failed to read settings file {}: {}",
            path.display(),
            e
        ))
    })?;

    toml::from_str(&content).map_err(|e| {
        FeedError::Configuration(format!(
            "Failed to parse settings file {}: {}",
            path.display(),
            e
        ))
    })
}

fn resolve_source(entry: SourceEntry) -> FeedResult<PackageSource> {
    if entry.name.trim().is_empty() {
        return Err(FeedError::Configuration(
            "Package source name cannot be empty".to_string(),
        ));
    }
    if entry.url.trim().is_empty() {
        return Err(FeedError::Configuration(format!(
            "Package source '{}' has no url",
            entry.name
        )));
    }

    let credentials = entry.credentials.map(|c| {
        // An unset environment variable leaves the credentials invalid rather than failing the load
        let password = match (c.password, c.password_env) {
            (Some(p), _) => p,
            (None, Some(var)) => env::var(&var).unwrap_or_default(),
            (None, None) => String::new(),
        };
        SourceCredentials {
            username: c.username,
            password,
        }
    });

    Ok(PackageSource {
        name: entry.name,
        url: entry.url.trim().to_string(),
        enabled: entry.enabled,
        credentials,
    })
}
