//! Runtime configuration.
//!
//! Defaults can be overridden through `PUA_*` environment variables and
//! then by command-line flags via the `with_*` builders.

use std::path::PathBuf;
use std::time::Duration;

use crate::analysis::{AnalysisResult, FileCollector, ReferenceKind, UsageDetector};

pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org";
pub const DEFAULT_DB_FILE: &str = "pua.sqlite";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RETRIES: u32 = 2;

pub const ENV_REGISTRY_URL: &str = "PUA_REGISTRY_URL";
pub const ENV_TIMEOUT_SECS: &str = "PUA_REGISTRY_TIMEOUT_SECS";
pub const ENV_RETRIES: &str = "PUA_REGISTRY_RETRIES";
pub const ENV_DB_PATH: &str = "PUA_DB_PATH";

/// Configuration shared by every command.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the npm registry
    pub registry_url: String,
    /// Timeout applied to each registry request
    pub request_timeout: Duration,
    /// Extra attempts after a transport error or 5xx response
    pub retries: u32,
    /// SQLite file for the audit log
    pub db_path: PathBuf,
    /// Directory names skipped on top of node_modules, dist and build
    pub extra_ignored_dirs: Vec<String>,
    /// Count dynamic `import()` and `export ... from` as usage
    pub include_dynamic: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retries: DEFAULT_RETRIES,
            db_path: PathBuf::from(DEFAULT_DB_FILE),
            extra_ignored_dirs: vec![],
            include_dynamic: false,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by `lookup`. Unparseable values are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_REGISTRY_URL).filter(|v| !v.trim().is_empty()) {
            config.registry_url = url.trim().to_string();
        }
        if let Some(secs) = parse_env::<u64>(&lookup, ENV_TIMEOUT_SECS) {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = parse_env::<u32>(&lookup, ENV_RETRIES) {
            config.retries = retries;
        }
        if let Some(path) = lookup(ENV_DB_PATH).filter(|v| !v.is_empty()) {
            config.db_path = PathBuf::from(path);
        }

        config
    }

    pub fn with_registry_url(mut self, url: impl Into<String>) -> Self {
        self.registry_url = url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }

    pub fn with_ignored_dirs(mut self, dirs: Vec<String>) -> Self {
        self.extra_ignored_dirs = dirs;
        self
    }

    pub fn with_include_dynamic(mut self, include: bool) -> Self {
        self.include_dynamic = include;
        self
    }

    /// Reference kinds that count as usage.
    pub fn reference_kinds(&self) -> Vec<ReferenceKind> {
        if self.include_dynamic {
            ReferenceKind::ALL.to_vec()
        } else {
            ReferenceKind::DEFAULT.to_vec()
        }
    }

    pub fn file_collector(&self) -> FileCollector {
        FileCollector::new().with_excluded_dirs(self.extra_ignored_dirs.iter().cloned())
    }

    /// Build a usage detector honoring this configuration.
    pub fn usage_detector(&self) -> AnalysisResult<UsageDetector> {
        Ok(UsageDetector::new()?
            .with_collector(self.file_collector())
            .with_reference_kinds(self.reference_kinds()))
    }
}

fn parse_env<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring invalid environment value");
            None
        }
    }
}
