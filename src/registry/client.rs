//! npm registry client.
//!
//! Fetches package metadata ("packuments") from
//! `<registry>/<urlencoded name>`. Transport errors and 5xx responses are
//! retried with a linear backoff; every request carries the configured
//! timeout.

use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::config::Config;
use crate::parser::ParseError;

/// Delay before the first retry; later retries wait proportionally longer.
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(250);

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("registry request failed for {package}: {source}")]
    Http {
        package: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("registry {package} {status}")]
    Status { package: String, status: u16 },

    #[error("invalid registry response for {package}: {source}")]
    Json {
        package: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Manifest(#[from] ParseError),
}

impl RegistryError {
    /// Transport failures and server errors may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            RegistryError::Http { .. } => true,
            RegistryError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Registry document for one package. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Packument {
    #[serde(rename = "dist-tags", default)]
    pub dist_tags: DistTags,

    /// Published versions in registry order
    #[serde(default)]
    pub versions: IndexMap<String, VersionMeta>,
}

impl Packument {
    pub fn latest(&self) -> Option<&str> {
        self.dist_tags.latest.as_deref()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DistTags {
    #[serde(default)]
    pub latest: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VersionMeta {
    /// Usually a message string, occasionally `true`
    #[serde(default)]
    pub deprecated: Option<serde_json::Value>,
}

impl VersionMeta {
    /// Whether the `deprecated` field holds a truthy value.
    pub fn is_deprecated(&self) -> bool {
        use serde_json::Value;

        match &self.deprecated {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
            Some(Value::Array(_)) | Some(Value::Object(_)) => true,
        }
    }
}

/// Anything that can produce a packument for a package name.
#[async_trait]
pub trait PackageSource: Send + Sync {
    async fn packument(&self, name: &str) -> RegistryResult<Packument>;
}

/// HTTP client for an npm-compatible registry.
#[derive(Debug, Clone)]
pub struct NpmRegistry {
    client: Client,
    base_url: String,
    retries: u32,
    backoff: Duration,
}

impl NpmRegistry {
    /// Creates a client from the registry settings in `config`.
    pub fn new(config: &Config) -> RegistryResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("pua/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .build()
            .map_err(RegistryError::Client)?;

        Ok(Self {
            client,
            base_url: config.registry_url.trim_end_matches('/').to_string(),
            retries: config.retries,
            backoff: DEFAULT_BACKOFF,
        })
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Packument URL for `name`. Scoped names are encoded as one segment.
    pub fn packument_url(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, urlencoding::encode(name))
    }

    async fn fetch_once(&self, name: &str, url: &str) -> RegistryResult<Packument> {
        let http_err = |source| RegistryError::Http {
            package: name.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(http_err)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RegistryError::Status {
                package: name.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(http_err)?;
        serde_json::from_slice(&body).map_err(|source| RegistryError::Json {
            package: name.to_string(),
            source,
        })
    }
}

#[async_trait]
impl PackageSource for NpmRegistry {
    async fn packument(&self, name: &str) -> RegistryResult<Packument> {
        let url = self.packument_url(name);
        let mut attempt = 0;

        loop {
            match self.fetch_once(name, &url).await {
                Err(e) if e.is_retryable() && attempt < self.retries => {
                    attempt += 1;
                    tracing::debug!(package = name, attempt, error = %e, "retrying registry lookup");
                    tokio::time::sleep(self.backoff * attempt).await;
                }
                result => return result,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPRESS: &str = r#"{
        "name": "express",
        "dist-tags": {"latest": "4.19.2"},
        "versions": {
            "4.17.0": {"version": "4.17.0", "deprecated": "security issue"},
            "4.18.2": {"version": "4.18.2"},
            "4.19.2": {"version": "4.19.2"}
        },
        "time": {"created": "2010-12-29T19:38:25.450Z"}
    }"#;

    fn registry_for(server: &mockito::Server, retries: u32) -> NpmRegistry {
        let config = Config::new()
            .with_registry_url(format!("{}/", server.url()))
            .with_retries(retries);
        NpmRegistry::new(&config)
            .unwrap()
            .with_backoff(Duration::ZERO)
    }

    #[test]
    fn test_packument_url_encodes_scoped_names() {
        let registry = NpmRegistry::new(&Config::new()).unwrap();
        assert_eq!(
            registry.packument_url("@types/node"),
            "https://registry.npmjs.org/%40types%2Fnode"
        );
        assert_eq!(
            registry.packument_url("lodash"),
            "https://registry.npmjs.org/lodash"
        );
    }

    #[test]
    fn test_deprecated_truthiness() {
        let meta = |v: serde_json::Value| VersionMeta {
            deprecated: Some(v),
        };

        assert!(meta(serde_json::json!("use something else")).is_deprecated());
        assert!(meta(serde_json::json!(true)).is_deprecated());
        assert!(!meta(serde_json::json!("")).is_deprecated());
        assert!(!meta(serde_json::json!(false)).is_deprecated());
        assert!(!VersionMeta::default().is_deprecated());
    }

    #[test]
    fn test_packument_parses_in_registry_order() {
        let packument: Packument = serde_json::from_str(EXPRESS).unwrap();
        assert_eq!(packument.latest(), Some("4.19.2"));
        let versions: Vec<&str> = packument.versions.keys().map(String::as_str).collect();
        assert_eq!(versions, vec!["4.17.0", "4.18.2", "4.19.2"]);
        assert!(packument.versions["4.17.0"].is_deprecated());
    }

    #[tokio::test]
    async fn test_fetch_packument() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/express")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(EXPRESS)
            .create_async()
            .await;

        let registry = registry_for(&server, 0);
        let packument = registry.packument("express").await.unwrap();
        assert_eq!(packument.latest(), Some("4.19.2"));
        assert_eq!(packument.versions.len(), 3);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("GET", "/left-padd")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let registry = registry_for(&server, 3);
        let err = registry.packument("left-padd").await.unwrap_err();
        assert!(matches!(err, RegistryError::Status { status: 404, .. }));
        assert_eq!(err.to_string(), "registry left-padd 404");
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("GET", "/flaky")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let registry = registry_for(&server, 2);
        let err = registry.packument("flaky").await.unwrap_err();
        assert!(matches!(err, RegistryError::Status { status: 503, .. }));
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_invalid_body() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/broken")
            .with_status(200)
            .with_body("<html>")
            .create_async()
            .await;

        let registry = registry_for(&server, 0);
        let err = registry.packument("broken").await.unwrap_err();
        assert!(matches!(err, RegistryError::Json { .. }));
        assert!(!err.is_retryable());
    }
}
