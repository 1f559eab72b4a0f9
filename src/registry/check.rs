//! Outdated and deprecated dependency checks.

use std::path::Path;

use node_semver::{Range, Version};
use serde::Serialize;

use super::client::{PackageSource, Packument, RegistryResult};
use crate::parser::{load_manifest, registry_dependencies};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outdated {
    pub name: String,
    pub current: String,
    pub latest: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deprecated {
    pub name: String,
    pub version: String,
}

/// A package whose registry lookup failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupFailure {
    pub name: String,
    pub reason: String,
}

/// Registry findings for one project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestions {
    pub outdated: Vec<Outdated>,
    pub deprecated: Vec<Deprecated>,
    pub failed: Vec<LookupFailure>,
    /// Number of declared packages looked up
    pub checked: usize,
}

impl Suggestions {
    pub fn is_up_to_date(&self) -> bool {
        self.outdated.is_empty() && self.deprecated.is_empty()
    }
}

/// Result of comparing one declared range against its packument.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluation {
    pub current: Option<String>,
    pub outdated: Option<Outdated>,
    pub deprecated: Option<Deprecated>,
}

/// Pick the published version a declared range stands for.
///
/// The range's minimum version when it is published, otherwise the first
/// published version (in registry order) satisfying the range. `None` when
/// the range does not parse or nothing satisfies it.
pub fn resolve_current(range: &str, packument: &Packument) -> Option<String> {
    let range = Range::parse(range.trim()).ok()?;

    if let Some(min) = range.min_version() {
        let min = min.to_string();
        if packument.versions.contains_key(&min) {
            return Some(min);
        }
    }

    packument
        .versions
        .keys()
        .find(|v| Version::parse(v.as_str()).is_ok_and(|v| range.satisfies(&v)))
        .cloned()
}

/// Evaluate one declared dependency against its packument.
pub fn evaluate(name: &str, range: &str, packument: &Packument) -> Evaluation {
    let Some(current) = resolve_current(range, packument) else {
        return Evaluation::default();
    };

    let outdated = packument.latest().and_then(|latest| {
        let latest_version = Version::parse(latest).ok()?;
        let current_version = Version::parse(current.as_str()).ok()?;
        (latest_version > current_version).then(|| Outdated {
            name: name.to_string(),
            current: current.clone(),
            latest: latest.to_string(),
        })
    });

    let deprecated = packument
        .versions
        .get(&current)
        .filter(|meta| meta.is_deprecated())
        .map(|_| Deprecated {
            name: name.to_string(),
            version: current.clone(),
        });

    Evaluation {
        current: Some(current),
        outdated,
        deprecated,
    }
}

/// Check every declared dependency of the project at `project_root`.
///
/// Each name is looked up once, with the range from the last of
/// dependencies, devDependencies and optionalDependencies declaring it.
/// Peer-only names are not looked up. A failed lookup is recorded and does
/// not abort the check.
pub async fn check_project(
    project_root: &Path,
    source: &dyn PackageSource,
) -> RegistryResult<Suggestions> {
    let pkg = load_manifest(project_root)?;
    let mut suggestions = Suggestions::default();

    for dep in registry_dependencies(&pkg) {
        suggestions.checked += 1;

        match source.packument(&dep.name).await {
            Ok(packument) => {
                let evaluation = evaluate(&dep.name, &dep.version, &packument);
                if evaluation.current.is_none() {
                    tracing::debug!(
                        package = %dep.name,
                        range = %dep.version,
                        "no published version satisfies the declared range"
                    );
                }
                suggestions.outdated.extend(evaluation.outdated);
                suggestions.deprecated.extend(evaluation.deprecated);
            }
            Err(e) => {
                tracing::warn!(package = %dep.name, error = %e, "registry lookup failed");
                suggestions.failed.push(LookupFailure {
                    name: dep.name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        project = %project_root.display(),
        checked = suggestions.checked,
        outdated = suggestions.outdated.len(),
        deprecated = suggestions.deprecated.len(),
        "registry check complete"
    );
    Ok(suggestions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    fn packument(json: &str) -> Packument {
        serde_json::from_str(json).unwrap()
    }

    fn lodash() -> Packument {
        packument(
            r#"{
                "dist-tags": {"latest": "4.17.21"},
                "versions": {
                    "4.17.0": {},
                    "4.17.20": {},
                    "4.17.21": {}
                }
            }"#,
        )
    }

    struct FakeRegistry {
        packuments: HashMap<String, Packument>,
    }

    #[async_trait]
    impl PackageSource for FakeRegistry {
        async fn packument(&self, name: &str) -> RegistryResult<Packument> {
            self.packuments
                .get(name)
                .cloned()
                .ok_or_else(|| RegistryError::Status {
                    package: name.to_string(),
                    status: 404,
                })
        }
    }

    #[test]
    fn test_resolve_current_prefers_published_minimum() {
        assert_eq!(resolve_current("^4.17.0", &lodash()).as_deref(), Some("4.17.0"));
        assert_eq!(resolve_current("4.17.20", &lodash()).as_deref(), Some("4.17.20"));
    }

    #[test]
    fn test_resolve_current_falls_back_to_first_satisfying() {
        // 4.16.0 was never published; 4.17.0 is the first satisfying version.
        assert_eq!(resolve_current("^4.16.0", &lodash()).as_deref(), Some("4.17.0"));
    }

    #[test]
    fn test_resolve_current_unresolvable() {
        assert_eq!(resolve_current("^5.0.0", &lodash()), None);
        assert_eq!(resolve_current("github:lodash/lodash", &lodash()), None);
    }

    #[test]
    fn test_evaluate_outdated() {
        let eval = evaluate("lodash", "^4.17.0", &lodash());
        assert_eq!(
            eval.outdated,
            Some(Outdated {
                name: "lodash".to_string(),
                current: "4.17.0".to_string(),
                latest: "4.17.21".to_string(),
            })
        );
        assert_eq!(eval.deprecated, None);
    }

    #[test]
    fn test_evaluate_up_to_date() {
        let eval = evaluate("lodash", "4.17.21", &lodash());
        assert_eq!(eval.current.as_deref(), Some("4.17.21"));
        assert_eq!(eval.outdated, None);
    }

    #[test]
    fn test_evaluate_deprecated() {
        let request = packument(
            r#"{
                "dist-tags": {"latest": "2.88.2"},
                "versions": {
                    "2.88.2": {"deprecated": "request has been deprecated"}
                }
            }"#,
        );

        let eval = evaluate("request", "^2.88.0", &request);
        assert_eq!(eval.outdated, None);
        assert_eq!(
            eval.deprecated,
            Some(Deprecated {
                name: "request".to_string(),
                version: "2.88.2".to_string(),
            })
        );
    }

    #[test]
    fn test_evaluate_missing_latest_tag() {
        let pkg = packument(r#"{"versions": {"1.0.0": {}}}"#);
        let eval = evaluate("x", "^1.0.0", &pkg);
        assert_eq!(eval.current.as_deref(), Some("1.0.0"));
        assert_eq!(eval.outdated, None);
    }

    #[tokio::test]
    async fn test_check_project_records_failures() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"dependencies": {"lodash": "^4.17.0", "ghost-pkg": "^1.0.0"}}"#,
        )
        .unwrap();

        let registry = FakeRegistry {
            packuments: HashMap::from([("lodash".to_string(), lodash())]),
        };

        let suggestions = check_project(dir.path(), &registry).await.unwrap();
        assert_eq!(suggestions.checked, 2);
        assert_eq!(suggestions.outdated.len(), 1);
        assert_eq!(suggestions.outdated[0].current, "4.17.0");
        assert_eq!(suggestions.failed.len(), 1);
        assert_eq!(suggestions.failed[0].name, "ghost-pkg");
        assert_eq!(suggestions.failed[0].reason, "registry ghost-pkg 404");
        assert!(!suggestions.is_up_to_date());
    }

    #[tokio::test]
    async fn test_check_project_later_category_range_wins() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{
                "dependencies": {"lodash": "^3.0.0"},
                "devDependencies": {"lodash": "^4.17.21"}
            }"#,
        )
        .unwrap();

        let mut lodash = lodash();
        lodash.versions.insert("3.0.0".to_string(), Default::default());
        let registry = FakeRegistry {
            packuments: HashMap::from([("lodash".to_string(), lodash)]),
        };

        let suggestions = check_project(dir.path(), &registry).await.unwrap();
        assert_eq!(suggestions.checked, 1);
        assert!(suggestions.outdated.is_empty());
        assert!(suggestions.is_up_to_date());
    }

    #[tokio::test]
    async fn test_check_project_skips_peer_only_names() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{
                "dependencies": {"lodash": "4.17.21"},
                "peerDependencies": {"react": ">=16.8.0", "lodash": "^3.0.0"}
            }"#,
        )
        .unwrap();

        // react is unknown to the registry, so a lookup would show up as a failure.
        let registry = FakeRegistry {
            packuments: HashMap::from([("lodash".to_string(), lodash())]),
        };

        let suggestions = check_project(dir.path(), &registry).await.unwrap();
        assert_eq!(suggestions.checked, 1);
        assert!(suggestions.failed.is_empty());
        assert!(suggestions.is_up_to_date());
    }

    #[tokio::test]
    async fn test_check_project_without_manifest() {
        let dir = TempDir::new().unwrap();
        let registry = FakeRegistry {
            packuments: HashMap::new(),
        };

        let err = check_project(dir.path(), &registry).await.unwrap_err();
        assert!(matches!(err, RegistryError::Manifest(ref e) if e.is_missing()));
    }

    #[tokio::test]
    async fn test_check_project_no_dependencies() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), r#"{"name": "empty"}"#).unwrap();
        let registry = FakeRegistry {
            packuments: HashMap::new(),
        };

        let suggestions = check_project(dir.path(), &registry).await.unwrap();
        assert_eq!(suggestions, Suggestions::default());
        assert!(suggestions.is_up_to_date());
    }
}
