//! Shared types for manifest parsing.
//!
//! This module defines the data structures used to represent a
//! package.json manifest and the dependencies it declares.

use indexmap::{IndexMap, IndexSet};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Dependency name to version range, in declaration order.
pub type DependencyMap = IndexMap<String, String>;

/// Represents the structure of a package.json file.
///
/// Only the fields needed for usage analysis are captured; everything
/// else in the file is ignored. Captured fields of an unexpected shape are
/// treated as absent, and non-string dependency specs are kept as their
/// JSON text.
///
/// # Example
///
/// ```
/// use pua::parser::types::PackageJson;
///
/// let json = r#"{"name": "my-app", "dependencies": {"axios": "^1.0.0"}}"#;
/// let pkg: PackageJson = serde_json::from_str(json).unwrap();
/// assert_eq!(pkg.name, Some("my-app".to_string()));
/// assert!(pkg.has_dependencies());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PackageJson {
    /// The name of the package.
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,

    /// The version of the package (semver format).
    #[serde(default, deserialize_with = "lenient")]
    pub version: Option<String>,

    /// Runtime dependencies.
    #[serde(default, deserialize_with = "dependency_map")]
    pub dependencies: Option<DependencyMap>,

    /// Development-only dependencies (testing, building, etc.).
    #[serde(
        rename = "devDependencies",
        default,
        deserialize_with = "dependency_map"
    )]
    pub dev_dependencies: Option<DependencyMap>,

    /// Optional dependencies that enhance functionality if available.
    #[serde(
        rename = "optionalDependencies",
        default,
        deserialize_with = "dependency_map"
    )]
    pub optional_dependencies: Option<DependencyMap>,

    /// Peer dependencies that the host package must provide.
    #[serde(
        rename = "peerDependencies",
        default,
        deserialize_with = "dependency_map"
    )]
    pub peer_dependencies: Option<DependencyMap>,

    /// Workspace globs for monorepo roots.
    #[serde(default, deserialize_with = "lenient")]
    pub workspaces: Option<Workspaces>,
}

/// Deserialize an optional field, treating a value of the wrong shape as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

/// Deserialize a dependency category. Non-object categories are absent;
/// non-string specs (e.g. `{"path": "..."}`) keep their JSON text.
fn dependency_map<'de, D>(deserializer: D) -> Result<Option<DependencyMap>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries: Option<IndexMap<String, Value>> = lenient(deserializer)?;

    Ok(entries.map(|entries| {
        entries
            .into_iter()
            .map(|(name, spec)| match spec {
                Value::String(range) => (name, range),
                other => (name, other.to_string()),
            })
            .collect()
    }))
}

impl PackageJson {
    /// Returns true if the package has any dependencies defined.
    pub fn has_dependencies(&self) -> bool {
        DependencyType::ALL
            .iter()
            .any(|ty| self.category(*ty).is_some_and(|d| !d.is_empty()))
    }

    /// Returns the total count of all dependency entries.
    pub fn dependency_count(&self) -> usize {
        DependencyType::ALL
            .iter()
            .map(|ty| self.category(*ty).map_or(0, |d| d.len()))
            .sum()
    }

    /// Returns the map for one dependency category, if present.
    pub fn category(&self, dep_type: DependencyType) -> Option<&DependencyMap> {
        match dep_type {
            DependencyType::Production => self.dependencies.as_ref(),
            DependencyType::Development => self.dev_dependencies.as_ref(),
            DependencyType::Optional => self.optional_dependencies.as_ref(),
            DependencyType::Peer => self.peer_dependencies.as_ref(),
        }
    }

    /// Names declared in one category, in declaration order.
    pub fn names(&self, dep_type: DependencyType) -> Vec<&str> {
        self.category(dep_type)
            .map(|d| d.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Unique union of all declared names across every category.
    ///
    /// Order follows the category order of [`DependencyType::ALL`], then
    /// declaration order within each category.
    pub fn declared_names(&self) -> IndexSet<String> {
        DependencyType::ALL
            .iter()
            .filter_map(|ty| self.category(*ty))
            .flat_map(|d| d.keys().cloned())
            .collect()
    }

    /// Workspace glob patterns declared by this manifest, if any.
    pub fn workspace_patterns(&self) -> Option<&[String]> {
        self.workspaces.as_ref().map(Workspaces::patterns)
    }
}

/// The `workspaces` field of a monorepo root.
///
/// npm and yarn accept either a plain list of globs or an object with a
/// `packages` list (yarn adds `nohoist` next to it).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Workspaces {
    List(Vec<String>),
    Config {
        #[serde(default)]
        packages: Vec<String>,
    },
}

impl Workspaces {
    /// Returns the glob patterns regardless of declaration style.
    pub fn patterns(&self) -> &[String] {
        match self {
            Workspaces::List(patterns) => patterns,
            Workspaces::Config { packages } => packages,
        }
    }
}

/// Categorizes the type of dependency relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyType {
    /// Runtime dependencies (`dependencies`).
    Production,

    /// Development dependencies (`devDependencies`).
    Development,

    /// Optional dependencies (`optionalDependencies`).
    /// Installation continues even if they fail.
    Optional,

    /// Peer dependencies (`peerDependencies`).
    /// Expected to be provided by the consumer.
    Peer,
}

impl DependencyType {
    /// Every category, in the order declared names are unioned.
    pub const ALL: [DependencyType; 4] = [
        DependencyType::Production,
        DependencyType::Development,
        DependencyType::Optional,
        DependencyType::Peer,
    ];

    /// Returns a short label for the dependency type.
    pub fn label(&self) -> &'static str {
        match self {
            DependencyType::Production => "prod",
            DependencyType::Development => "dev",
            DependencyType::Optional => "optional",
            DependencyType::Peer => "peer",
        }
    }

    /// The package.json key this category is read from.
    pub fn manifest_key(&self) -> &'static str {
        match self {
            DependencyType::Production => "dependencies",
            DependencyType::Development => "devDependencies",
            DependencyType::Optional => "optionalDependencies",
            DependencyType::Peer => "peerDependencies",
        }
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DependencyType::Production => "production",
            DependencyType::Development => "development",
            DependencyType::Optional => "optional",
            DependencyType::Peer => "peer",
        };
        write!(f, "{}", s)
    }
}

/// A single declared dependency with its range and category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// The package name (e.g., "react", "@scope/pkg").
    pub name: String,

    /// The version range (e.g., "^18.0.0", "~1.2.3").
    pub version: String,

    /// The category of this dependency.
    pub dep_type: DependencyType,
}

impl Dependency {
    /// Creates a new Dependency instance.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        dep_type: DependencyType,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            dep_type,
        }
    }

    /// Returns true if this is a runtime dependency.
    pub fn is_production(&self) -> bool {
        self.dep_type == DependencyType::Production
    }

    /// Returns true if this is a development dependency.
    pub fn is_development(&self) -> bool {
        self.dep_type == DependencyType::Development
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} ({})", self.name, self.version, self.dep_type)
    }
}
