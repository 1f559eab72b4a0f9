//! Parser for npm package.json files.
//!
//! This module loads the manifest at a project root and extracts the
//! declared dependencies for usage analysis.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use super::types::{Dependency, DependencyType, PackageJson};

/// File name of the manifest at every project root.
pub const MANIFEST_FILE: &str = "package.json";

/// Errors that can occur during package.json loading.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// No manifest exists at the project root.
    #[error("package.json not found in {}", path.display())]
    NotFound { path: PathBuf },

    /// Failed to read the file from disk.
    #[error("Failed to read file: {0}")]
    IoError(#[from] io::Error),

    /// Failed to parse JSON content.
    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The package.json structure is invalid.
    #[error("Invalid package.json: {0}")]
    InvalidPackage(String),
}

impl ParseError {
    /// True when the manifest is absent, as opposed to present but malformed.
    pub fn is_missing(&self) -> bool {
        matches!(self, ParseError::NotFound { .. })
    }
}

/// Result type alias for parser operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Path of the manifest for a project root.
pub fn manifest_path(project_root: &Path) -> PathBuf {
    project_root.join(MANIFEST_FILE)
}

/// Returns true if a manifest file exists at the project root.
pub fn has_manifest(project_root: &Path) -> bool {
    manifest_path(project_root).is_file()
}

/// Loads and validates the manifest at a project root.
///
/// Fails with [`ParseError::NotFound`] if there is no package.json, and
/// with [`ParseError::JsonError`] or [`ParseError::InvalidPackage`] if it
/// exists but is malformed.
pub fn load_manifest(project_root: &Path) -> ParseResult<PackageJson> {
    let path = manifest_path(project_root);
    if !path.is_file() {
        return Err(ParseError::NotFound {
            path: project_root.to_path_buf(),
        });
    }

    let pkg = parse_file(&path)?;
    validate(&pkg)?;
    Ok(pkg)
}

/// Parses a package.json file from a file path.
pub fn parse_file(path: &Path) -> ParseResult<PackageJson> {
    let content = fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ParseError::NotFound {
            path: path.parent().unwrap_or(path).to_path_buf(),
        },
        _ => ParseError::IoError(e),
    })?;
    parse_str(&content)
}

/// Parses a package.json from a string.
///
/// # Example
///
/// ```
/// use pua::parser::package_json::parse_str;
///
/// let json = r#"{"name": "my-app", "version": "1.0.0"}"#;
/// let pkg = parse_str(json).unwrap();
/// assert_eq!(pkg.name, Some("my-app".to_string()));
/// ```
pub fn parse_str(content: &str) -> ParseResult<PackageJson> {
    let pkg: PackageJson = serde_json::from_str(content)?;
    Ok(pkg)
}

/// Validates a parsed PackageJson structure.
///
/// Every declared dependency key must be a non-empty package name.
pub fn validate(pkg: &PackageJson) -> ParseResult<()> {
    for dep_type in DependencyType::ALL {
        let Some(deps) = pkg.category(dep_type) else {
            continue;
        };
        if deps.keys().any(|name| name.trim().is_empty()) {
            return Err(ParseError::InvalidPackage(format!(
                "empty dependency name in {}",
                dep_type.manifest_key()
            )));
        }
    }
    Ok(())
}

/// Extracts all dependencies from a PackageJson into a flat list.
///
/// Categories are visited in [`DependencyType::ALL`] order and entries keep
/// their declaration order. A name declared in two categories appears
/// twice, once per category.
///
/// # Example
///
/// ```
/// use pua::parser::package_json::{parse_str, extract_dependencies};
/// use pua::parser::types::DependencyType;
///
/// let json = r#"{
///     "dependencies": {"react": "^18.0.0"},
///     "devDependencies": {"typescript": "^5.0.0"}
/// }"#;
///
/// let pkg = parse_str(json).unwrap();
/// let deps = extract_dependencies(&pkg);
///
/// assert_eq!(deps.len(), 2);
/// assert_eq!(deps[0].dep_type, DependencyType::Production);
/// assert_eq!(deps[1].name, "typescript");
/// ```
pub fn extract_dependencies(pkg: &PackageJson) -> Vec<Dependency> {
    DependencyType::ALL
        .iter()
        .filter_map(|ty| pkg.category(*ty).map(|deps| (*ty, deps)))
        .flat_map(|(ty, deps)| {
            deps.iter()
                .map(move |(name, version)| Dependency::new(name, version, ty))
        })
        .collect()
}

/// Dependencies worth a registry lookup: each name once, in first-seen
/// order, with the range from the last of dependencies, devDependencies
/// and optionalDependencies that declares it. Peer ranges describe the
/// host, not this package, so they are skipped.
pub fn registry_dependencies(pkg: &PackageJson) -> Vec<Dependency> {
    let mut resolved: IndexMap<String, Dependency> = IndexMap::new();
    for dep in extract_dependencies(pkg) {
        if dep.dep_type != DependencyType::Peer {
            resolved.insert(dep.name.clone(), dep);
        }
    }
    resolved.into_values().collect()
}
