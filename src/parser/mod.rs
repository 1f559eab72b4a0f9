//! Manifest loading.
//!
//! Reads the package.json at a project root and exposes the declared
//! dependency categories (`dependencies`, `devDependencies`,
//! `optionalDependencies`, `peerDependencies`) and workspace globs.
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use pua::parser::{load_manifest, DependencyType};
//!
//! let pkg = load_manifest(Path::new("."))?;
//! for name in pkg.names(DependencyType::Development) {
//!     println!("dev: {}", name);
//! }
//! ```

pub mod package_json;
pub mod types;

pub use package_json::{
    extract_dependencies, has_manifest, load_manifest, manifest_path, parse_file, parse_str,
    registry_dependencies, validate, ParseError, ParseResult, MANIFEST_FILE,
};

pub use types::{Dependency, DependencyMap, DependencyType, PackageJson, Workspaces};
