//! Registry checks: which declared dependencies are outdated or deprecated.
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use pua::config::Config;
//! use pua::registry::{check_project, NpmRegistry};
//!
//! let registry = NpmRegistry::new(&Config::from_env())?;
//! let suggestions = check_project(Path::new("."), &registry).await?;
//! for o in &suggestions.outdated {
//!     println!("{} {} -> {}", o.name, o.current, o.latest);
//! }
//! ```

pub mod check;
pub mod client;

pub use check::{
    check_project, evaluate, resolve_current, Deprecated, Evaluation, LookupFailure, Outdated,
    Suggestions,
};
pub use client::{
    DistTags, NpmRegistry, PackageSource, Packument, RegistryError, RegistryResult, VersionMeta,
    DEFAULT_BACKOFF,
};
