//! Source code analysis: which declared dependencies are actually used.
//!
//! # Features
//!
//! - Parse ES module `import` declarations (including `import type` and
//!   TypeScript `import x = require(...)`)
//! - Parse CommonJS `require()` calls
//! - Optionally count dynamic `import()` and `export ... from` re-exports
//! - Normalize references to package names (`@scope/pkg/sub` -> `@scope/pkg`)
//! - Partition declared dependencies into used / unused / dev-unused
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use pua::analysis::detect_usage;
//!
//! let result = detect_usage(Path::new("."))?;
//! println!("unused: {}", result.unused.join(", "));
//! println!("dev-unused: {}", result.dev_unused.join(", "));
//! ```

pub mod collector;
pub mod imports;
pub mod usage;

pub use collector::{collect_files, FileCollector, SourceFile, EXCLUDED_DIRS};
pub use imports::{
    normalize_package_name, AnalysisError, AnalysisResult, ImportAnalyzer, ImportReference,
    ReferenceKind, SourceLanguage,
};
pub use usage::{
    detect_usage, FileFailure, PackageStatus, ScanDiagnostics, UsageDetector, UsageResult,
};
