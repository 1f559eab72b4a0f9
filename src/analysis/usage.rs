//! Usage detection: which declared dependencies are referenced in code.
//!
//! The detector loads a project's manifest, parses every collected source
//! file, normalizes each module reference to a package name and partitions
//! the declared dependencies into used, unused and dev-unused.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::collector::{FileCollector, SourceFile};
use super::imports::{AnalysisResult, ImportAnalyzer, ReferenceKind};
use crate::parser::{load_manifest, DependencyType, PackageJson};

/// Usage status of a declared package, as persisted in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackageStatus {
    Used,
    Unused,
    DevUnused,
}

impl PackageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageStatus::Used => "used",
            PackageStatus::Unused => "unused",
            PackageStatus::DevUnused => "dev-unused",
        }
    }
}

impl fmt::Display for PackageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source file that could not be analyzed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Per-project file statistics for verbose diagnostics.
///
/// Distinguishes "no references found" from "nothing could be parsed".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanDiagnostics {
    pub files_scanned: usize,
    pub files_parsed: usize,
    pub failures: Vec<FileFailure>,
}

impl ScanDiagnostics {
    /// True when there were files to scan and none of them parsed.
    pub fn all_failed(&self) -> bool {
        self.files_scanned > 0 && self.files_parsed == 0
    }
}

/// Declared dependencies partitioned by usage.
///
/// `used`, `unused` and `dev_unused` are subsets of `declared`; `used` and
/// `unused` never overlap. Each list keeps manifest order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageResult {
    /// Declared names referenced somewhere in the sources.
    pub used: Vec<String>,
    /// Runtime dependencies never referenced.
    pub unused: Vec<String>,
    /// Development dependencies never referenced.
    pub dev_unused: Vec<String>,
    /// Union of every declared name.
    pub declared: Vec<String>,
    #[serde(skip)]
    pub diagnostics: ScanDiagnostics,
}

impl UsageResult {
    /// Partition a manifest's declarations against the set of referenced packages.
    pub fn reconcile(pkg: &PackageJson, used_packages: &HashSet<String>) -> Self {
        let declared: Vec<String> = pkg.declared_names().into_iter().collect();

        let unreferenced = |dep_type: DependencyType| -> Vec<String> {
            pkg.names(dep_type)
                .into_iter()
                .filter(|name| !used_packages.contains(*name))
                .map(str::to_string)
                .collect()
        };

        Self {
            used: declared
                .iter()
                .filter(|name| used_packages.contains(*name))
                .cloned()
                .collect(),
            unused: unreferenced(DependencyType::Production),
            dev_unused: unreferenced(DependencyType::Development),
            declared,
            diagnostics: ScanDiagnostics::default(),
        }
    }

    /// True if any runtime or development dependency is unused.
    pub fn has_unused(&self) -> bool {
        !self.unused.is_empty() || !self.dev_unused.is_empty()
    }

    /// Every reported name with its status, used first.
    pub fn statuses(&self) -> impl Iterator<Item = (&str, PackageStatus)> + '_ {
        tagged(&self.used, PackageStatus::Used)
            .chain(tagged(&self.unused, PackageStatus::Unused))
            .chain(tagged(&self.dev_unused, PackageStatus::DevUnused))
    }
}

fn tagged(
    names: &[String],
    status: PackageStatus,
) -> impl Iterator<Item = (&str, PackageStatus)> + '_ {
    names.iter().map(move |n| (n.as_str(), status))
}

/// Finds which declared dependencies a project's sources reference.
pub struct UsageDetector {
    analyzer: ImportAnalyzer,
    collector: FileCollector,
    kinds: HashSet<ReferenceKind>,
}

impl UsageDetector {
    /// Create a detector with the default exclusions and reference kinds.
    pub fn new() -> AnalysisResult<Self> {
        Ok(Self {
            analyzer: ImportAnalyzer::new()?,
            collector: FileCollector::new(),
            kinds: ReferenceKind::DEFAULT.into_iter().collect(),
        })
    }

    pub fn with_collector(mut self, collector: FileCollector) -> Self {
        self.collector = collector;
        self
    }

    /// Sets which kinds of reference count as usage.
    pub fn with_reference_kinds(mut self, kinds: impl IntoIterator<Item = ReferenceKind>) -> Self {
        self.kinds = kinds.into_iter().collect();
        self
    }

    /// Analyze one project root.
    ///
    /// Fails only on manifest errors. Files that cannot be read or parsed
    /// are skipped and listed in the result's diagnostics.
    pub fn detect(&mut self, project_root: &Path) -> AnalysisResult<UsageResult> {
        let pkg = load_manifest(project_root)?;
        let files = self.collector.collect(project_root);
        tracing::debug!(
            project = %project_root.display(),
            files = files.len(),
            "collected source files"
        );

        let (used_packages, diagnostics) = self.used_packages(&files);
        if diagnostics.all_failed() {
            tracing::warn!(
                project = %project_root.display(),
                "no source file could be parsed"
            );
        }

        let mut result = UsageResult::reconcile(&pkg, &used_packages);
        result.diagnostics = diagnostics;
        Ok(result)
    }

    /// Collect the distinct package names referenced by `files`.
    pub fn used_packages(&mut self, files: &[SourceFile]) -> (HashSet<String>, ScanDiagnostics) {
        let mut used = HashSet::new();
        let mut diagnostics = ScanDiagnostics {
            files_scanned: files.len(),
            ..Default::default()
        };

        for file in files {
            match self.analyzer.analyze_file(&file.path) {
                Ok(references) => {
                    diagnostics.files_parsed += 1;
                    used.extend(
                        references
                            .iter()
                            .filter(|r| self.kinds.contains(&r.kind))
                            .filter_map(|r| r.package_name())
                            .map(str::to_string),
                    );
                    tracing::debug!(
                        path = %file.path.display(),
                        references = references.len(),
                        "parsed"
                    );
                }
                Err(err) => {
                    tracing::warn!(path = %file.path.display(), error = %err, "skipping file");
                    diagnostics.failures.push(FileFailure {
                        path: file.path.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        (used, diagnostics)
    }
}

/// Analyze one project root with default settings.
pub fn detect_usage(project_root: &Path) -> AnalysisResult<UsageResult> {
    UsageDetector::new()?.detect(project_root)
}
