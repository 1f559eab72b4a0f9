//! Monorepo workspace discovery.
//!
//! Expands the `workspaces` globs of a root package.json into the list of
//! project roots to analyze.

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use indexmap::IndexSet;
use thiserror::Error;
use walkdir::WalkDir;

use crate::parser::{has_manifest, load_manifest, ParseError, MANIFEST_FILE};

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("Failed to read root manifest: {0}")]
    Manifest(#[from] ParseError),

    #[error("Invalid workspace pattern: {0}")]
    Pattern(#[from] globset::Error),
}

pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

/// Compiled workspace globs, matched against manifest paths relative to the root.
#[derive(Debug)]
pub struct WorkspaceMatcher {
    include: GlobSet,
    exclude: GlobSet,
}

impl WorkspaceMatcher {
    /// Compile workspace patterns. Patterns starting with `!` exclude.
    pub fn new<I, S>(patterns: I) -> WorkspaceResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut include = GlobSetBuilder::new();
        let mut exclude = GlobSetBuilder::new();

        for raw in patterns {
            let raw = raw.as_ref().trim();
            let (negated, pattern) = match raw.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, raw),
            };

            let pattern = pattern.trim_start_matches("./").trim_end_matches('/');
            if pattern.is_empty() || pattern == "." {
                // The root is always part of the result.
                continue;
            }

            let glob = GlobBuilder::new(&format!("{}/{}", pattern, MANIFEST_FILE))
                .literal_separator(true)
                .build()?;
            if negated {
                exclude.add(glob);
            } else {
                include.add(glob);
            }
        }

        Ok(Self {
            include: include.build()?,
            exclude: exclude.build()?,
        })
    }

    /// Whether a root-relative manifest path (with `/` separators) belongs to a workspace.
    pub fn is_match(&self, relative_manifest: &str) -> bool {
        self.include.is_match(relative_manifest) && !self.exclude.is_match(relative_manifest)
    }
}

/// Resolve the project roots to analyze under `root`.
///
/// - No manifest at `root`: just `root`.
/// - Manifest without workspaces: just `root`.
/// - Otherwise `root` first, then every directory whose package.json
///   matches a workspace glob, sorted and without duplicates.
pub fn resolve_projects(root: &Path) -> WorkspaceResult<Vec<PathBuf>> {
    if !has_manifest(root) {
        return Ok(vec![root.to_path_buf()]);
    }

    let pkg = load_manifest(root)?;
    let Some(patterns) = pkg.workspace_patterns() else {
        return Ok(vec![root.to_path_buf()]);
    };

    let matcher = WorkspaceMatcher::new(patterns)?;
    let mut matches = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            !name.starts_with('.') && name != "node_modules"
        });

    for entry in walker.filter_map(|e| e.ok()) {
        if entry.depth() == 0
            || !entry.file_type().is_file()
            || entry.file_name() != MANIFEST_FILE
        {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let relative = relative.to_string_lossy().replace('\\', "/");
        if !matcher.is_match(&relative) {
            continue;
        }

        if let Some(dir) = entry.path().parent() {
            matches.push(dir.to_path_buf());
        }
    }
    matches.sort();

    let mut projects = IndexSet::new();
    projects.insert(root.to_path_buf());
    projects.extend(matches);

    tracing::debug!(
        root = %root.display(),
        projects = projects.len(),
        "resolved workspace projects"
    );
    Ok(projects.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_no_manifest_returns_root() {
        let dir = TempDir::new().unwrap();
        let projects = resolve_projects(dir.path()).unwrap();
        assert_eq!(projects, vec![dir.path().to_path_buf()]);
    }

    #[test]
    fn test_no_workspaces_returns_root() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "package.json", r#"{"name": "single"}"#);
        write(dir.path(), "packages/a/package.json", "{}");

        let projects = resolve_projects(dir.path()).unwrap();
        assert_eq!(projects, vec![dir.path().to_path_buf()]);
    }

    #[test]
    fn test_string_workspaces_returns_root() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "package.json",
            r#"{"name": "mono", "version": 2, "workspaces": "packages/*"}"#,
        );
        write(dir.path(), "packages/a/package.json", "{}");

        let projects = resolve_projects(dir.path()).unwrap();
        assert_eq!(projects, vec![dir.path().to_path_buf()]);
    }

    #[test]
    fn test_workspace_list() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "package.json", r#"{"workspaces": ["packages/*"]}"#);
        write(dir.path(), "packages/b/package.json", "{}");
        write(dir.path(), "packages/a/package.json", "{}");
        write(dir.path(), "packages/no-manifest/index.js", "");
        write(dir.path(), "packages/a/nested/deep/package.json", "{}");
        write(dir.path(), "packages/a/node_modules/dep/package.json", "{}");

        let projects = resolve_projects(dir.path()).unwrap();
        assert_eq!(
            projects,
            vec![
                dir.path().to_path_buf(),
                dir.path().join("packages/a"),
                dir.path().join("packages/b"),
            ]
        );
    }

    #[test]
    fn test_workspace_object_form_and_negation() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "package.json",
            r#"{"workspaces": {"packages": ["./apps/*", "libs/**", "!libs/legacy", "."]}}"#,
        );
        write(dir.path(), "apps/web/package.json", "{}");
        write(dir.path(), "libs/ui/package.json", "{}");
        write(dir.path(), "libs/ui/icons/package.json", "{}");
        write(dir.path(), "libs/legacy/package.json", "{}");

        let projects = resolve_projects(dir.path()).unwrap();
        assert_eq!(
            projects,
            vec![
                dir.path().to_path_buf(),
                dir.path().join("apps/web"),
                dir.path().join("libs/ui"),
                dir.path().join("libs/ui/icons"),
            ]
        );
    }

    #[test]
    fn test_malformed_root_manifest() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "package.json", "{");

        let err = resolve_projects(dir.path()).unwrap_err();
        assert!(matches!(err, WorkspaceError::Manifest(_)));
    }

    #[test]
    fn test_matcher_star_does_not_cross_directories() {
        let matcher = WorkspaceMatcher::new(["packages/*"]).unwrap();
        assert!(matcher.is_match("packages/a/package.json"));
        assert!(!matcher.is_match("packages/a/b/package.json"));
        assert!(!matcher.is_match("other/a/package.json"));
    }
}
