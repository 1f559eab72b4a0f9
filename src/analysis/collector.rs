//! Source file enumeration.
//!
//! Walks a project root for `.js`, `.jsx`, `.ts` and `.tsx` files, skipping
//! build and dependency output directories at any depth.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use super::imports::SourceLanguage;

/// Directories that are never scanned, wherever they appear.
pub const EXCLUDED_DIRS: [&str; 3] = ["node_modules", "dist", "build"];

/// A discovered source file and its dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub language: SourceLanguage,
}

impl SourceFile {
    /// Whether the file uses the type-annotation dialect.
    pub fn is_typed(&self) -> bool {
        self.language.is_typed()
    }
}

/// Enumerates candidate source files under a project root.
#[derive(Debug, Clone)]
pub struct FileCollector {
    excluded_dirs: BTreeSet<String>,
}

impl Default for FileCollector {
    fn default() -> Self {
        Self {
            excluded_dirs: EXCLUDED_DIRS.iter().map(|d| d.to_string()).collect(),
        }
    }
}

impl FileCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds directory names to skip on top of [`EXCLUDED_DIRS`].
    pub fn with_excluded_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_dirs.extend(dirs.into_iter().map(Into::into));
        self
    }

    /// Collect every source file under `root`.
    ///
    /// Symbolic links are followed; entries that cannot be read (including
    /// link cycles) are skipped. Hidden files and directories are not
    /// scanned. Output is sorted by path.
    pub fn collect(&self, root: &Path) -> Vec<SourceFile> {
        let mut files = Vec::new();

        let walker = WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.is_skipped(e));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!(error = %err, "skipping unreadable entry");
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            if let Some(language) = SourceLanguage::from_path(entry.path()) {
                files.push(SourceFile {
                    path: entry.into_path(),
                    language,
                });
            }
        }

        files
    }

    /// Check if an entry (and everything below it) should be skipped.
    fn is_skipped(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') {
            return true;
        }
        entry.file_type().is_dir() && self.excluded_dirs.contains(name.as_ref())
    }
}

/// Collect source files under `root` with the default exclusions.
pub fn collect_files(root: &Path) -> Vec<SourceFile> {
    FileCollector::new().collect(root)
}
