//! Report rendering for batch results.
//!
//! Every command produces one entry per project. An entry holds either the
//! command's payload or the error that stopped that project, so one broken
//! workspace never hides the others.

pub mod console;
pub mod json;

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::analysis::{ScanDiagnostics, UsageResult};
use crate::store::ScanSummary;

pub use console::ConsoleExporter;
pub use json::JsonExporter;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Colored, human-readable text
    Human,
    /// `{"results": [...]}` envelope, machine-readable
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Result for one project of a batch.
#[derive(Debug, Clone)]
pub struct ProjectEntry<T> {
    pub project_path: PathBuf,
    pub outcome: Result<T, String>,
}

impl<T> ProjectEntry<T> {
    pub fn ok(project_path: impl Into<PathBuf>, payload: T) -> Self {
        Self {
            project_path: project_path.into(),
            outcome: Ok(payload),
        }
    }

    pub fn failed(project_path: impl Into<PathBuf>, error: impl ToString) -> Self {
        Self {
            project_path: project_path.into(),
            outcome: Err(error.to_string()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.project_path
    }

    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Ordered entries of one command run.
#[derive(Debug, Clone)]
pub struct Report<T> {
    pub entries: Vec<ProjectEntry<T>>,
}

impl<T> Default for Report<T> {
    fn default() -> Self {
        Self { entries: vec![] }
    }
}

impl<T> Report<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ProjectEntry<T>) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn failures(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_ok()).count()
    }
}

/// `analyze` payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeOutput {
    #[serde(flatten)]
    pub usage: UsageResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<ScanDiagnostics>,
}

impl AnalyzeOutput {
    pub fn new(usage: UsageResult, verbose: bool) -> Self {
        let diagnostics = verbose.then(|| usage.diagnostics.clone());
        Self { usage, diagnostics }
    }
}

/// `unused` payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnusedOutput {
    pub unused: Vec<String>,
    pub dev_unused: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<ScanDiagnostics>,
}

impl UnusedOutput {
    pub fn new(usage: UsageResult, verbose: bool) -> Self {
        Self {
            diagnostics: verbose.then_some(usage.diagnostics),
            unused: usage.unused,
            dev_unused: usage.dev_unused,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.unused.is_empty() && self.dev_unused.is_empty()
    }
}

/// `history` payload.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryOutput {
    pub scans: Vec<ScanSummary>,
}

/// Trait for exporters.
pub trait Exporter<T> {
    /// Export the report to the given writer.
    fn export<W: Write>(&self, report: &Report<T>, writer: &mut W) -> io::Result<()>;
}

/// Write `report` in `format`.
pub fn render<T, W>(
    format: OutputFormat,
    verbose: bool,
    report: &Report<T>,
    writer: &mut W,
) -> io::Result<()>
where
    T: Serialize,
    ConsoleExporter: Exporter<T>,
    W: Write,
{
    match format {
        OutputFormat::Json => JsonExporter.export(report, writer),
        OutputFormat::Human => ConsoleExporter { verbose }.export(report, writer),
    }
}

/// Render a report to a string.
pub fn render_to_string<T>(
    format: OutputFormat,
    verbose: bool,
    report: &Report<T>,
) -> io::Result<String>
where
    T: Serialize,
    ConsoleExporter: Exporter<T>,
{
    let mut buffer = Vec::new();
    render(format, verbose, report, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
