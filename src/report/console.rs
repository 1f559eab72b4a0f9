//! Colored terminal output.

use std::io::{self, Write};
use std::path::Path;

use colored::Colorize;

use super::{AnalyzeOutput, Exporter, HistoryOutput, ProjectEntry, Report, UnusedOutput};
use crate::analysis::ScanDiagnostics;
use crate::registry::Suggestions;

/// Human-readable exporter. `verbose` adds per-project file statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleExporter {
    pub verbose: bool,
}

impl ConsoleExporter {
    /// Write the warning line for a failed entry. Returns the payload otherwise.
    fn payload<'a, T, W: Write>(
        &self,
        entry: &'a ProjectEntry<T>,
        writer: &mut W,
    ) -> io::Result<Option<&'a T>> {
        match &entry.outcome {
            Ok(payload) => Ok(Some(payload)),
            Err(error) => {
                let line = format!("[warn] {}: {}", entry.path().display(), error);
                writeln!(writer, "{}", line.yellow())?;
                Ok(None)
            }
        }
    }

    fn diagnostics<W: Write>(
        &self,
        diagnostics: Option<&ScanDiagnostics>,
        writer: &mut W,
    ) -> io::Result<()> {
        let Some(d) = diagnostics.filter(|_| self.verbose) else {
            return Ok(());
        };

        let summary = format!(
            "files: {} scanned, {} parsed, {} failed",
            d.files_scanned,
            d.files_parsed,
            d.failures.len()
        );
        writeln!(writer, "{}", summary.dimmed())?;
        for failure in &d.failures {
            let line = format!("  skipped {}: {}", failure.path.display(), failure.reason);
            writeln!(writer, "{}", line.dimmed())?;
        }
        Ok(())
    }
}

fn heading<W: Write>(path: &Path, writer: &mut W) -> io::Result<()> {
    writeln!(writer, "{}", path.display().to_string().bold())
}

impl Exporter<AnalyzeOutput> for ConsoleExporter {
    fn export<W: Write>(&self, report: &Report<AnalyzeOutput>, writer: &mut W) -> io::Result<()> {
        for entry in &report.entries {
            let Some(output) = self.payload(entry, writer)? else {
                continue;
            };
            let usage = &output.usage;

            heading(entry.path(), writer)?;
            writeln!(
                writer,
                "{}: {}, {}: {}",
                "used".green(),
                usage.used.len(),
                "unused".red(),
                usage.unused.len()
            )?;
            if !usage.used.is_empty() {
                writeln!(writer, "{}", usage.used.join(", ").green())?;
            }
            if !usage.unused.is_empty() {
                writeln!(writer, "{}", usage.unused.join(", ").red())?;
            }
            if !usage.dev_unused.is_empty() {
                let line = format!("dev-unused: {}", usage.dev_unused.join(", "));
                writeln!(writer, "{}", line.yellow())?;
            }
            self.diagnostics(output.diagnostics.as_ref(), writer)?;
            writeln!(writer)?;
        }
        Ok(())
    }
}

impl Exporter<UnusedOutput> for ConsoleExporter {
    fn export<W: Write>(&self, report: &Report<UnusedOutput>, writer: &mut W) -> io::Result<()> {
        for entry in &report.entries {
            let Some(output) = self.payload(entry, writer)? else {
                continue;
            };

            if output.is_clean() {
                let line = format!("{}: no unused dependencies", entry.path().display());
                writeln!(writer, "{}", line.green())?;
            } else {
                heading(entry.path(), writer)?;
                if !output.unused.is_empty() {
                    writeln!(writer, "{}", output.unused.join(", ").red())?;
                }
                if !output.dev_unused.is_empty() {
                    let line = format!("dev: {}", output.dev_unused.join(", "));
                    writeln!(writer, "{}", line.yellow())?;
                }
            }
            self.diagnostics(output.diagnostics.as_ref(), writer)?;
        }
        Ok(())
    }
}

impl Exporter<Suggestions> for ConsoleExporter {
    fn export<W: Write>(&self, report: &Report<Suggestions>, writer: &mut W) -> io::Result<()> {
        for entry in &report.entries {
            let Some(s) = self.payload(entry, writer)? else {
                continue;
            };

            heading(entry.path(), writer)?;
            if !s.outdated.is_empty() {
                writeln!(writer, "{}", "outdated".yellow())?;
                for o in &s.outdated {
                    writeln!(writer, "{} {} -> {}", o.name, o.current, o.latest)?;
                }
            }
            if !s.deprecated.is_empty() {
                writeln!(writer, "{}", "deprecated".red())?;
                for d in &s.deprecated {
                    writeln!(writer, "{} {}", d.name, d.version)?;
                }
            }
            if s.is_up_to_date() {
                writeln!(writer, "{}", "all up to date".green())?;
            }
            if !s.failed.is_empty() {
                writeln!(writer, "{}", "unchecked".dimmed())?;
                for f in &s.failed {
                    writeln!(writer, "{}", format!("{} ({})", f.name, f.reason).dimmed())?;
                }
            }
            if self.verbose {
                writeln!(writer, "{}", format!("checked: {}", s.checked).dimmed())?;
            }
        }
        Ok(())
    }
}

impl Exporter<HistoryOutput> for ConsoleExporter {
    fn export<W: Write>(&self, report: &Report<HistoryOutput>, writer: &mut W) -> io::Result<()> {
        for entry in &report.entries {
            let Some(history) = self.payload(entry, writer)? else {
                continue;
            };

            heading(entry.path(), writer)?;
            if history.scans.is_empty() {
                writeln!(writer, "{}", "no recorded scans".dimmed())?;
                continue;
            }
            for scan in &history.scans {
                writeln!(
                    writer,
                    "{}  {}: {}, {}: {}, {}: {}",
                    scan.timestamp(),
                    "used".green(),
                    scan.used,
                    "unused".red(),
                    scan.unused,
                    "dev-unused".yellow(),
                    scan.dev_unused
                )?;
            }
        }
        Ok(())
    }
}
