use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use path_clean::PathClean;
use serde::Serialize;

use pua::config::Config;
use pua::logging::init_logging;
use pua::registry::{check_project, NpmRegistry, Suggestions};
use pua::report::{
    render, AnalyzeOutput, ConsoleExporter, Exporter, HistoryOutput, OutputFormat, ProjectEntry,
    Report, UnusedOutput,
};
use pua::store::{self, summarize, AuditStore};
use pua::workspace::resolve_projects;

#[derive(Parser)]
#[command(name = "pua")]
#[command(version)]
#[command(about = "Package usage analytics: find unused, outdated and deprecated npm dependencies", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct CommonArgs {
    /// Project root (defaults to the current directory)
    project_path: Option<PathBuf>,

    /// Print the JSON envelope instead of colored text
    #[arg(long)]
    json: bool,

    /// Log progress to stderr and include file statistics in the report
    #[arg(long)]
    verbose: bool,

    /// Also analyze every workspace declared by the root package.json
    #[arg(long)]
    monorepo: bool,

    /// Extra directory name to skip while collecting sources (repeatable)
    #[arg(long = "ignore-dir", value_name = "NAME")]
    ignore_dir: Vec<String>,

    /// Count dynamic import() and `export ... from` as usage
    #[arg(long)]
    include_dynamic: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Report used, unused and dev-unused dependencies
    Analyze {
        #[command(flatten)]
        common: CommonArgs,

        /// Record the results in the audit log
        #[arg(long)]
        db: bool,

        /// Audit log location (defaults to ./pua.sqlite)
        #[arg(long, value_name = "FILE")]
        db_file: Option<PathBuf>,
    },
    /// Report only unused dependencies
    Unused {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Check declared dependencies against the npm registry
    Suggest {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Show usage counts of previously recorded scans
    History {
        #[command(flatten)]
        common: CommonArgs,

        /// Audit log location (defaults to ./pua.sqlite)
        #[arg(long, value_name = "FILE")]
        db_file: Option<PathBuf>,
    },
}

impl Commands {
    fn common(&self) -> &CommonArgs {
        match self {
            Commands::Analyze { common, .. }
            | Commands::Unused { common }
            | Commands::Suggest { common }
            | Commands::History { common, .. } => common,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.command.common().verbose);

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to read the current directory")?;

    match command {
        Commands::Analyze {
            common,
            db,
            db_file,
        } => {
            let config = build_config(&common, db_file, &cwd);
            let root = resolve_root(common.project_path.as_deref(), &cwd);
            let projects = plan(&root, common.monorepo);
            let mut store = if db { open_store(&config) } else { None };

            let report = analyze(&config, &projects, &mut store, common.verbose)?;
            emit(&common, &report)
        }
        Commands::Unused { common } => {
            let config = build_config(&common, None, &cwd);
            let root = resolve_root(common.project_path.as_deref(), &cwd);
            let projects = plan(&root, common.monorepo);

            let report = analyze(&config, &projects, &mut None, common.verbose)?;
            let report = Report {
                entries: report
                    .entries
                    .into_iter()
                    .map(|entry| ProjectEntry {
                        outcome: entry
                            .outcome
                            .map(|output| UnusedOutput::new(output.usage, common.verbose)),
                        project_path: entry.project_path,
                    })
                    .collect(),
            };
            emit(&common, &report)
        }
        Commands::Suggest { common } => {
            let config = build_config(&common, None, &cwd);
            let root = resolve_root(common.project_path.as_deref(), &cwd);
            let projects = plan(&root, common.monorepo);

            let report = suggest(&config, &projects).await?;
            emit(&common, &report)
        }
        Commands::History { common, db_file } => {
            let config = build_config(&common, db_file, &cwd);
            let root = resolve_root(common.project_path.as_deref(), &cwd);
            let projects = plan(&root, common.monorepo);
            let store = store::open(&config).with_context(|| {
                format!("Failed to open audit log at {}", config.db_path.display())
            })?;

            let report = history(&*store, &projects);
            emit(&common, &report)
        }
    }
}

/// Absolute, lexically normalized project root.
fn resolve_root(path: Option<&Path>, cwd: &Path) -> PathBuf {
    match path {
        None => cwd.to_path_buf(),
        Some(p) if p.is_absolute() => p.to_path_buf(),
        Some(p) => cwd.join(p),
    }
    .clean()
}

fn build_config(common: &CommonArgs, db_file: Option<PathBuf>, cwd: &Path) -> Config {
    let config = Config::from_env()
        .with_ignored_dirs(common.ignore_dir.clone())
        .with_include_dynamic(common.include_dynamic);

    let db_path = db_file.unwrap_or_else(|| config.db_path.clone());
    let db_path = resolve_root(Some(&db_path), cwd);
    config.with_db_path(db_path)
}

/// Project roots to process, root first.
fn plan(root: &Path, monorepo: bool) -> Vec<PathBuf> {
    if !monorepo {
        return vec![root.to_path_buf()];
    }

    match resolve_projects(root) {
        Ok(projects) => projects,
        Err(e) => {
            tracing::warn!(
                root = %root.display(),
                error = %e,
                "workspace resolution failed; analyzing the root only"
            );
            vec![root.to_path_buf()]
        }
    }
}

fn open_store(config: &Config) -> Option<Box<dyn AuditStore>> {
    match store::open(config) {
        Ok(store) => Some(store),
        Err(e) => {
            tracing::warn!(
                db = %config.db_path.display(),
                error = %e,
                "audit log unavailable; results will not be persisted"
            );
            None
        }
    }
}

fn analyze(
    config: &Config,
    projects: &[PathBuf],
    store: &mut Option<Box<dyn AuditStore>>,
    verbose: bool,
) -> Result<Report<AnalyzeOutput>> {
    let mut detector = config
        .usage_detector()
        .context("Failed to initialize source parsers")?;
    let mut report = Report::new();

    for project in projects {
        match detector.detect(project) {
            Ok(usage) => {
                tracing::info!(
                    project = %project.display(),
                    used = usage.used.len(),
                    unused = usage.unused.len(),
                    dev_unused = usage.dev_unused.len(),
                    "analyzed"
                );
                if let Some(store) = store.as_mut() {
                    if let Err(e) = store.persist_scan(project, &usage) {
                        tracing::warn!(
                            project = %project.display(),
                            backend = store.backend(),
                            error = %e,
                            "failed to persist scan"
                        );
                    }
                }
                report.push(ProjectEntry::ok(project, AnalyzeOutput::new(usage, verbose)));
            }
            Err(e) => {
                tracing::warn!(project = %project.display(), error = %e, "analysis failed");
                report.push(ProjectEntry::failed(project, e));
            }
        }
    }

    Ok(report)
}

async fn suggest(config: &Config, projects: &[PathBuf]) -> Result<Report<Suggestions>> {
    let registry = NpmRegistry::new(config).context("Failed to create registry client")?;
    let mut report = Report::new();

    for project in projects {
        match check_project(project, &registry).await {
            Ok(suggestions) => report.push(ProjectEntry::ok(project, suggestions)),
            Err(e) => {
                tracing::warn!(project = %project.display(), error = %e, "registry check failed");
                report.push(ProjectEntry::failed(project, e));
            }
        }
    }

    Ok(report)
}

fn history(store: &dyn AuditStore, projects: &[PathBuf]) -> Report<HistoryOutput> {
    let mut report = Report::new();

    for project in projects {
        let entry = match store.history(project) {
            Ok(rows) => ProjectEntry::ok(
                project,
                HistoryOutput {
                    scans: summarize(&rows),
                },
            ),
            Err(e) => ProjectEntry::failed(project, e),
        };
        report.push(entry);
    }

    report
}

fn emit<T>(common: &CommonArgs, report: &Report<T>) -> Result<()>
where
    T: Serialize,
    ConsoleExporter: Exporter<T>,
{
    let stdout = io::stdout();
    let mut out = stdout.lock();
    render(
        OutputFormat::from_json_flag(common.json),
        common.verbose,
        report,
        &mut out,
    )
    .context("Failed to write report")?;
    out.flush().context("Failed to write report")?;
    Ok(())
}
