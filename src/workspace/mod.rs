//! Workspace (monorepo) support.
//!
//! A root package.json may declare `workspaces` globs, either as a list or
//! nested under a `packages` key. Each matching directory with its own
//! package.json is analyzed as an independent project.

pub mod resolver;

pub use resolver::{resolve_projects, WorkspaceError, WorkspaceMatcher, WorkspaceResult};
