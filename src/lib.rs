//! pua - package usage analytics for JavaScript and TypeScript projects
//!
//! This crate finds declared npm dependencies that no source file
//! references, flags outdated and deprecated ones via the npm registry,
//! and keeps an optional SQLite audit log of past scans.

pub mod analysis;
pub mod config;
pub mod logging;
pub mod parser;
pub mod registry;
pub mod report;
pub mod store;
pub mod workspace;
