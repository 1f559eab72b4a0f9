//! JSON export implementation.
//!
//! Writes the `{"results": [...]}` envelope. Each entry carries
//! `projectPath` and either the payload fields or `error`.

use super::{Exporter, ProjectEntry, Report};
use serde::Serialize;
use std::io::{self, Write};

/// JSON exporter implementation.
pub struct JsonExporter;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonEntry<'a, T> {
    project_path: String,
    #[serde(flatten)]
    payload: Option<&'a T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

impl<'a, T> From<&'a ProjectEntry<T>> for JsonEntry<'a, T> {
    fn from(entry: &'a ProjectEntry<T>) -> Self {
        let (payload, error) = match &entry.outcome {
            Ok(payload) => (Some(payload), None),
            Err(error) => (None, Some(error.as_str())),
        };

        Self {
            project_path: entry.project_path.display().to_string(),
            payload,
            error,
        }
    }
}

#[derive(Serialize)]
struct JsonEnvelope<'a, T> {
    results: Vec<JsonEntry<'a, T>>,
}

impl<T: Serialize> Exporter<T> for JsonExporter {
    fn export<W: Write>(&self, report: &Report<T>, writer: &mut W) -> io::Result<()> {
        let envelope = JsonEnvelope {
            results: report.entries.iter().map(JsonEntry::from).collect(),
        };

        serde_json::to_writer_pretty(&mut *writer, &envelope)?;
        writeln!(writer)?;
        Ok(())
    }
}
