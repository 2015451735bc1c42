//! CSV summary of an evaluated population.

use crate::core::models::candidate::Candidate;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("CSV writing error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
}

#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    name: &'a str,
    uid: &'a str,
    fitness: Option<f64>,
    error: Option<&'a str>,
    generation: i32,
    file: Option<String>,
}

impl<'a> From<&'a Candidate> for ReportRow<'a> {
    fn from(candidate: &'a Candidate) -> Self {
        Self {
            name: &candidate.name,
            uid: &candidate.uid,
            fitness: candidate.fitness(),
            error: candidate.error(),
            generation: candidate.generation,
            file: candidate
                .file
                .as_ref()
                .map(|p| p.to_string_lossy().to_string()),
        }
    }
}

/// Writes one row per candidate, in the given order, to any writer.
pub fn write_report_to<'a, W: Write>(
    candidates: impl IntoIterator<Item = &'a Candidate>,
    writer: W,
) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for candidate in candidates {
        csv_writer.serialize(ReportRow::from(candidate))?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_report<'a>(
    candidates: impl IntoIterator<Item = &'a Candidate>,
    path: &Path,
) -> Result<(), ReportError> {
    let to_error = |source: csv::Error| ReportError::Csv {
        path: path.to_string_lossy().to_string(),
        source,
    };
    let file = std::fs::File::create(path).map_err(|e| to_error(e.into()))?;
    write_report_to(candidates, file).map_err(to_error)
}
