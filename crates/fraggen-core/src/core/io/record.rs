use super::tags::STRUCTURE_MARKER;
use super::traits::StructureFile;
use std::io::{self, BufRead, Write};
use thiserror::Error;

/// A structure file in memory: ordered string properties plus an opaque structure body.
///
/// On disk the properties come first, one `KEY = VALUE` per line, followed by an optional
/// `@STRUCTURE` line and the body. Blank lines and lines starting with `#` in the property
/// block are ignored. Values are single-line; line breaks are written as spaces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructureRecord {
    properties: Vec<(String, String)>,
    body: String,
}

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {reason}")]
    Parse { line: usize, reason: String },
}

impl StructureRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(body: impl Into<String>) -> Self {
        Self {
            properties: Vec::new(),
            body: body.into(),
        }
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.property(key).is_some()
    }

    /// Sets a property, replacing an existing value in place.
    pub fn set_property(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into().replace(['\r', '\n'], " ");
        match self.properties.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.properties.push((key.to_string(), value)),
        }
    }

    pub fn remove_property(&mut self, key: &str) -> Option<String> {
        let index = self.properties.iter().position(|(k, _)| k == key)?;
        Some(self.properties.remove(index).1)
    }

    pub fn properties(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn set_body(&mut self, body: impl Into<String>) {
        self.body = body.into();
    }

    /// A record with neither properties nor body carries no information.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.body.trim().is_empty()
    }
}

/// Reader and writer for [`StructureRecord`] files.
pub struct RecordFile;

impl StructureFile for RecordFile {
    type Record = StructureRecord;
    type Error = RecordError;

    fn read_from(reader: &mut impl BufRead) -> Result<StructureRecord, RecordError> {
        let mut record = StructureRecord::new();
        let mut in_body = false;
        let mut body_lines: Vec<String> = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if in_body {
                body_lines.push(line);
                continue;
            }
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if trimmed == STRUCTURE_MARKER {
                in_body = true;
                continue;
            }
            let (key, value) = trimmed.split_once('=').ok_or_else(|| RecordError::Parse {
                line: index + 1,
                reason: format!("expected 'KEY = VALUE', found '{trimmed}'"),
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(RecordError::Parse {
                    line: index + 1,
                    reason: "empty property key".to_string(),
                });
            }
            record.set_property(key, value.trim());
        }

        record.body = body_lines.join("\n");
        Ok(record)
    }

    fn write_to(record: &StructureRecord, writer: &mut impl Write) -> Result<(), RecordError> {
        for (key, value) in record.properties() {
            writeln!(writer, "{key} = {value}")?;
        }
        if !record.body.is_empty() {
            writeln!(writer, "{STRUCTURE_MARKER}")?;
            writeln!(writer, "{}", record.body)?;
        }
        Ok(())
    }
}
