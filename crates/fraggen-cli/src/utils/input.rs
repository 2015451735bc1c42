use crate::error::{CliError, Result};
use std::path::Path;

/// One graph line from a candidate list file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphLine {
    pub line_number: usize,
    pub name: Option<String>,
    pub graph: String,
}

/// Reads `[name] <graph>` lines. Blank lines and `#` comments are skipped.
pub fn read_graph_lines(path: &Path) -> Result<Vec<GraphLine>> {
    let content = std::fs::read_to_string(path)?;
    parse_graph_lines(&content).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e,
    })
}

fn parse_graph_lines(content: &str) -> anyhow::Result<Vec<GraphLine>> {
    let mut lines = Vec::new();
    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        let (name, graph) = match fields.as_slice() {
            [graph] => (None, *graph),
            [name, graph] => (Some(name.to_string()), *graph),
            _ => anyhow::bail!(
                "line {}: expected '[name] <graph>', found {} fields",
                idx + 1,
                fields.len()
            ),
        };
        lines.push(GraphLine {
            line_number: idx + 1,
            name,
            graph: graph.to_string(),
        });
    }
    Ok(lines)
}

/// Name used for an unnamed line at `position` in the list.
pub fn default_name(position: usize) -> String {
    format!("M{:06}", position)
}
