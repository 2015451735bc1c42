use crate::cli::InspectArgs;
use crate::error::{CliError, Result};
use crate::utils::input::{default_name, read_graph_lines};
use fraggen::core::{fragspace::FragmentSpace, io::graph_string, models::ids::IdGenerator};
use tracing::{info, warn};

/// Result of checking a single input line.
#[derive(Debug)]
enum LineReport {
    Valid { encoded: String, vertices: usize },
    Invalid(String),
}

pub fn run(args: InspectArgs) -> Result<()> {
    let space = FragmentSpace::load(&args.library)?;
    let lines = read_graph_lines(&args.input)?;
    let ids = IdGenerator::new();

    let mut invalid = 0usize;
    for (position, line) in lines.iter().enumerate() {
        let name = line
            .name
            .clone()
            .unwrap_or_else(|| default_name(position + 1));
        match check_line(&line.graph, &space, &ids) {
            LineReport::Valid { encoded, vertices } => {
                info!(line = line.line_number, %name, vertices, "Graph is valid.");
                if args.echo {
                    println!("{} {}", name, encoded);
                }
            }
            LineReport::Invalid(reason) => {
                invalid += 1;
                warn!(line = line.line_number, %name, "{}", reason);
                eprintln!("line {} ({}): {}", line.line_number, name, reason);
            }
        }
    }

    println!(
        "Inspected {} graph(s): {} valid, {} invalid.",
        lines.len(),
        lines.len() - invalid,
        invalid
    );
    if args.strict && invalid > 0 {
        return Err(CliError::Validation(format!(
            "{} of {} graph(s) in {} are invalid",
            invalid,
            lines.len(),
            args.input.display()
        )));
    }
    Ok(())
}

fn check_line(text: &str, space: &FragmentSpace, ids: &IdGenerator) -> LineReport {
    let graph = match graph_string::decode(text, space, ids) {
        Ok(graph) => graph,
        Err(e) => return LineReport::Invalid(format!("cannot decode: {}", e)),
    };
    if let Err(e) = graph.validate() {
        return LineReport::Invalid(format!("inconsistent graph: {}", e));
    }
    LineReport::Valid {
        encoded: graph_string::encode(&graph),
        vertices: graph.vertex_count(),
    }
}
