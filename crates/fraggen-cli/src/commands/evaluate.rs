use crate::cli::EvaluateArgs;
use crate::config::builder::build_config;
use crate::error::{CliError, Result};
use crate::utils::input::{default_name, read_graph_lines};
use crate::utils::progress::CliProgressHandler;
use fraggen::{
    core::{
        fragspace::FragmentSpace,
        io::{graph_string, report},
        models::{candidate::UNDEFINED, ids::IdGenerator},
    },
    engine::progress::ProgressReporter,
    workflows::evaluate::{self, CandidateInput, GraphSummaryBuilder},
};
use std::collections::HashSet;
use std::path::Path;
use tracing::{error, info, warn};

pub fn run(args: EvaluateArgs) -> Result<()> {
    info!("Building configuration from file and CLI arguments...");
    let config = build_config(&args)?;

    let space = FragmentSpace::load(&config.library_path)?;
    let inputs = load_inputs(&config.input_path, &space)?;
    if inputs.is_empty() {
        warn!("Input file {:?} contains no graphs.", &config.input_path);
        println!("Warning: no graphs to evaluate.");
        return Ok(());
    }

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Evaluating {} candidate(s)...", inputs.len());
    info!("Invoking the core evaluation workflow...");
    let outcome = evaluate::run(
        inputs,
        &GraphSummaryBuilder,
        None,
        &config.core_config,
        &reporter,
    )?;

    let mut candidates = outcome.candidates;
    candidates.sort_by(|a, b| b.cmp(a));
    report::write_report(&candidates, &config.report_path)?;

    let scored = candidates.iter().filter(|c| c.has_fitness()).count();
    println!(
        "Workflow complete: {} scored, {} failed, {} fatal. Retry counter: {}.",
        scored,
        candidates.len() - scored,
        outcome.failures.len(),
        outcome.retries
    );
    if let Some(best) = candidates.first().filter(|c| c.has_fitness()) {
        println!("✓ Best candidate: {}", best);
    }
    println!("Report written to: {}", config.report_path.display());

    for failure in &outcome.failures {
        error!("Task '{}' failed: {}", failure.name, failure.error);
    }
    match outcome.failures.into_iter().next() {
        Some(first) => Err(first.error.into()),
        None => Ok(()),
    }
}

fn load_inputs(path: &Path, space: &FragmentSpace) -> Result<Vec<CandidateInput>> {
    info!("Loading candidate graphs from {:?}", path);
    let ids = IdGenerator::new();
    let mut seen = HashSet::new();
    let mut inputs = Vec::new();
    for (position, line) in read_graph_lines(path)?.into_iter().enumerate() {
        let graph = graph_string::decode(&line.graph, space, &ids).map_err(|e| {
            CliError::FileParsing {
                path: path.to_path_buf(),
                source: anyhow::anyhow!("line {}: {}", line.line_number, e),
            }
        })?;
        let name = line.name.unwrap_or_else(|| default_name(position + 1));
        if !seen.insert(name.clone()) {
            return Err(CliError::Argument(format!(
                "duplicate candidate name '{}' on line {}",
                name, line.line_number
            )));
        }
        inputs.push(CandidateInput {
            uid: name.clone(),
            name,
            graph,
            smiles: UNDEFINED.to_string(),
        });
    }
    Ok(inputs)
}
