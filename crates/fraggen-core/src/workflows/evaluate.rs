use crate::core::io::record::StructureRecord;
use crate::core::models::candidate::{Candidate, UNSET_GENERATION};
use crate::core::models::graph::Graph;
use crate::engine::config::EvaluationConfig;
use crate::engine::error::EngineError;
use crate::engine::population::{Population, RetryCounter};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::provider;
use crate::engine::render::ImageRenderer;
use crate::engine::task::{FitnessTask, TaskContext};
use rayon::prelude::*;
use thiserror::Error;
use tracing::{info, instrument, warn};

pub const VERTEX_COUNT: &str = "VERTEX_COUNT";
pub const EDGE_COUNT: &str = "EDGE_COUNT";
pub const RING_COUNT: &str = "RING_COUNT";
pub const HEAVY_ATOMS: &str = "HEAVY_ATOMS";
pub const FREE_APS: &str = "FREE_APS";

#[derive(Debug, Error)]
#[error("Structure construction failed: {0}")]
pub struct BuildError(pub String);

/// Converts a graph into the structure record handed to the fitness provider.
pub trait StructureBuilder: Send + Sync {
    fn build(&self, graph: &Graph) -> Result<StructureRecord, BuildError>;
}

/// Builds records from the graph alone: the body lists the atoms of every molecular
/// vertex and the properties hold simple graph descriptors ([`VERTEX_COUNT`],
/// [`EDGE_COUNT`], [`RING_COUNT`], [`HEAVY_ATOMS`], [`FREE_APS`]).
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphSummaryBuilder;

impl StructureBuilder for GraphSummaryBuilder {
    fn build(&self, graph: &Graph) -> Result<StructureRecord, BuildError> {
        if graph.vertex_count() == 0 {
            return Err(BuildError(format!("graph {} has no vertices", graph.id())));
        }
        let mut body = Vec::new();
        for vertex in graph.vertices() {
            let Some(substructure) = vertex.substructure() else {
                continue;
            };
            for atom in substructure.atoms() {
                let p = atom.position;
                body.push(format!("{} {:.4} {:.4} {:.4} {}", atom.element, p.x, p.y, p.z, vertex.id()));
            }
        }

        let mut record = StructureRecord::with_body(body.join("\n"));
        let heavy: usize = graph.vertices().map(|v| v.heavy_atom_count()).sum();
        let free: usize = graph.vertices().map(|v| v.free_ap_count()).sum();
        record.set_property(VERTEX_COUNT, graph.vertex_count().to_string());
        record.set_property(EDGE_COUNT, graph.edge_count().to_string());
        record.set_property(RING_COUNT, graph.ring_count().to_string());
        record.set_property(HEAVY_ATOMS, heavy.to_string());
        record.set_property(FREE_APS, free.to_string());
        Ok(record)
    }
}

/// One graph to evaluate.
#[derive(Debug, Clone)]
pub struct CandidateInput {
    pub name: String,
    pub graph: Graph,
    pub uid: String,
    pub smiles: String,
}

#[derive(Debug)]
pub struct TaskFailure {
    pub name: String,
    pub error: EngineError,
}

#[derive(Debug)]
pub struct EvaluationOutcome {
    /// Completed candidates, scored or failed, in submission order.
    pub candidates: Vec<Candidate>,
    /// Tasks that ended with a fatal error.
    pub failures: Vec<TaskFailure>,
    /// Successful candidates in completion order.
    pub population: Vec<Candidate>,
    pub retries: i64,
}

impl EvaluationOutcome {
    pub fn has_fatal_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Evaluates a batch of candidates on the rayon thread pool.
///
/// A graph that cannot be turned into a structure yields a failed candidate without calling
/// the provider. Fatal task errors do not stop the other tasks; they are collected in
/// [`EvaluationOutcome::failures`] for the caller to act on.
#[instrument(skip_all, name = "evaluation_workflow")]
pub fn run(
    inputs: Vec<CandidateInput>,
    builder: &dyn StructureBuilder,
    renderer: Option<&dyn ImageRenderer>,
    config: &EvaluationConfig,
    reporter: &ProgressReporter,
) -> Result<EvaluationOutcome, EngineError> {
    reporter.report(Progress::PhaseStart {
        name: "Preparation",
    });
    std::fs::create_dir_all(&config.work_dir).map_err(|source| EngineError::Io {
        path: config.work_dir.to_string_lossy().to_string(),
        source,
    })?;
    let provider = provider::from_config(&config.provider);
    let population = Population::new();
    let retries = RetryCounter::new(config.initial_retries);
    let ctx = TaskContext {
        work_dir: &config.work_dir,
        provider: provider.as_ref(),
        renderer: renderer.filter(|_| config.make_pictures),
        population: Some(&population),
        retries: &retries,
    };
    info!(
        candidates = inputs.len(),
        provider = provider.name(),
        "Starting fitness evaluation."
    );
    reporter.report(Progress::PhaseFinish);

    reporter.report(Progress::PhaseStart {
        name: "Fitness Evaluation",
    });
    reporter.report(Progress::TaskStart {
        total: inputs.len() as u64,
    });
    let results: Vec<Result<Candidate, TaskFailure>> = inputs
        .into_par_iter()
        .map(|input| {
            let result = evaluate_one(input, builder, &ctx);
            reporter.report(Progress::TaskIncrement { amount: 1 });
            result
        })
        .collect();
    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    let mut candidates = Vec::new();
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(candidate) => candidates.push(candidate),
            Err(failure) => failures.push(failure),
        }
    }
    if !failures.is_empty() {
        warn!(count = failures.len(), "Some fitness tasks failed fatally.");
    }
    info!(
        scored = population.len(),
        completed = candidates.len(),
        "Fitness evaluation complete."
    );

    Ok(EvaluationOutcome {
        candidates,
        failures,
        population: population.drain(),
        retries: retries.value(),
    })
}

fn evaluate_one(
    input: CandidateInput,
    builder: &dyn StructureBuilder,
    ctx: &TaskContext<'_>,
) -> Result<Candidate, TaskFailure> {
    let structure = match builder.build(&input.graph) {
        Ok(structure) => structure,
        Err(e) => {
            warn!(candidate = %input.name, error = %e, "Skipping fitness evaluation.");
            let mut candidate = Candidate::new(input.name, input.graph);
            candidate.uid = input.uid;
            candidate.smiles = input.smiles;
            candidate.set_error(e.to_string());
            return Ok(candidate);
        }
    };
    let generation = input.graph.level().unwrap_or(UNSET_GENERATION);
    let mut task = FitnessTask::new(input.name, input.graph, input.uid, input.smiles, structure)
        .with_generation(generation);
    task.run(ctx).map_err(|error| TaskFailure {
        name: task.name().to_string(),
        error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fragspace::FragmentSpace;
    use crate::core::models::edge::ApRef;
    use crate::core::models::ids::IdGenerator;
    use crate::core::models::vertex::BuildingBlockType;
    use crate::engine::config::{EvaluationConfigBuilder, ProviderConfig};
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    const LIBRARY: &str = r#"
[compatibility]
"amide:0" = ["amide:1"]

[[scaffolds]]
name = "core"
atoms = [{ element = "C" }, { element = "N", position = [1.4, 0.0, 0.0] }, { element = "H" }]
bonds = [[0, 1], [0, 2]]
attachment-points = [
    { atom = 0, class = "amide:0" },
    { atom = 1, class = "amide:0" },
]

[[fragments]]
name = "methyl"
atoms = [{ element = "C" }]
attachment-points = [{ atom = 0, class = "amide:1" }]
"#;

    fn inputs(count: usize) -> Vec<CandidateInput> {
        let space = FragmentSpace::from_toml_str(LIBRARY, "test").unwrap();
        let ids = IdGenerator::new();
        (0..count)
            .map(|i| {
                let mut graph = Graph::new(ids.next_graph_id());
                let root = graph
                    .add_vertex(
                        space
                            .vertex_from_library(BuildingBlockType::Scaffold, 0, ids.next_vertex_id())
                            .unwrap(),
                    )
                    .unwrap();
                for ap in 0..(i % 3) {
                    graph
                        .append_from_library(
                            ApRef::new(root, ap),
                            BuildingBlockType::Fragment,
                            0,
                            0,
                            &space,
                            &ids,
                        )
                        .unwrap();
                }
                CandidateInput {
                    name: format!("M{i:04}"),
                    graph,
                    uid: format!("uid-{i}"),
                    smiles: "C".into(),
                }
            })
            .collect()
    }

    fn config(dir: &TempDir, weights: &[(&str, f64)]) -> EvaluationConfig {
        EvaluationConfigBuilder::new()
            .work_dir(dir.path().join("run"))
            .provider(ProviderConfig::Formula {
                constant: 0.0,
                weights: weights.iter().map(|(k, w)| (k.to_string(), *w)).collect::<BTreeMap<_, _>>(),
            })
            .build()
            .unwrap()
    }

    #[test]
    fn graph_summary_builder_writes_descriptors() {
        let input = inputs(2).pop().unwrap();
        let record = GraphSummaryBuilder.build(&input.graph).unwrap();
        assert_eq!(record.property(VERTEX_COUNT), Some("2"));
        assert_eq!(record.property(EDGE_COUNT), Some("1"));
        assert_eq!(record.property(RING_COUNT), Some("0"));
        assert_eq!(record.property(HEAVY_ATOMS), Some("3"));
        assert_eq!(record.property(FREE_APS), Some("1"));
        assert_eq!(record.body().lines().count(), 4);
        assert!(record.body().starts_with("C 0.0000 0.0000 0.0000"));
    }

    #[test]
    fn empty_graph_cannot_be_built() {
        let graph = Graph::new(IdGenerator::new().next_graph_id());
        assert!(GraphSummaryBuilder.build(&graph).is_err());
    }

    #[test]
    fn evaluates_batch_and_keeps_submission_order() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir, &[(HEAVY_ATOMS, 1.0), (EDGE_COUNT, 10.0)]);
        let events = Mutex::new(0u64);
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::TaskIncrement { amount } = event {
                *events.lock().unwrap() += amount;
            }
        }));

        let outcome = run(inputs(12), &GraphSummaryBuilder, None, &config, &reporter).unwrap();
        drop(reporter);

        assert!(!outcome.has_fatal_failures());
        assert_eq!(outcome.candidates.len(), 12);
        assert_eq!(outcome.population.len(), 12);
        assert_eq!(outcome.retries, -12);
        assert_eq!(events.into_inner().unwrap(), 12);

        let names: Vec<&str> = outcome.candidates.iter().map(|c| c.name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);

        // M0000: scaffold only (2 heavy atoms, no edges); M0001: one methyl; M0002: two.
        assert_eq!(outcome.candidates[0].fitness(), Some(2.0));
        assert_eq!(outcome.candidates[1].fitness(), Some(13.0));
        assert_eq!(outcome.candidates[2].fitness(), Some(24.0));
        assert!(config.work_dir.join("M0001_FIT.txt").exists());
    }

    #[test]
    fn chemistry_failures_are_counted_not_fatal() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir, &[("LOGP", 1.0)]);
        let outcome =
            run(inputs(3), &GraphSummaryBuilder, None, &config, &ProgressReporter::new()).unwrap();
        assert!(outcome.failures.is_empty());
        assert!(outcome.population.is_empty());
        assert_eq!(outcome.retries, 3);
        assert!(outcome
            .candidates
            .iter()
            .all(|c| c.error() == Some("Missing descriptor 'LOGP'")));
    }

    #[test]
    fn builder_failure_skips_provider() {
        struct NoBuilder;
        impl StructureBuilder for NoBuilder {
            fn build(&self, _: &Graph) -> Result<StructureRecord, BuildError> {
                Err(BuildError("no 3D model".into()))
            }
        }

        let dir = TempDir::new().unwrap();
        let config = config(&dir, &[]);
        let outcome = run(inputs(1), &NoBuilder, None, &config, &ProgressReporter::new()).unwrap();
        assert_eq!(
            outcome.candidates[0].error(),
            Some("Structure construction failed: no 3D model")
        );
        assert!(!config.work_dir.join("M0000_I.txt").exists());
    }

    #[test]
    fn fatal_task_errors_are_collected() {
        struct NanBuilder;
        impl StructureBuilder for NanBuilder {
            fn build(&self, graph: &Graph) -> Result<StructureRecord, BuildError> {
                let mut record = GraphSummaryBuilder.build(graph)?;
                record.set_property("SCORE", "NaN");
                Ok(record)
            }
        }

        let dir = TempDir::new().unwrap();
        let config = config(&dir, &[("SCORE", 1.0)]);
        let outcome = run(inputs(2), &NanBuilder, None, &config, &ProgressReporter::new()).unwrap();
        assert!(outcome.has_fatal_failures());
        assert_eq!(outcome.failures.len(), 2);
        assert!(matches!(outcome.failures[0].error, EngineError::NanFitness { .. }));
        assert!(outcome.candidates.is_empty());
    }
}
