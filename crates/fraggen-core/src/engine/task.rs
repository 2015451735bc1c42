//! The fitness task: one candidate graph in, one scored (or failed) candidate out.

use super::error::EngineError;
use super::population::{Population, RetryCounter};
use super::provider::{FitnessProvider, ProviderRequest};
use super::render::ImageRenderer;
use crate::core::io::graph_string;
use crate::core::io::record::{RecordFile, StructureRecord};
use crate::core::io::tags;
use crate::core::io::traits::StructureFile;
use crate::core::models::candidate::{Candidate, UNSET_GENERATION};
use crate::core::models::graph::Graph;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Created,
    Running,
    /// A fitness value was obtained.
    Succeeded,
    /// The candidate carries an error; the task itself completed normally.
    Failed,
    /// The task raised a fatal error.
    Exception,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Exception)
    }
}

/// Collaborators shared by the tasks of one run.
#[derive(Clone, Copy)]
pub struct TaskContext<'a> {
    pub work_dir: &'a Path,
    pub provider: &'a dyn FitnessProvider,
    /// When set, successful candidates get a picture.
    pub renderer: Option<&'a dyn ImageRenderer>,
    /// When set, successful candidates are inserted here.
    pub population: Option<&'a Population>,
    pub retries: &'a RetryCounter,
}

/// Evaluates one candidate through a [`FitnessProvider`].
///
/// Files written to the working directory:
/// - `<name>_I.txt` - input record handed to the provider
/// - `<name>_FIT.txt` - provider output, rewritten with the graph properties on success
/// - `<name>_UnreadableFIT.txt` - backup of an output that could not be read
/// - `<name>.png` - optional picture
pub struct FitnessTask {
    name: String,
    graph: Graph,
    uid: String,
    smiles: String,
    structure: StructureRecord,
    task_uid: String,
    generation: i32,
    state: TaskState,
}

impl FitnessTask {
    /// Creates a task and stamps the candidate's identity onto `structure`.
    pub fn new(
        name: impl Into<String>,
        graph: Graph,
        uid: impl Into<String>,
        smiles: impl Into<String>,
        mut structure: StructureRecord,
    ) -> Self {
        let name = name.into();
        let uid = uid.into();
        let smiles = smiles.into();

        structure.set_property(tags::TITLE, name.as_str());
        structure.set_property(tags::UID, uid.as_str());
        structure.set_property(tags::SMILES, smiles.as_str());
        stamp_graph(&mut structure, &graph);

        Self {
            task_uid: name.clone(),
            name,
            graph,
            uid,
            smiles,
            structure,
            generation: UNSET_GENERATION,
            state: TaskState::Created,
        }
    }

    /// Identifier passed to the provider. Defaults to the candidate name.
    pub fn with_task_uid(mut self, task_uid: impl Into<String>) -> Self {
        self.task_uid = task_uid.into();
        self
    }

    pub fn with_generation(mut self, generation: i32) -> Self {
        self.generation = generation;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn input_record(&self) -> &StructureRecord {
        &self.structure
    }

    pub fn input_path(&self, work_dir: &Path) -> PathBuf {
        work_dir.join(format!("{}_I.txt", self.name))
    }

    pub fn output_path(&self, work_dir: &Path) -> PathBuf {
        work_dir.join(format!("{}_FIT.txt", self.name))
    }

    pub fn unreadable_output_path(&self, work_dir: &Path) -> PathBuf {
        work_dir.join(format!("{}_UnreadableFIT.txt", self.name))
    }

    pub fn image_path(&self, work_dir: &Path) -> PathBuf {
        work_dir.join(format!("{}.png", self.name))
    }

    /// Runs the task once.
    ///
    /// Returns the candidate for both the success and the chemistry-failure paths. Fatal
    /// conditions (provider could not run, malformed or NaN fitness, no fitness tag, I/O
    /// failure on the task's own files) are returned as `Err` and leave the task in
    /// [`TaskState::Exception`].
    #[instrument(skip_all, name = "fitness_task", fields(candidate = %self.name))]
    pub fn run(&mut self, ctx: &TaskContext<'_>) -> Result<Candidate, EngineError> {
        if self.state == TaskState::Running || self.state.is_terminal() {
            return Err(EngineError::Internal(format!(
                "task for '{}' was already run (state {:?})",
                self.name, self.state
            )));
        }
        self.state = TaskState::Running;
        match self.execute(ctx) {
            Ok(candidate) => {
                self.state = if candidate.has_fitness() {
                    TaskState::Succeeded
                } else {
                    TaskState::Failed
                };
                Ok(candidate)
            }
            Err(e) => {
                self.state = TaskState::Exception;
                error!(error = %e, "Fitness task failed.");
                Err(e)
            }
        }
    }

    fn execute(&self, ctx: &TaskContext<'_>) -> Result<Candidate, EngineError> {
        let input = self.input_path(ctx.work_dir);
        let output = self.output_path(ctx.work_dir);

        let mut candidate = Candidate::new(self.name.clone(), self.graph.clone());
        candidate.uid = self.uid.clone();
        candidate.smiles = self.smiles.clone();
        candidate.generation = self.generation;
        candidate.level = self.graph.level();
        candidate.file = Some(output.clone());

        write_record(&self.structure, &input)?;
        if output.exists() {
            fs::remove_file(&output).map_err(|source| io_error(&output, source))?;
        }

        let request = ProviderRequest {
            input: &input,
            output: &output,
            work_dir: ctx.work_dir,
            task_uid: &self.task_uid,
        };
        ctx.provider
            .evaluate(&request)
            .map_err(|source| EngineError::Provider {
                candidate: self.name.clone(),
                source,
            })?;

        let mut processed = match RecordFile::read_from_path(&output) {
            Ok(record) if !record.is_empty() => record,
            Ok(_) => return self.recover_unreadable(candidate, ctx.work_dir),
            Err(e) => {
                warn!(error = %e, "Cannot parse fitness provider output.");
                return self.recover_unreadable(candidate, ctx.work_dir);
            }
        };

        if let Some(uid) = processed.property(tags::UID) {
            candidate.uid = uid.to_string();
        }

        if let Some(err) = processed.property(tags::MOL_ERROR) {
            info!(error = err, "Structure {} has an error.", self.name);
            ctx.retries.increment();
            candidate.set_error(err);
            return Ok(candidate);
        }

        let Some(raw) = processed.property(tags::FITNESS) else {
            return Err(EngineError::MissingFitness {
                path: output.to_string_lossy().to_string(),
            });
        };
        let fitness: f64 = raw.trim().parse().map_err(|_| EngineError::InvalidFitness {
            candidate: self.name.clone(),
            value: raw.to_string(),
        })?;
        if fitness.is_nan() {
            return Err(EngineError::NanFitness {
                candidate: self.name.clone(),
            });
        }

        processed.set_property(tags::SMILES, self.smiles.as_str());
        stamp_graph(&mut processed, &self.graph);
        write_record(&processed, &output)?;
        candidate.set_fitness(fitness);

        if let Some(renderer) = ctx.renderer {
            let image = self.image_path(ctx.work_dir);
            match renderer.render(&processed, &image) {
                Ok(()) => candidate.image = Some(image),
                Err(e) => warn!(error = %e, "Unable to create image."),
            }
        }

        if let Some(population) = ctx.population {
            info!("Adding {} to population.", self.name);
            population.insert(candidate.clone());
            ctx.retries.decrement();
        }
        Ok(candidate)
    }

    /// Replaces an unreadable provider output by a minimal record carrying a diagnostic
    /// error, keeping the original for inspection.
    fn recover_unreadable(
        &self,
        mut candidate: Candidate,
        work_dir: &Path,
    ) -> Result<Candidate, EngineError> {
        let output = self.output_path(work_dir);
        let backup = self.unreadable_output_path(work_dir);
        warn!(path = %output.display(), "Unreadable FIT file for {}.", self.name);

        if output.exists() {
            fs::copy(&output, &backup).map_err(|source| io_error(&backup, source))?;
            fs::remove_file(&output).map_err(|source| io_error(&output, source))?;
        } else {
            fs::File::create(&backup).map_err(|source| io_error(&backup, source))?;
        }

        let message = format!("#FTask: Unable to retrieve data. See {}", backup.display());
        let mut placeholder = StructureRecord::new();
        placeholder.set_property(tags::TITLE, self.name.as_str());
        placeholder.set_property(tags::MOL_ERROR, message.as_str());
        stamp_graph(&mut placeholder, &self.graph);
        write_record(&placeholder, &output)?;

        candidate.set_error(message);
        Ok(candidate)
    }
}

fn stamp_graph(record: &mut StructureRecord, graph: &Graph) {
    record.set_property(tags::GRAPH_CODE, graph.id().to_string());
    record.set_property(tags::GRAPH_ENCODING, graph_string::encode(graph));
    if let Some(message) = graph.message() {
        record.set_property(tags::GRAPH_MESSAGE, message);
    }
}

fn write_record(record: &StructureRecord, path: &Path) -> Result<(), EngineError> {
    RecordFile::write_to_path(record, path).map_err(|source| EngineError::Record {
        path: path.to_string_lossy().to_string(),
        source,
    })
}

fn io_error(path: &Path, source: std::io::Error) -> EngineError {
    EngineError::Io {
        path: path.to_string_lossy().to_string(),
        source,
    }
}
