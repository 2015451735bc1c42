//! Fitness providers: everything that can turn an input structure file into an output
//! structure file carrying either a `FITNESS` or a `MOL_ERROR` property.

use super::config::ProviderConfig;
use crate::core::io::record::{RecordError, RecordFile};
use crate::core::io::tags;
use crate::core::io::traits::StructureFile;
use std::collections::BTreeMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Files and identifiers handed to a provider for one evaluation.
#[derive(Debug, Clone, Copy)]
pub struct ProviderRequest<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub work_dir: &'a Path,
    pub task_uid: &'a str,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Failed to launch fitness provider '{program}': {source}")]
    Spawn { program: String, source: io::Error },
    #[error("Fitness provider did not finish within {0:?} and was killed")]
    Timeout(Duration),
    #[error("Lost track of fitness provider process: {0}")]
    Wait(io::Error),
    #[error("Cannot read provider input '{path}': {source}")]
    Input { path: String, source: RecordError },
    #[error("Cannot write provider output '{path}': {source}")]
    Output { path: String, source: RecordError },
}

/// The `evaluate(input) -> output` contract every scorer satisfies.
///
/// Chemistry failures are reported through a `MOL_ERROR` property in the output file, not
/// through `Err`. An `Err` means the provider itself could not run.
pub trait FitnessProvider: Send + Sync {
    fn name(&self) -> &str;

    fn evaluate(&self, request: &ProviderRequest<'_>) -> Result<(), ProviderError>;
}

pub fn from_config(config: &ProviderConfig) -> Box<dyn FitnessProvider> {
    match config {
        ProviderConfig::External {
            interpreter,
            script,
            timeout,
        } => Box::new(ExternalFitnessProvider::new(
            interpreter.clone(),
            script.clone(),
            *timeout,
        )),
        ProviderConfig::Formula { constant, weights } => {
            Box::new(FormulaFitnessProvider::new(*constant, weights.clone()))
        }
    }
}

/// Scores candidates with an external script run through an interpreter.
///
/// The script receives `input output workdir taskUID` as arguments. Its standard output and
/// error go to `<workdir>/<taskUID>.log`. A non-zero exit status is logged but not treated as
/// a failure; the content of the output file decides the outcome.
#[derive(Debug, Clone)]
pub struct ExternalFitnessProvider {
    interpreter: String,
    script: PathBuf,
    timeout: Option<Duration>,
}

impl ExternalFitnessProvider {
    pub fn new(interpreter: impl Into<String>, script: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
        Self {
            interpreter: interpreter.into(),
            script: script.into(),
            timeout,
        }
    }

    fn log_sinks(request: &ProviderRequest<'_>) -> (Stdio, Stdio) {
        let path = request.work_dir.join(format!("{}.log", request.task_uid));
        match File::create(&path).and_then(|f| Ok((f.try_clone()?, f))) {
            Ok((out, err)) => (Stdio::from(out), Stdio::from(err)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot create provider log; discarding output.");
                (Stdio::null(), Stdio::null())
            }
        }
    }
}

impl FitnessProvider for ExternalFitnessProvider {
    fn name(&self) -> &str {
        &self.interpreter
    }

    fn evaluate(&self, request: &ProviderRequest<'_>) -> Result<(), ProviderError> {
        let (stdout, stderr) = Self::log_sinks(request);
        let mut child = Command::new(&self.interpreter)
            .arg(&self.script)
            .arg(request.input)
            .arg(request.output)
            .arg(request.work_dir)
            .arg(request.task_uid)
            .current_dir(request.work_dir)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .spawn()
            .map_err(|source| ProviderError::Spawn {
                program: self.interpreter.clone(),
                source,
            })?;
        debug!(task = request.task_uid, pid = child.id(), "Fitness provider started.");

        let started = Instant::now();
        loop {
            if let Some(status) = child.try_wait().map_err(ProviderError::Wait)? {
                if !status.success() {
                    warn!(task = request.task_uid, %status, "Fitness provider exited with failure status.");
                }
                return Ok(());
            }
            if let Some(limit) = self.timeout {
                if started.elapsed() >= limit {
                    if let Err(e) = child.kill() {
                        warn!(task = request.task_uid, error = %e, "Failed to kill fitness provider.");
                    }
                    if let Err(e) = child.wait() {
                        warn!(task = request.task_uid, error = %e, "Failed to reap fitness provider.");
                    }
                    return Err(ProviderError::Timeout(limit));
                }
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Internal scorer: `constant + sum(weight * property)` over numeric properties of the
/// input record.
///
/// A missing or non-numeric property is a chemistry failure and produces `MOL_ERROR`.
#[derive(Debug, Clone, Default)]
pub struct FormulaFitnessProvider {
    constant: f64,
    weights: BTreeMap<String, f64>,
}

impl FormulaFitnessProvider {
    pub fn new(constant: f64, weights: BTreeMap<String, f64>) -> Self {
        Self { constant, weights }
    }

    fn score(&self, property: impl Fn(&str) -> Option<String>) -> Result<f64, String> {
        let mut total = self.constant;
        for (name, weight) in &self.weights {
            let raw = property(name).ok_or_else(|| format!("Missing descriptor '{name}'"))?;
            let value: f64 = raw
                .trim()
                .parse()
                .map_err(|_| format!("Descriptor '{name}' is not numeric ('{raw}')"))?;
            total += weight * value;
        }
        Ok(total)
    }
}

impl FitnessProvider for FormulaFitnessProvider {
    fn name(&self) -> &str {
        "formula"
    }

    fn evaluate(&self, request: &ProviderRequest<'_>) -> Result<(), ProviderError> {
        let mut record =
            RecordFile::read_from_path(request.input).map_err(|source| ProviderError::Input {
                path: request.input.to_string_lossy().to_string(),
                source,
            })?;

        match self.score(|name| record.property(name).map(str::to_string)) {
            Ok(fitness) => record.set_property(tags::FITNESS, fitness.to_string()),
            Err(reason) => record.set_property(tags::MOL_ERROR, reason),
        }

        RecordFile::write_to_path(&record, request.output).map_err(|source| ProviderError::Output {
            path: request.output.to_string_lossy().to_string(),
            source,
        })
    }
}
