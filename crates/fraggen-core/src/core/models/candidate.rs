use super::graph::Graph;
use super::ids::IdGenerator;
use crate::core::fragspace::FragmentSpace;
use crate::core::io::graph_string::{self, DecodeError};
use crate::core::io::record::StructureRecord;
use crate::core::io::tags;
use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const UNDEFINED: &str = "UNDEFINED";
pub const DEFAULT_NAME: &str = "noname";
pub const UNSET_GENERATION: i32 = -1;

#[derive(Debug, Error)]
pub enum CandidateError {
    #[error("Record has no '{0}' property")]
    MissingTag(&'static str),
    #[error("Fitness value '{0}' is not a number")]
    InvalidFitness(String),
    #[error("Fitness value is NaN")]
    NanFitness,
    #[error("Invalid graph level '{0}'")]
    InvalidLevel(String),
    #[error("Cannot decode candidate graph: {0}")]
    Graph(#[from] DecodeError),
}

/// A scored (or failed) member of a population.
///
/// After evaluation exactly one of fitness and error is set: [`Candidate::set_fitness`]
/// clears any error and [`Candidate::set_error`] clears any fitness.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub name: String,
    pub graph: Option<Graph>,
    pub uid: String,
    pub smiles: String,
    fitness: Option<f64>,
    error: Option<String>,
    pub generation: i32,
    pub level: Option<i32>,
    pub file: Option<PathBuf>,
    pub image: Option<PathBuf>,
    pub comments: Option<String>,
}

impl Default for Candidate {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            graph: None,
            uid: UNDEFINED.to_string(),
            smiles: UNDEFINED.to_string(),
            fitness: None,
            error: None,
            generation: UNSET_GENERATION,
            level: None,
            file: None,
            image: None,
            comments: None,
        }
    }
}

impl Candidate {
    pub fn new(name: impl Into<String>, graph: Graph) -> Self {
        Self {
            name: name.into(),
            graph: Some(graph),
            ..Self::default()
        }
    }

    pub fn has_fitness(&self) -> bool {
        self.fitness.is_some()
    }

    pub fn fitness(&self) -> Option<f64> {
        self.fitness
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_fitness(&mut self, fitness: f64) {
        self.fitness = Some(fitness);
        self.error = None;
    }

    pub fn set_error(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
        self.fitness = None;
    }

    /// Rebuilds a candidate from the properties of a structure record.
    ///
    /// `GraphENC` is mandatory. A missing `UID` is an error unless `allow_no_uid` is set,
    /// in which case the placeholder [`tags::NO_UID`] is used. When both `MOL_ERROR` and
    /// `FITNESS` are present the error wins, although a malformed fitness still fails.
    pub fn from_record(
        record: &StructureRecord,
        file: Option<&Path>,
        space: &FragmentSpace,
        ids: &IdGenerator,
        allow_no_uid: bool,
    ) -> Result<Self, CandidateError> {
        let mut candidate = Candidate {
            file: file.map(Path::to_path_buf),
            ..Candidate::default()
        };
        if let Some(title) = record.property(tags::TITLE) {
            candidate.name = title.to_string();
        }

        if let Some(raw) = record.property(tags::FITNESS) {
            let value: f64 = raw
                .parse()
                .map_err(|_| CandidateError::InvalidFitness(raw.to_string()))?;
            if value.is_nan() {
                return Err(CandidateError::NanFitness);
            }
            candidate.set_fitness(value);
        }
        if let Some(error) = record.property(tags::MOL_ERROR) {
            candidate.set_error(error);
        }

        if let Some(raw) = record.property(tags::GRAPH_LEVEL) {
            let level = raw
                .parse()
                .map_err(|_| CandidateError::InvalidLevel(raw.to_string()))?;
            candidate.level = Some(level);
        }
        if let Some(smiles) = record.property(tags::SMILES) {
            candidate.smiles = smiles.to_string();
        }

        candidate.uid = match record.property(tags::UID) {
            Some(uid) => uid.to_string(),
            None if allow_no_uid => tags::NO_UID.to_string(),
            None => return Err(CandidateError::MissingTag(tags::UID)),
        };

        let encoded = record
            .property(tags::GRAPH_ENCODING)
            .ok_or(CandidateError::MissingTag(tags::GRAPH_ENCODING))?;
        let mut graph = graph_string::decode(encoded, space, ids)?;
        if let Some(level) = candidate.level {
            graph.set_level(Some(level));
        }
        candidate.graph = Some(graph);

        candidate.comments = record.property(tags::GRAPH_MESSAGE).map(str::to_string);
        Ok(candidate)
    }

    /// Releases the graph held by this candidate.
    pub fn cleanup(&mut self) {
        if let Some(graph) = self.graph.as_mut() {
            graph.cleanup();
        }
        self.graph = None;
    }
}

/// Candidates compare by fitness only. A candidate without fitness orders below any
/// scored one.
impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.fitness, other.fitness) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] ", self.name, self.uid)?;
        match (&self.fitness, &self.error) {
            (Some(fitness), _) => write!(f, "fitness={fitness}"),
            (None, Some(error)) => write!(f, "error={error}"),
            (None, None) => write!(f, "unscored"),
        }
    }
}
