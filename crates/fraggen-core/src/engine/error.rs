use super::provider::ProviderError;
use crate::core::io::record::RecordError;
use thiserror::Error;

/// Fatal outcomes of a fitness task. Chemistry failures are not errors; they end up on the
/// candidate instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Cannot write '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Cannot write structure record '{path}': {source}")]
    Record { path: String, source: RecordError },

    #[error("Fitness provider failed for '{candidate}': {source}")]
    Provider {
        candidate: String,
        source: ProviderError,
    },

    #[error("Fitness value '{value}' of '{candidate}' could not be converted to a number")]
    InvalidFitness { candidate: String, value: String },

    #[error("Fitness value is NaN for '{candidate}'")]
    NanFitness { candidate: String },

    #[error("Could not find \"FITNESS\" tag in file: {path}")]
    MissingFitness { path: String },

    #[error("Internal logic error: {0}")]
    Internal(String),
}
