use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// How candidates are scored.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderConfig {
    /// Runs `<interpreter> <script> <input> <output> <workdir> <taskUID>`.
    External {
        interpreter: String,
        script: PathBuf,
        timeout: Option<Duration>,
    },
    /// Weighted sum of numeric properties of the input record.
    Formula {
        constant: f64,
        weights: BTreeMap<String, f64>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationConfig {
    pub work_dir: PathBuf,
    pub provider: ProviderConfig,
    pub make_pictures: bool,
    pub initial_retries: i64,
}

#[derive(Default)]
pub struct EvaluationConfigBuilder {
    work_dir: Option<PathBuf>,
    provider: Option<ProviderConfig>,
    make_pictures: bool,
    initial_retries: i64,
}

impl EvaluationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn work_dir(mut self, path: PathBuf) -> Self {
        self.work_dir = Some(path);
        self
    }
    pub fn provider(mut self, provider: ProviderConfig) -> Self {
        self.provider = Some(provider);
        self
    }
    pub fn make_pictures(mut self, enabled: bool) -> Self {
        self.make_pictures = enabled;
        self
    }
    pub fn initial_retries(mut self, retries: i64) -> Self {
        self.initial_retries = retries;
        self
    }

    pub fn build(self) -> Result<EvaluationConfig, ConfigError> {
        let provider = self
            .provider
            .ok_or(ConfigError::MissingParameter("provider"))?;
        if let ProviderConfig::External { interpreter, .. } = &provider {
            if interpreter.trim().is_empty() {
                return Err(ConfigError::InvalidParameter {
                    name: "interpreter",
                    reason: "must not be empty".to_string(),
                });
            }
        }
        Ok(EvaluationConfig {
            work_dir: self
                .work_dir
                .ok_or(ConfigError::MissingParameter("work_dir"))?,
            provider,
            make_pictures: self.make_pictures,
            initial_retries: self.initial_retries,
        })
    }
}
