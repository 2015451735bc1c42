use crate::error::{CliError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "kebab-case")]
pub enum FileProviderConfig {
    External {
        interpreter: Option<String>,
        script: Option<PathBuf>,
        timeout_seconds: Option<u64>,
    },
    Formula {
        #[serde(default)]
        constant: f64,
        #[serde(default)]
        weights: BTreeMap<String, f64>,
    },
}

/// Run file as written by the user. Every field is optional; missing values come from the
/// command line or from [`super::defaults::DefaultsConfig`].
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub library: Option<PathBuf>,
    pub work_dir: Option<PathBuf>,
    pub report: Option<PathBuf>,
    pub initial_retries: Option<i64>,
    pub provider: Option<FileProviderConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        let mut config: FileConfig =
            toml::from_str(&content).map_err(|e| CliError::FileParsing {
                path: path.to_path_buf(),
                source: e.into(),
            })?;
        config.resolve_relative_paths(path.parent().unwrap_or(Path::new(".")));
        Ok(config)
    }

    /// Paths in a run file are relative to the file itself.
    fn resolve_relative_paths(&mut self, base: &Path) {
        let rebase = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        if let Some(p) = self.library.as_mut() {
            rebase(p);
        }
        if let Some(p) = self.work_dir.as_mut() {
            rebase(p);
        }
        if let Some(p) = self.report.as_mut() {
            rebase(p);
        }
        if let Some(FileProviderConfig::External {
            script: Some(p), ..
        }) = self.provider.as_mut()
        {
            rebase(p);
        }
    }
}
