use fraggen::engine::config as core_config;
use std::path::PathBuf;

pub struct AppConfig {
    pub input_path: PathBuf,
    pub library_path: PathBuf,
    pub report_path: PathBuf,
    pub core_config: core_config::EvaluationConfig,
}
