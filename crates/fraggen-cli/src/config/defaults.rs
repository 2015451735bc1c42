use std::path::PathBuf;

pub struct DefaultsConfig {
    pub work_dir: PathBuf,
    pub report_file_name: &'static str,
    pub interpreter: String,
    pub initial_retries: i64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("fraggen-run"),
            report_file_name: "population.csv",
            interpreter: "bash".to_string(),
            initial_retries: 0,
        }
    }
}
