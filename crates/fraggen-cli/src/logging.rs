use crate::error::{CliError, Result};
use std::fs::File;
use std::path::PathBuf;
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self},
    prelude::*,
};

/// Environment variable that overrides the console level (`off`, `error`, ..., `trace`).
pub const LOG_LEVEL_ENV: &str = "FRAGGEN_LOG";

fn level_for(verbosity: u8, quiet: bool, env_override: Option<&str>) -> Result<LevelFilter> {
    if quiet {
        return Ok(LevelFilter::ERROR);
    }
    if let Some(raw) = env_override {
        return raw.trim().parse().map_err(|_| {
            CliError::Config(format!("Invalid {LOG_LEVEL_ENV} level '{raw}'"))
        });
    }
    Ok(match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    })
}

pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<PathBuf>) -> Result<()> {
    let env_override = std::env::var(LOG_LEVEL_ENV).ok();
    let console_level = level_for(verbosity, quiet, env_override.as_deref())?;

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .compact()
        .with_filter(console_level);

    let subscriber = tracing_subscriber::registry().with(stderr_layer);

    if let Some(path) = log_file {
        let file = File::create(&path).map_err(CliError::Io)?;

        // The log file always records task-level detail, whatever the console shows.
        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_thread_ids(true)
            .with_target(true)
            .with_filter(LevelFilter::DEBUG.max(console_level));

        subscriber.with(file_layer).init();
    } else {
        subscriber.init();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::sync::Once;
    use tracing::{debug, error, info, trace, warn};

    static INIT: Once = Once::new();

    fn ensure_global_logger_is_set() {
        INIT.call_once(|| {
            setup_logging(3, false, None).expect("Failed to set up global logger for tests");
        });
    }

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(level_for(0, false, None).unwrap(), LevelFilter::WARN);
        assert_eq!(level_for(1, false, None).unwrap(), LevelFilter::INFO);
        assert_eq!(level_for(2, false, None).unwrap(), LevelFilter::DEBUG);
        assert_eq!(level_for(9, false, None).unwrap(), LevelFilter::TRACE);
        assert_eq!(level_for(3, true, None).unwrap(), LevelFilter::ERROR);
    }

    #[test]
    fn environment_override_wins_over_flags() {
        assert_eq!(level_for(0, false, Some("debug")).unwrap(), LevelFilter::DEBUG);
        assert_eq!(level_for(3, false, Some(" off ")).unwrap(), LevelFilter::OFF);
        assert_eq!(level_for(0, true, Some("trace")).unwrap(), LevelFilter::ERROR);
        assert!(matches!(
            level_for(0, false, Some("loud")),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    #[serial]
    fn initialization_and_macros_work() {
        ensure_global_logger_is_set();

        error!("This is an error");
        warn!("This is a warning");
        info!("This is info");
        debug!("This is debug");
        trace!("This is trace");
    }

    #[test]
    #[serial]
    fn file_layer_records_debug_events() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("test.log");

        let file = File::create(&log_path).unwrap();
        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_thread_ids(true)
            .with_filter(LevelFilter::DEBUG);
        let subscriber = tracing_subscriber::registry().with(file_layer);

        tracing::subscriber::with_default(subscriber, || {
            debug!("Task cand-1 finished.");
            trace!("Too detailed for the file.");
        });

        let content = std::fs::read_to_string(log_path).unwrap();
        assert!(content.contains("Task cand-1 finished."));
        assert!(content.contains("DEBUG"));
        assert!(content.contains("ThreadId"));
        assert!(!content.contains("Too detailed"));
    }

    #[test]
    #[serial]
    fn invalid_log_file_path_propagates_error() {
        let invalid_path = PathBuf::from("/");

        if cfg!(unix) && invalid_path.is_dir() {
            let result = setup_logging(0, false, Some(invalid_path));
            assert!(matches!(result, Err(CliError::Io(_))));
        }
    }
}
