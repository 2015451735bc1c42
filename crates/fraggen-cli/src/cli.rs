use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "The fraggen developers",
    version,
    about = "fraggen CLI - evaluate and inspect fragment-graph candidates for de novo molecular design.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score a batch of candidate graphs with a fitness provider.
    Evaluate(EvaluateArgs),
    /// Decode, validate and re-encode candidate graphs.
    Inspect(InspectArgs),
    /// Rebuild a population report from the fitness output files of a previous run.
    Collect(CollectArgs),
}

/// Arguments for the `evaluate` subcommand.
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    // --- Core Arguments ---
    /// File with one graph string per line, optionally preceded by a candidate name.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path to the run configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the fragment-space library from the config file.
    #[arg(short, long, value_name = "PATH")]
    pub library: Option<PathBuf>,

    /// Override the working directory where task files are written.
    #[arg(short, long, value_name = "PATH")]
    pub work_dir: Option<PathBuf>,

    /// Path of the CSV population report. Defaults to `population.csv` in the working directory.
    #[arg(short, long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    // --- Provider Overrides ---
    /// Use this external fitness script instead of the provider from the config file.
    #[arg(long, value_name = "PATH")]
    pub script: Option<PathBuf>,

    /// Interpreter used to run the external fitness script.
    #[arg(long, value_name = "PROGRAM")]
    pub interpreter: Option<String>,

    /// Wall-clock limit for one external provider run, in seconds.
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S provider.timeout-seconds=120
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `inspect` subcommand.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// File with one graph string per line, optionally preceded by a candidate name.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Fragment-space library used to decode the graphs.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub library: PathBuf,

    /// Exit with an error if any graph fails to decode or validate.
    #[arg(long)]
    pub strict: bool,

    /// Print the re-encoded graph for every valid line.
    #[arg(long)]
    pub echo: bool,
}

/// Arguments for the `collect` subcommand.
#[derive(Args, Debug)]
pub struct CollectArgs {
    /// Working directory of a previous `evaluate` run.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub work_dir: PathBuf,

    /// Fragment-space library used to decode the stored graphs.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub library: PathBuf,

    /// Path of the CSV report to write.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Accept output files without a UID property.
    #[arg(long)]
    pub allow_no_uid: bool,
}
