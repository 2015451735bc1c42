use super::defaults::DefaultsConfig;
use super::file::{FileConfig, FileProviderConfig};
use super::models::AppConfig;
use crate::cli::EvaluateArgs;
use crate::error::{CliError, Result};
use fraggen::engine::config as core_config;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

pub fn build_config(args: &EvaluateArgs) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();

    let file_config = if let Some(config_path) = &args.config {
        FileConfig::from_file(config_path)?
    } else {
        FileConfig::default()
    };
    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    let library_path = args
        .library
        .clone()
        .or(file_config.library.take())
        .ok_or_else(|| {
            CliError::Config(
                "A fragment-space library is required either in the config file (`library`) or via --library."
                    .to_string(),
            )
        })?;
    if !library_path.exists() {
        return Err(CliError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Provided path does not exist: {}", library_path.display()),
        )));
    }

    let work_dir = args
        .work_dir
        .clone()
        .or(file_config.work_dir.take())
        .unwrap_or(defaults.work_dir.clone());
    let report_path = args
        .report
        .clone()
        .or(file_config.report.take())
        .unwrap_or_else(|| work_dir.join(defaults.report_file_name));

    let provider = merge_provider(args, file_config.provider.take(), &defaults)?;

    let core_config = core_config::EvaluationConfigBuilder::new()
        .work_dir(work_dir)
        .provider(provider)
        .initial_retries(
            file_config
                .initial_retries
                .unwrap_or(defaults.initial_retries),
        )
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    Ok(AppConfig {
        input_path: args.input.clone(),
        library_path,
        report_path,
        core_config,
    })
}

fn merge_provider(
    args: &EvaluateArgs,
    file_val: Option<FileProviderConfig>,
    defaults: &DefaultsConfig,
) -> Result<core_config::ProviderConfig> {
    let timeout = |file_timeout: Option<u64>| args.timeout.or(file_timeout).map(Duration::from_secs);

    if let Some(script) = &args.script {
        let (file_interpreter, file_timeout) = match file_val {
            Some(FileProviderConfig::External {
                interpreter,
                timeout_seconds,
                ..
            }) => (interpreter, timeout_seconds),
            _ => (None, None),
        };
        return Ok(core_config::ProviderConfig::External {
            interpreter: args
                .interpreter
                .clone()
                .or(file_interpreter)
                .unwrap_or(defaults.interpreter.clone()),
            script: script.clone(),
            timeout: timeout(file_timeout),
        });
    }

    match file_val {
        Some(FileProviderConfig::External {
            interpreter,
            script,
            timeout_seconds,
        }) => Ok(core_config::ProviderConfig::External {
            interpreter: args
                .interpreter
                .clone()
                .or(interpreter)
                .unwrap_or(defaults.interpreter.clone()),
            script: script.ok_or_else(|| {
                CliError::Config("`provider` of type \"external\" requires `script`".to_string())
            })?,
            timeout: timeout(timeout_seconds),
        }),
        Some(FileProviderConfig::Formula { constant, weights }) => {
            if args.interpreter.is_some() || args.timeout.is_some() {
                return Err(CliError::Argument(
                    "--interpreter and --timeout only apply to external providers".to_string(),
                ));
            }
            Ok(core_config::ProviderConfig::Formula { constant, weights })
        }
        None => Err(CliError::Config(
            "A fitness provider is required either in the config file (`[provider]`) or via --script."
                .to_string(),
        )),
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value)))
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let Some((key, value_str)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };

        match key {
            "library" => config.library = Some(PathBuf::from(value_str)),
            "work-dir" => config.work_dir = Some(PathBuf::from(value_str)),
            "report" => config.report = Some(PathBuf::from(value_str)),
            "initial-retries" => {
                config.initial_retries = Some(parse_value(key, value_str, "integer")?);
            }
            "provider.interpreter" | "provider.timeout-seconds" => {
                let provider = config.provider.get_or_insert(FileProviderConfig::External {
                    interpreter: None,
                    script: None,
                    timeout_seconds: None,
                });
                let FileProviderConfig::External {
                    interpreter,
                    timeout_seconds,
                    ..
                } = provider
                else {
                    return Err(CliError::Config(format!(
                        "'{}' only applies to external providers",
                        key
                    )));
                };
                if key == "provider.interpreter" {
                    *interpreter = Some(value_str.to_string());
                } else {
                    *timeout_seconds = Some(parse_value(key, value_str, "integer")?);
                }
            }
            "provider.constant" => {
                let value = parse_value(key, value_str, "float")?;
                let (constant, _) = formula_mut(&mut config, key)?;
                *constant = value;
            }
            _ if key.starts_with("provider.weights.") => {
                let name = &key["provider.weights.".len()..];
                if name.is_empty() {
                    return Err(CliError::Config(format!("Missing descriptor name in '{}'", key)));
                }
                let value = parse_value(key, value_str, "float")?;
                let (_, weights) = formula_mut(&mut config, key)?;
                weights.insert(name.to_string(), value);
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}

fn formula_mut<'a>(
    config: &'a mut FileConfig,
    key: &str,
) -> Result<(&'a mut f64, &'a mut BTreeMap<String, f64>)> {
    let provider = config.provider.get_or_insert(FileProviderConfig::Formula {
        constant: 0.0,
        weights: BTreeMap::new(),
    });
    match provider {
        FileProviderConfig::Formula { constant, weights } => Ok((constant, weights)),
        FileProviderConfig::External { .. } => Err(CliError::Config(format!(
            "'{}' only applies to formula providers",
            key
        ))),
    }
}
