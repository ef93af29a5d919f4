use super::defaults::DefaultsConfig;
use super::file::FileConfig;
use super::models::AppConfig;
use crate::cli::BuildArgs;
use crate::error::{CliError, Result};
use std::path::{Path, PathBuf};
use topobuilder::engine::config as core_config;

pub fn build_config(args: &BuildArgs) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();

    let file_config = if let Some(config_path) = &args.config {
        FileConfig::from_file(config_path)?
    } else {
        FileConfig::default()
    };
    let config_dir = args.config.as_deref().and_then(Path::parent);

    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    let enumeration_file = file_config.enumeration.take().unwrap_or_default();
    let equivalence = args
        .equivalence
        .or(enumeration_file.equivalence)
        .unwrap_or(defaults.equivalence);
    let limit = args.limit.or(enumeration_file.limit).or(defaults.limit);

    let loops_file = file_config.loops.take().unwrap_or_default();
    let loop_range = args
        .loop_range
        .or(loops_file.range)
        .unwrap_or(defaults.loop_range);

    let corrections_file = file_config.corrections.take().unwrap_or_default();
    let correction_table_path = match (&args.corrections, corrections_file.path) {
        (Some(cli_path), _) => Some(existing_path(cli_path.clone())?),
        (None, Some(file_path)) => Some(existing_path(relative_to(config_dir, file_path))?),
        (None, None) => None,
    };
    let correction_documents = if !args.correction_documents.is_empty() {
        args.correction_documents.clone()
    } else {
        corrections_file
            .documents
            .unwrap_or_default()
            .into_iter()
            .map(|path| relative_to(config_dir, path))
            .collect()
    };
    let correction_documents = correction_documents
        .into_iter()
        .map(existing_path)
        .collect::<Result<Vec<_>>>()?;

    let core_config = core_config::BuildConfigBuilder::new()
        .equivalence(equivalence)
        .limit(limit)
        .loop_range(loop_range)
        .correction_table_path(correction_table_path)
        .correction_documents(correction_documents)
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    Ok(AppConfig {
        case_path: args.case.clone(),
        output_dir: args.output_dir.clone(),
        output_format: args
            .format
            .or(file_config.output_format)
            .unwrap_or_default(),
        core_config,
    })
}

/// Paths in a config file are read relative to the file itself.
fn relative_to(base: Option<&Path>, path: PathBuf) -> PathBuf {
    match base {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path,
    }
}

fn existing_path(path: PathBuf) -> Result<PathBuf> {
    if !path.exists() {
        return Err(CliError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Provided path does not exist: {}", path.display()),
        )));
    }
    Ok(path)
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    if set_values.is_empty() {
        return Ok(config);
    }
    for kv_pair in set_values {
        let Some((key, value_str)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };

        match key {
            "enumeration.equivalence" => {
                config
                    .enumeration
                    .get_or_insert_with(Default::default)
                    .equivalence = Some(
                    value_str
                        .parse()
                        .map_err(|e| CliError::Config(format!("Invalid value for {}: {}", key, e)))?,
                );
            }
            "enumeration.limit" => {
                config.enumeration.get_or_insert_with(Default::default).limit =
                    Some(value_str.parse().map_err(|_| {
                        CliError::Config(format!("Invalid integer value for {}: {}", key, value_str))
                    })?);
            }
            "loops.range" => {
                config.loops.get_or_insert_with(Default::default).range =
                    Some(value_str.parse().map_err(|_| {
                        CliError::Config(format!("Invalid integer value for {}: {}", key, value_str))
                    })?);
            }
            "corrections.path" => {
                config.corrections.get_or_insert_with(Default::default).path =
                    Some(PathBuf::from(value_str));
            }
            "corrections.documents" => {
                config.corrections.get_or_insert_with(Default::default).documents = Some(
                    value_str
                        .split(',')
                        .map(str::trim)
                        .filter(|p| !p.is_empty())
                        .map(PathBuf::from)
                        .collect(),
                );
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
