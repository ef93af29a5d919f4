use super::{load_case, save_case};
use crate::cli::{BuildArgs, OutputFormat};
use crate::config::builder::build_config;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use std::fs;
use std::path::{Path, PathBuf};
use topobuilder::core::models::case::Case;
use topobuilder::engine::progress::ProgressReporter;
use topobuilder::workflows;
use tracing::{info, warn};

pub fn run(args: BuildArgs) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let app_config = build_config(&args)?;

    info!("Loading case from {:?}", &app_config.case_path);
    let case = load_case(&app_config.case_path)?;

    if app_config.output_dir.exists() && !app_config.output_dir.is_dir() {
        return Err(CliError::Argument(format!(
            "output directory '{}' exists and is not a directory",
            app_config.output_dir.display()
        )));
    }

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Building topologies for case '{}'...", case.name());
    let cases = workflows::build::run(&case, &app_config.core_config, &reporter)?;
    info!("Workflow finished, received {} case(s).", cases.len());

    if cases.is_empty() {
        warn!("Workflow completed but produced no cases.");
        println!("Warning: no topology was produced.");
        return Ok(());
    }

    fs::create_dir_all(&app_config.output_dir)?;
    let written = write_cases(
        &cases,
        case.name(),
        &app_config.output_dir,
        app_config.output_format,
    )?;
    println!(
        "✓ {} case(s) written to: {}",
        written.len(),
        app_config.output_dir.display()
    );
    Ok(())
}

fn output_path(dir: &Path, stem: &str, index: usize, total: usize, format: OutputFormat) -> PathBuf {
    let width = total.to_string().len();
    dir.join(format!(
        "{stem}_{index:0width$}.{}",
        format.extension(),
        width = width
    ))
}

fn write_cases(
    cases: &[Case],
    stem: &str,
    dir: &Path,
    format: OutputFormat,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(cases.len());
    for (i, case) in cases.iter().enumerate() {
        let path = output_path(dir, stem, i + 1, cases.len(), format);
        info!(
            "Writing topology {} to {:?}",
            case.topology()
                .map(ToString::to_string)
                .unwrap_or_default(),
            &path
        );
        save_case(case, &path)?;
        written.push(path);
    }
    Ok(written)
}
