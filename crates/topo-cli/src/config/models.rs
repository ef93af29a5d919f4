use crate::cli::OutputFormat;
use std::path::PathBuf;
use topobuilder::engine::config as core_config;

pub struct AppConfig {
    pub case_path: PathBuf,
    pub output_dir: PathBuf,
    pub output_format: OutputFormat,
    pub core_config: core_config::BuildConfig,
}
