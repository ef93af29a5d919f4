use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use std::path::PathBuf;
use topobuilder::engine::connectivity::equivalence::EquivalenceRelation;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "TopoBuilder CLI - builds layered protein scaffold topologies: lattice placement, connectivity enumeration, empirical corrections and loop length estimation.",
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
    /// Write a relative case document from an architecture or topology string.
    Template(TemplateArgs),
    /// Place the SSEs of a case on the idealized lattice.
    Place(PlaceArgs),
    /// Run the full pipeline and write one case document per connectivity.
    Build(BuildArgs),
    /// Print a summary of a case document.
    Info(InfoArgs),
}

/// Syntax of written case documents.
#[derive(ValueEnum, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Toml,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Toml => "toml",
        }
    }
}

/// Arguments for the `template` subcommand.
#[derive(Args, Debug)]
pub struct TemplateArgs {
    /// Name stored in `configuration.name`.
    #[arg(short, long, required = true)]
    pub name: String,

    #[command(flatten)]
    pub source: TemplateSource,

    /// Output case document (.json or .toml). Printed as JSON to stdout when omitted.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// Exactly one of the two notations describes the case.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct TemplateSource {
    /// Architecture string, e.g. `2H.4E.2H` or `2h:13:10.4E`.
    #[arg(short, long, value_name = "ARCH")]
    pub architecture: Option<String>,

    /// Topology string, e.g. `B2E.C1H.B1E`; also fixes the connectivity.
    #[arg(short, long, value_name = "TOPOLOGY")]
    pub topology: Option<String>,
}

/// Arguments for the `place` subcommand.
#[derive(Args, Debug)]
pub struct PlaceArgs {
    /// Input case document (.json or .toml).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub case: PathBuf,

    /// Output case document. Printed as JSON to stdout when omitted.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// Arguments for the `build` subcommand.
#[derive(Args, Debug)]
pub struct BuildArgs {
    // --- Core Arguments ---
    /// Input case document (.json or .toml).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub case: PathBuf,

    /// Directory receiving one case document per connectivity.
    #[arg(short, long, required = true, value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Path to a build configuration file in TOML format.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Syntax of the written case documents [default: json]
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    // --- Pipeline Overrides ---
    /// CSV table of empirical pair corrections.
    #[arg(long, value_name = "PATH")]
    pub corrections: Option<PathBuf>,

    /// Layer or SSE correction document (.json or .toml). Can be used multiple times.
    #[arg(long = "correction-document", value_name = "PATH")]
    pub correction_documents: Vec<PathBuf>,

    /// Relation used to group equivalent connectivities.
    #[arg(short, long, value_name = "RELATION")]
    pub equivalence: Option<EquivalenceRelation>,

    /// Keep at most this many connectivity classes.
    #[arg(short, long, value_name = "INT")]
    pub limit: Option<usize>,

    /// Half-width of the loop length window.
    #[arg(long, value_name = "INT")]
    pub loop_range: Option<u32>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S enumeration.limit=5
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `info` subcommand.
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Input case document (.json or .toml).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub case: PathBuf,
}
