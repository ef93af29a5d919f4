use super::emit_case;
use crate::cli::TemplateArgs;
use crate::error::{CliError, Result};
use topobuilder::core::models::case::Case;
use topobuilder::engine::error::EngineError;
use tracing::info;

pub fn run(args: TemplateArgs) -> Result<()> {
    let case = template_case(&args)?;
    info!(
        "Created case '{}' with architecture {}",
        case.name(),
        case.architecture_signature()
    );
    emit_case(&case, args.output.as_deref())
}

fn template_case(args: &TemplateArgs) -> Result<Case> {
    let built = match (&args.source.architecture, &args.source.topology) {
        (Some(architecture), None) => Case::from_architecture(&args.name, architecture),
        (None, Some(topology)) => Case::from_topology(&args.name, topology),
        _ => {
            return Err(CliError::Argument(
                "exactly one of --architecture or --topology is required".to_string(),
            ));
        }
    };
    built.map_err(|e| CliError::Core(EngineError::from(e)))
}
