use super::{emit_case, load_case};
use crate::cli::PlaceArgs;
use crate::error::{CliError, Result};
use topobuilder::engine::error::EngineError;
use topobuilder::engine::placement;
use tracing::info;

pub fn run(args: PlaceArgs) -> Result<()> {
    info!("Loading case from {:?}", &args.case);
    let case = load_case(&args.case)?;

    let placed = placement::place(&case).map_err(|e| CliError::Core(EngineError::from(e)))?;
    info!(
        "Placed {} SSE(s) of case '{}'",
        placed.coordinates().len(),
        placed.name()
    );

    emit_case(&placed, args.output.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::save_case;
    use tempfile::tempdir;
    use topobuilder::core::models::case::Case;

    #[test]
    fn placed_case_is_written_with_coordinates() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("relative.json");
        let output = dir.path().join("absolute.toml");
        save_case(&Case::from_architecture("placed", "2H.3E").unwrap(), &input).unwrap();

        run(PlaceArgs {
            case: input,
            output: Some(output.clone()),
        })
        .unwrap();

        let placed = load_case(&output).unwrap();
        assert!(placed.is_placed());
        assert_eq!(placed.coordinates().len(), 5);
    }

    #[test]
    fn missing_input_is_reported_with_its_path() {
        let dir = tempdir().unwrap();
        let err = run(PlaceArgs {
            case: dir.path().join("absent.json"),
            output: None,
        })
        .unwrap_err();
        assert!(matches!(err, CliError::FileParsing { .. }));
    }
}
