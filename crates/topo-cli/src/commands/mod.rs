pub mod build;
pub mod info;
pub mod place;
pub mod template;

use crate::error::{CliError, Result};
use std::io::{self, Write};
use std::path::Path;
use topobuilder::core::io::document::{JsonCaseFile, read_case, write_case};
use topobuilder::core::io::traits::CaseFile;
use topobuilder::core::models::case::Case;

pub(crate) fn load_case(path: &Path) -> Result<Case> {
    read_case(path).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })
}

pub(crate) fn save_case(case: &Case, path: &Path) -> Result<()> {
    write_case(case, path).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })
}

/// Writes `case` to `output`, or pretty JSON on stdout when no path is given.
pub(crate) fn emit_case(case: &Case, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            save_case(case, path)?;
            println!("✓ Case '{}' written to: {}", case.name(), path.display());
            Ok(())
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            JsonCaseFile::write_to(case, &mut handle)
                .map_err(|e| CliError::Other(anyhow::anyhow!(e)))?;
            handle.flush()?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn unreadable_documents_name_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        let err = load_case(&path).unwrap_err();
        assert!(matches!(&err, CliError::FileParsing { path: p, .. } if p == &path));
    }

    #[test]
    fn saved_cases_load_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("case.toml");
        let case = Case::from_architecture("roundtrip", "2H.3E").unwrap();
        save_case(&case, &path).unwrap();
        assert_eq!(load_case(&path).unwrap(), case);
    }
}
