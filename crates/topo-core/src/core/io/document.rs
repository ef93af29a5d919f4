use super::traits::CaseFile;
use crate::core::models::case::Case;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaseIoError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("TOML parsing error: {0}")]
    TomlDe(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Unsupported case document '{}': expected a .json or .toml file", .0.display())]
    UnsupportedFormat(PathBuf),
}

pub struct JsonCaseFile;

impl CaseFile for JsonCaseFile {
    type Error = CaseIoError;

    fn read_from(reader: &mut impl BufRead) -> Result<Case, Self::Error> {
        Ok(serde_json::from_reader(reader)?)
    }

    fn write_to(case: &Case, writer: &mut impl Write) -> Result<(), Self::Error> {
        serde_json::to_writer_pretty(&mut *writer, case)?;
        writeln!(writer)?;
        Ok(())
    }
}

pub struct TomlCaseFile;

impl CaseFile for TomlCaseFile {
    type Error = CaseIoError;

    fn read_from(reader: &mut impl BufRead) -> Result<Case, Self::Error> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        Ok(toml::from_str(&content)?)
    }

    fn write_to(case: &Case, writer: &mut impl Write) -> Result<(), Self::Error> {
        let content = toml::to_string_pretty(case)?;
        writer.write_all(content.as_bytes())?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseFormat {
    Json,
    Toml,
}

impl CaseFormat {
    pub fn from_path(path: &Path) -> Result<Self, CaseIoError> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("json") => Ok(CaseFormat::Json),
            Some("toml") => Ok(CaseFormat::Toml),
            _ => Err(CaseIoError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            CaseFormat::Json => "json",
            CaseFormat::Toml => "toml",
        }
    }
}

/// Reads a case, choosing the syntax from the file extension.
pub fn read_case(path: &Path) -> Result<Case, CaseIoError> {
    match CaseFormat::from_path(path)? {
        CaseFormat::Json => JsonCaseFile::read_from_path(path),
        CaseFormat::Toml => TomlCaseFile::read_from_path(path),
    }
}

/// Writes a case, choosing the syntax from the file extension.
pub fn write_case(case: &Case, path: &Path) -> Result<(), CaseIoError> {
    match CaseFormat::from_path(path)? {
        CaseFormat::Json => JsonCaseFile::write_to_path(case, path),
        CaseFormat::Toml => TomlCaseFile::write_to_path(case, path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const TOML_CASE: &str = r#"
motifs = []
layers = [
    [{ type = "H" }, { type = "H", length = 11 }],
    [{ type = "E" }, { type = "E" }, { type = "E" }],
]

[configuration]
name = "toml-case"
default_x_e = 4.8
connectivity = "A1H.A2H.B3E.B2E.B1E"
"#;

    #[test]
    fn reads_toml_document_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("case.toml");
        fs::write(&path, TOML_CASE).unwrap();

        let case = read_case(&path).unwrap();
        assert_eq!(case.name(), "toml-case");
        assert_eq!(case.shape(), vec![2, 3]);
        assert_eq!(case.configuration().default_x_e, 4.8);
        assert_eq!(case.configuration().default_z, 10.0);
        assert_eq!(case.connectivity_count(), 1);
    }

    #[test]
    fn json_and_toml_round_trip_through_disk() {
        let dir = tempdir().unwrap();
        let case = Case::from_architecture("disk", "2h:13:10.4E").unwrap();

        for name in ["out.json", "out.toml"] {
            let path = dir.path().join(name);
            write_case(&case, &path).unwrap();
            let back = read_case(&path).unwrap();
            assert_eq!(back, case, "round trip through {name}");
        }
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = read_case(Path::new("case.yaml")).unwrap_err();
        assert!(matches!(err, CaseIoError::UnsupportedFormat(_)));
    }

    #[test]
    fn invalid_document_reports_validation_message() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{"configuration": {}, "layers": [], "motifs": []}"#).unwrap();

        let err = read_case(&path).unwrap_err();
        assert!(matches!(err, CaseIoError::Json(_)));
        assert!(err.to_string().contains("configuration.name"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempdir().unwrap();
        let err = read_case(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, CaseIoError::Io(_)));
    }
}
