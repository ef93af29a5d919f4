use crate::core::models::case::Case;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Defines the interface for reading and writing persisted case documents.
///
/// Implementors handle one concrete document syntax; the nested layout of the
/// document (`configuration`, `layers`, `motifs`, and the optional `topology`,
/// `coordinates` and `metadata` sections) is shared by all of them.
pub trait CaseFile {
    /// The error type for I/O and parsing operations.
    type Error: Error + From<io::Error>;

    /// Reads and validates a case from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if the content cannot be parsed or does not describe a valid case.
    fn read_from(reader: &mut impl BufRead) -> Result<Case, Self::Error>;

    /// Writes a case to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    fn write_to(case: &Case, writer: &mut impl Write) -> Result<(), Self::Error>;

    /// Reads a case from a file path.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Case, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    /// Writes a case to a file path, replacing any existing file.
    fn write_to_path<P: AsRef<Path>>(case: &Case, path: P) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(case, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
