//! CSV record archiving
//!
//! Records are any `serde::Serialize` type, written one per line.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use csv::WriterBuilder;
pub use csv::Writer;
use serde::Serialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An object used to write CSV archive files.
pub struct Archiver<W: Write = File> {
    writer: Writer<W>,

    num_records: usize,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur while archiving.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Cannot create the archive file: {0}")]
    CreateError(std::io::Error),

    #[error("Cannot serialise the record: {0}")]
    SerialiseError(csv::Error),

    #[error("Cannot flush the archive: {0}")]
    FlushError(std::io::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Archiver<File> {
    /// Create a new archive file at the given path.
    ///
    /// The file must not already exist, archives are never overwritten.
    pub fn create<P: AsRef<Path>>(path: P, has_headers: bool) -> Result<Self, ArchiveError> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(ArchiveError::CreateError)?;

        Ok(Self::from_writer(file, has_headers))
    }
}

impl<W: Write> Archiver<W> {
    /// Create an archiver writing into any writer.
    pub fn from_writer(writer: W, has_headers: bool) -> Self {
        let writer = WriterBuilder::new()
            .has_headers(has_headers)
            .from_writer(writer);

        Self {
            writer,
            num_records: 0,
        }
    }

    /// Serialise a record into the archive.
    pub fn serialise<T: Serialize>(&mut self, record: T) -> Result<(), ArchiveError> {
        self.writer
            .serialize(record)
            .map_err(ArchiveError::SerialiseError)?;
        self.num_records += 1;

        Ok(())
    }

    /// Number of records serialised so far.
    pub fn num_records(&self) -> usize {
        self.num_records
    }

    /// Flush the archive and return the underlying writer.
    pub fn finish(mut self) -> Result<W, ArchiveError> {
        self.writer.flush().map_err(ArchiveError::FlushError)?;
        self.writer
            .into_inner()
            .map_err(|e| {
                let err = e.error();
                ArchiveError::FlushError(std::io::Error::new(err.kind(), err.to_string()))
            })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Serialize)]
    struct Row(f64, u8, &'static str);

    #[test]
    fn test_headerless_archive() {
        let mut arch = Archiver::from_writer(Vec::new(), false);
        arch.serialise(Row(1.5, 0, "a")).unwrap();
        arch.serialise(Row(-2.0, 1, "b")).unwrap();
        assert_eq!(arch.num_records(), 2);

        let out = String::from_utf8(arch.finish().unwrap()).unwrap();
        assert_eq!(out, "1.5,0,a\n-2.0,1,b\n");
    }
}
