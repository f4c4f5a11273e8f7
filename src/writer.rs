//! Streaming sink for the consolidated CSV.
//!
//! Output is written to a hidden temporary file next to the destination and
//! renamed into place by [`ConsolidatedWriter::finish`]. Until then nothing
//! exists at the published path, and dropping the writer discards the
//! partial file.
//!
//! Rows of the entry currently being read go to an [`EntrySpool`] first and
//! are copied into the output only once that entry has been read cleanly.

use std::{
    fs::{self, File},
    io::{self, BufWriter, Seek, SeekFrom},
    path::{Path, PathBuf},
};

use csv::ByteRecord;
use log::debug;
use tempfile::NamedTempFile;

use crate::{
    error::{ConsolidateError, Result},
    io_utils,
    schema::{CanonicalHeader, ProjectedRow},
};

pub struct ConsolidatedWriter {
    path: PathBuf,
    staging_dir: PathBuf,
    delimiter: u8,
    writer: csv::Writer<BufWriter<NamedTempFile>>,
    header_written: bool,
    rows_written: u64,
}

impl ConsolidatedWriter {
    pub fn create(path: &Path, delimiter: u8) -> Result<Self> {
        let staging_dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let fail = |err: io::Error| ConsolidateError::write_finalize(path, err);
        fs::create_dir_all(&staging_dir).map_err(fail)?;
        let temp = tempfile::Builder::new()
            .prefix(".consolidate-")
            .suffix(".tmp")
            .tempfile_in(&staging_dir)
            .map_err(fail)?;
        debug!("Staging consolidated output in {:?}", temp.path());
        Ok(Self {
            path: path.to_path_buf(),
            staging_dir,
            delimiter,
            writer: io_utils::open_csv_writer(BufWriter::new(temp), delimiter),
            header_written: false,
            rows_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Writes the canonical header. Only the first call has any effect.
    pub fn write_header(&mut self, header: &CanonicalHeader) -> Result<()> {
        if self.header_written {
            return Ok(());
        }
        self.header_written = true;
        if header.is_empty() {
            return Ok(());
        }
        self.writer
            .write_record(header.columns())
            .map_err(|err| self.fail(csv_to_io(err)))
    }

    pub fn open_spool(&self) -> Result<EntrySpool> {
        let file = tempfile::tempfile_in(&self.staging_dir).map_err(|err| self.fail(err))?;
        Ok(EntrySpool {
            writer: io_utils::open_csv_writer(BufWriter::new(file), self.delimiter),
            rows: 0,
        })
    }

    /// Copies every row staged in `spool` into the output, in order.
    pub fn commit(&mut self, spool: EntrySpool) -> Result<u64> {
        let staged = spool.rows;
        let mut file = spool
            .writer
            .into_inner()
            .map_err(|err| self.fail(unwrap_error(&err)))?
            .into_inner()
            .map_err(|err| self.fail(err.into_error()))?;
        file.seek(SeekFrom::Start(0)).map_err(|err| self.fail(err))?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .delimiter(self.delimiter)
            .from_reader(io::BufReader::new(file));
        let mut record = ByteRecord::new();
        while reader
            .read_byte_record(&mut record)
            .map_err(|err| self.fail(csv_to_io(err)))?
        {
            self.writer
                .write_byte_record(&record)
                .map_err(|err| self.fail(csv_to_io(err)))?;
        }
        self.rows_written += staged;
        Ok(staged)
    }

    /// Flushes, syncs, and moves the output to its published path.
    pub fn finish(self) -> Result<PathBuf> {
        let path = self.path;
        let fail = |err: io::Error| ConsolidateError::write_finalize(&path, err);
        let temp = self
            .writer
            .into_inner()
            .map_err(|err| fail(unwrap_error(&err)))?
            .into_inner()
            .map_err(|err| fail(err.into_error()))?;
        temp.as_file().sync_all().map_err(fail)?;
        temp.persist(&path).map_err(|err| fail(err.error))?;
        debug!("Published {} row(s) to {:?}", self.rows_written, path);
        Ok(path)
    }

    fn fail(&self, err: io::Error) -> ConsolidateError {
        ConsolidateError::write_finalize(&self.path, err)
    }
}

/// Anonymous scratch file holding one entry's projected rows.
pub struct EntrySpool {
    writer: csv::Writer<BufWriter<File>>,
    rows: u64,
}

impl EntrySpool {
    pub fn write_row(&mut self, row: &ProjectedRow) -> io::Result<()> {
        if row.values().is_empty() {
            return Ok(());
        }
        self.writer.write_record(row.values()).map_err(csv_to_io)?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }
}

fn unwrap_error<W>(err: &csv::IntoInnerError<W>) -> io::Error {
    io::Error::new(err.error().kind(), err.error().to_string())
}

fn csv_to_io(err: csv::Error) -> io::Error {
    match err.into_kind() {
        csv::ErrorKind::Io(err) => err,
        other => io::Error::other(format!("{other:?}")),
    }
}
