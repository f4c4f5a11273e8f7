//! Streaming row source over a single CSV entry.
//!
//! [`RowSource`] reads the header line when it is opened and then yields one
//! [`RawRow`] per data line, pulling bytes from the underlying reader only as
//! rows are requested. At most one record is buffered at a time.

use std::{
    collections::HashMap,
    io::{self, Read},
};

use csv::ByteRecord;
use encoding_rs::Encoding;

use crate::{
    error::{ConsolidateError, Result},
    io_utils,
};

/// One data line keyed by the entry's own header names.
///
/// Short lines leave trailing headers absent; fields beyond the header count
/// are discarded.
pub type RawRow = HashMap<String, String>;

pub struct RowSource<R: Read> {
    name: String,
    reader: csv::Reader<QuoteTracker<R>>,
    headers: Vec<String>,
    encoding: &'static Encoding,
    record: ByteRecord,
    rows_read: u64,
    finished: bool,
}

impl<R: Read> RowSource<R> {
    pub fn open(
        name: impl Into<String>,
        input: R,
        delimiter: u8,
        encoding: &'static Encoding,
    ) -> Result<Self> {
        let name = name.into();
        let mut reader = io_utils::open_csv_reader(QuoteTracker::new(input, delimiter), delimiter);
        let header_record = match reader.byte_headers() {
            Ok(record) => record.clone(),
            Err(err) => return Err(parse_error(&name, error_line(&err, 1), err)),
        };
        let headers = io_utils::decode_header_record(&header_record, encoding)
            .map_err(|err| parse_error(&name, 1, err))?;
        if headers.is_empty() {
            return Err(parse_error(&name, 1, "missing header row"));
        }
        Ok(Self {
            name,
            reader,
            headers,
            encoding,
            record: ByteRecord::new(),
            rows_read: 0,
            finished: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Header names in the order they appear in this entry.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    /// Returns the next row, `Ok(None)` at a clean end of input.
    ///
    /// After an error the source is exhausted and only returns `Ok(None)`.
    pub fn next_row(&mut self) -> Result<Option<RawRow>> {
        if self.finished {
            return Ok(None);
        }
        let has_record = match self.reader.read_byte_record(&mut self.record) {
            Ok(has_record) => has_record,
            Err(err) => {
                self.finished = true;
                let line = error_line(&err, self.reader.position().line());
                return Err(parse_error(&self.name, line, err));
            }
        };
        if !has_record {
            self.finished = true;
            if self.reader.get_ref().inside_quotes() {
                let line = self.reader.position().line();
                return Err(parse_error(&self.name, line, "unterminated quoted field"));
            }
            return Ok(None);
        }
        let line = self
            .record
            .position()
            .map(|pos| pos.line())
            .unwrap_or_else(|| self.reader.position().line());
        let fields = match io_utils::decode_record(&self.record, self.encoding) {
            Ok(fields) => fields,
            Err(err) => {
                self.finished = true;
                return Err(parse_error(&self.name, line, err));
            }
        };
        let mut row = RawRow::with_capacity(self.headers.len());
        for (header, value) in self.headers.iter().zip(fields) {
            row.insert(header.clone(), value);
        }
        self.rows_read += 1;
        Ok(Some(row))
    }
}

impl<R: Read> Iterator for RowSource<R> {
    type Item = Result<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row().transpose()
    }
}

fn error_line(err: &csv::Error, fallback: u64) -> u64 {
    err.position().map(|pos| pos.line()).unwrap_or(fallback)
}

fn parse_error(entry: &str, line: u64, reason: impl ToString) -> ConsolidateError {
    ConsolidateError::EntryParse {
        entry: entry.to_string(),
        line,
        reason: reason.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteState {
    FieldStart,
    Unquoted,
    Quoted,
    QuoteInQuoted,
}

/// Pass-through reader that follows CSV quoting as bytes flow by.
///
/// The `csv` reader closes an open quoted field silently at end of input;
/// this tracker lets the row source report that case as a parse error.
struct QuoteTracker<R> {
    inner: R,
    delimiter: u8,
    state: QuoteState,
}

impl<R> QuoteTracker<R> {
    fn new(inner: R, delimiter: u8) -> Self {
        Self {
            inner,
            delimiter,
            state: QuoteState::FieldStart,
        }
    }

    fn inside_quotes(&self) -> bool {
        self.state == QuoteState::Quoted
    }

    fn observe(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            let boundary = byte == self.delimiter || byte == b'\n' || byte == b'\r';
            self.state = match (self.state, byte) {
                (QuoteState::FieldStart, b'"') => QuoteState::Quoted,
                (QuoteState::Quoted, b'"') => QuoteState::QuoteInQuoted,
                (QuoteState::Quoted, _) => QuoteState::Quoted,
                (QuoteState::QuoteInQuoted, b'"') => QuoteState::Quoted,
                (_, _) if boundary => QuoteState::FieldStart,
                (_, _) => QuoteState::Unquoted,
            };
        }
    }
}

impl<R: Read> Read for QuoteTracker<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        self.observe(&buf[..read]);
        Ok(read)
    }
}
