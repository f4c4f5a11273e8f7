//! I/O helpers shared by the pipeline and the consolidated-file read path.
//!
//! - **Encoding**: input decoding via `encoding_rs`, defaulting to UTF-8.
//! - **Reader/writer construction**: every CSV reader and writer in the crate
//!   is built here so the pipeline and the read path agree on dialect.
//! - **Path resolution**: file names handed to the read path are confined to
//!   the output directory.

use std::{
    borrow::Cow,
    io::{Read, Write},
    path::{Component, Path, PathBuf},
};

use anyhow::{Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

/// Rows may be shorter or longer than the header line; the row source decides
/// what to do with them.
pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn open_csv_writer<W>(writer: W, delimiter: u8) -> csv::Writer<W>
where
    W: Write,
{
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true)
        .flexible(false);
    builder.from_writer(writer)
}

/// Decodes one field exactly as `encoding`; byte-order marks are not sniffed.
pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(Cow::into_owned)
        .ok_or_else(|| {
            anyhow!(
                "Failed to decode text with encoding {}",
                encoding.name()
            )
        })
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

/// Like [`decode_record`], but drops a byte-order mark matching `encoding`
/// from the first field.
pub fn decode_header_record(
    record: &csv::ByteRecord,
    encoding: &'static Encoding,
) -> Result<Vec<String>> {
    let mut fields = record.iter();
    let Some(first) = fields.next() else {
        return Ok(Vec::new());
    };
    let (text, had_errors) = encoding.decode_with_bom_removal(first);
    if had_errors {
        return Err(anyhow!(
            "Failed to decode header with encoding {}",
            encoding.name()
        ));
    }
    std::iter::once(Ok(text.into_owned()))
        .chain(fields.map(|field| decode_bytes(field, encoding)))
        .collect()
}

/// Joins `name` onto `dir` only when `name` is a single plain path component.
///
/// Anything that could step outside `dir` (separators, `..`, roots, drive
/// prefixes) yields `None`.
pub fn resolve_within(dir: &Path, name: &str) -> Option<PathBuf> {
    if name.is_empty() || name.contains(['/', '\\', '\0']) {
        return None;
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) => Some(dir.join(part)),
        _ => None,
    }
}

pub fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
