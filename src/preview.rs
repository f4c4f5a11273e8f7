//! Bounded previews: the in-job [`PreviewCollector`] and the read path that
//! previews an already consolidated file.

use std::{
    fs::{self, File},
    io::{self, BufReader},
    path::Path,
};

use anyhow::{Context, Result as AnyResult};
use encoding_rs::Encoding;
use log::info;
use serde::{Serialize, Serializer, ser::SerializeMap, ser::SerializeSeq};

use crate::{
    cli::PreviewArgs,
    error::{ConsolidateError, Result},
    io_utils,
    rows::RowSource,
    schema::{CanonicalHeader, ProjectedRow},
    table,
};

/// Keeps the first `cap` projected rows of a job.
#[derive(Debug, Clone)]
pub struct PreviewCollector {
    cap: usize,
    rows: Vec<ProjectedRow>,
}

impl PreviewCollector {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            rows: Vec::with_capacity(cap.min(64)),
        }
    }

    /// Retains `row` if there is room. Once full, the collector stays full.
    pub fn offer(&mut self, row: &ProjectedRow) -> bool {
        if self.is_full() {
            return false;
        }
        self.rows.push(row.clone());
        true
    }

    pub fn is_full(&self) -> bool {
        self.rows.len() >= self.cap
    }

    pub fn remaining(&self) -> usize {
        self.cap.saturating_sub(self.rows.len())
    }

    /// Appends rows staged by another collector, up to this collector's cap.
    pub fn absorb(&mut self, staged: PreviewCollector) {
        let room = self.remaining();
        self.rows.extend(staged.rows.into_iter().take(room));
    }

    pub fn rows(&self) -> &[ProjectedRow] {
        &self.rows
    }

    pub fn into_objects(self, header: Option<&CanonicalHeader>) -> RowObjects {
        RowObjects {
            columns: header.map(|h| h.columns().to_vec()).unwrap_or_default(),
            rows: self
                .rows
                .into_iter()
                .map(|row| row.values().to_vec())
                .collect(),
        }
    }
}

/// Rows that serialize as a JSON array of `{column: value}` objects, keys in
/// column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowObjects {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RowObjects {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(idx).map(String::as_str)
    }
}

struct RowObject<'a> {
    columns: &'a [String],
    values: &'a [String],
}

impl Serialize for RowObject<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, value) in self.columns.iter().zip(self.values) {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

impl Serialize for RowObjects {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for values in &self.rows {
            seq.serialize_element(&RowObject {
                columns: &self.columns,
                values,
            })?;
        }
        seq.end()
    }
}

/// Streams up to `limit` rows of `name` inside `dir`.
///
/// `name` must be a bare file name; anything resolving outside `dir` is
/// rejected. Rows are parsed exactly like archive entries are.
pub fn read_consolidated(
    dir: &Path,
    name: &str,
    limit: usize,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<RowObjects> {
    let invalid = || ConsolidateError::InvalidFileName {
        name: name.to_string(),
    };
    let read_failed = |source: io::Error| {
        if source.kind() == io::ErrorKind::NotFound {
            ConsolidateError::NotFound {
                name: name.to_string(),
            }
        } else {
            ConsolidateError::ReadFailed {
                name: name.to_string(),
                source,
            }
        }
    };

    let candidate = io_utils::resolve_within(dir, name).ok_or_else(invalid)?;
    let root = fs::canonicalize(dir).map_err(read_failed)?;
    let resolved = fs::canonicalize(&candidate).map_err(read_failed)?;
    if !resolved.starts_with(&root) {
        return Err(invalid());
    }
    if !resolved.is_file() {
        return Err(ConsolidateError::NotFound {
            name: name.to_string(),
        });
    }

    let file = File::open(&resolved).map_err(read_failed)?;
    let mut source = RowSource::open(name, BufReader::new(file), delimiter, encoding)?;
    let columns = source.headers().to_vec();
    let mut rows = Vec::new();
    while rows.len() < limit {
        let Some(raw) = source.next_row()? else {
            break;
        };
        rows.push(
            columns
                .iter()
                .map(|column| raw.get(column).cloned().unwrap_or_default())
                .collect(),
        );
    }
    Ok(RowObjects { columns, rows })
}

pub fn execute(args: &PreviewArgs) -> AnyResult<()> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let delimiter = args.delimiter.unwrap_or(io_utils::DEFAULT_CSV_DELIMITER);
    let objects = read_consolidated(&args.dir, &args.file, args.limit, delimiter, encoding)
        .with_context(|| format!("Previewing {:?} in {:?}", args.file, args.dir))?;
    if args.table {
        print!("{}", table::render_table(&objects, args.max_width));
    } else {
        let json = serde_json::to_string_pretty(&objects).context("Serializing preview rows")?;
        println!("{json}");
    }
    info!("Displayed {} row(s) from {:?}", objects.len(), args.file);
    Ok(())
}
