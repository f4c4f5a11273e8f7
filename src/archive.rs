//! Zip archive access: opening the container and listing its CSV entries.

use std::{
    io::{Read, Seek},
    path::Path,
};

use log::debug;
use zip::ZipArchive;

use crate::error::{ConsolidateError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Position in the archive's central directory.
    pub index: usize,
    pub name: String,
}

pub fn open_archive<R: Read + Seek>(reader: R, label: &Path) -> Result<ZipArchive<R>> {
    ZipArchive::new(reader).map_err(|err| ConsolidateError::archive_open(label, err))
}

/// Regular-file entries whose name ends in `.csv` (any case), in archive order.
pub fn csv_entries<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    label: &Path,
) -> Result<Vec<ArchiveEntry>> {
    let mut entries = Vec::new();
    for index in 0..archive.len() {
        let file = archive
            .by_index_raw(index)
            .map_err(|err| ConsolidateError::archive_open(label, err))?;
        if file.is_file() && is_csv_name(file.name()) {
            entries.push(ArchiveEntry {
                index,
                name: file.name().to_string(),
            });
        } else {
            debug!("Ignoring archive entry '{}'", file.name());
        }
    }
    Ok(entries)
}

pub fn is_csv_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() >= 4 && bytes[bytes.len() - 4..].eq_ignore_ascii_case(b".csv")
}
