//! Error taxonomy for consolidation jobs and the consolidated-file read path.
//!
//! Job-level variants ([`ConsolidateError::ArchiveOpen`],
//! [`ConsolidateError::EmptyArchive`], [`ConsolidateError::WriteFinalize`],
//! [`ConsolidateError::Cancelled`]) abort the job and guarantee nothing is left
//! at the published output path. [`ConsolidateError::EntryParse`] is absorbed
//! by the pipeline: the entry is skipped and the job continues.

use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsolidateError {
    #[error("Failed to open archive {path:?}: {reason}")]
    ArchiveOpen { path: PathBuf, reason: String },

    #[error("Archive {path:?} does not contain any .csv entries")]
    EmptyArchive { path: PathBuf },

    #[error("Entry '{entry}' could not be parsed at line {line}: {reason}")]
    EntryParse {
        entry: String,
        line: u64,
        reason: String,
    },

    #[error("Failed to finalize consolidated output {path:?}: {source}")]
    WriteFinalize {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid consolidation settings: {reason}")]
    InvalidConfig { reason: String },

    #[error("Consolidation of {path:?} was cancelled")]
    Cancelled { path: PathBuf },

    #[error("Consolidated file '{name}' not found")]
    NotFound { name: String },

    #[error("'{name}' is not a valid consolidated file name")]
    InvalidFileName { name: String },

    #[error("Failed to read consolidated file '{name}': {source}")]
    ReadFailed {
        name: String,
        #[source]
        source: io::Error,
    },
}

impl ConsolidateError {
    pub(crate) fn archive_open(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ConsolidateError::ArchiveOpen {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn write_finalize(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ConsolidateError::WriteFinalize {
            path: path.into(),
            source,
        }
    }

    /// True for failures that end the whole job rather than a single entry.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ConsolidateError::EntryParse { .. })
    }
}

pub type Result<T, E = ConsolidateError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_parse_is_the_only_recoverable_kind() {
        let entry = ConsolidateError::EntryParse {
            entry: "a.csv".into(),
            line: 3,
            reason: "unterminated quoted field".into(),
        };
        assert!(!entry.is_fatal());
        assert!(ConsolidateError::EmptyArchive { path: "x.zip".into() }.is_fatal());
        assert!(
            ConsolidateError::write_finalize("out.csv", io::Error::other("disk full")).is_fatal()
        );
    }

    #[test]
    fn messages_name_the_failing_entry() {
        let err = ConsolidateError::EntryParse {
            entry: "exports/day2.csv".into(),
            line: 17,
            reason: "invalid UTF-8".into(),
        };
        let message = err.to_string();
        assert!(message.contains("exports/day2.csv"));
        assert!(message.contains("line 17"));
    }
}
