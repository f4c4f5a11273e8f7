//! Job orchestration: archive → entries → rows → {aggregator, preview, output}.
//!
//! A job walks `Idle → ArchiveOpened → PerEntry(i) → Finalizing → Done`, or
//! ends in `Failed`. Entries are drained one at a time. An entry that fails
//! to parse is skipped as a whole; its rows, preview rows, and distinct values
//! are staged and thrown away. Any other failure ends the job and leaves
//! nothing at the output path.

use std::{
    fmt,
    fs::{self, File},
    io::{BufReader, Read, Seek},
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use encoding_rs::Encoding;
use log::{debug, error, info, warn};
use serde::Serialize;
use zip::ZipArchive;

use crate::{
    archive::{self, ArchiveEntry},
    config::ConsolidateConfig,
    distinct::{DistinctAggregator, DistinctValues},
    error::{ConsolidateError, Result},
    preview::{PreviewCollector, RowObjects},
    rows::RowSource,
    schema::{self, SchemaReconciler},
    writer::ConsolidatedWriter,
};

/// Cooperative cancellation shared between a job and whoever may abort it.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    ArchiveOpened,
    PerEntry(usize),
    Finalizing,
    Done,
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Idle => f.write_str("idle"),
            JobState::ArchiveOpened => f.write_str("archive-opened"),
            JobState::PerEntry(idx) => write!(f, "entry #{}", idx + 1),
            JobState::Finalizing => f.write_str("finalizing"),
            JobState::Done => f.write_str("done"),
            JobState::Failed => f.write_str("failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEntry {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    pub preview: RowObjects,
    pub distinct: DistinctValues,
    pub consolidated_path: PathBuf,
    pub rows_written: u64,
    pub entries_processed: usize,
    pub skipped_entries: Vec<SkippedEntry>,
}

/// Consolidates the archive stored at `archive_path` into `output`.
///
/// The archive handle is released before returning, and the archive file is
/// deleted afterwards when `config.remove_source` is set, whatever the
/// outcome.
pub fn consolidate_file(
    archive_path: &Path,
    output: &Path,
    config: &ConsolidateConfig,
    cancel: &CancelFlag,
) -> Result<JobResult> {
    let outcome = File::open(archive_path)
        .map_err(|err| ConsolidateError::archive_open(archive_path, err))
        .and_then(|file| {
            consolidate(BufReader::new(file), archive_path, output, config, cancel)
        });
    if config.remove_source {
        match fs::remove_file(archive_path) {
            Ok(()) => debug!("Removed source archive {archive_path:?}"),
            Err(err) => warn!("Failed to remove source archive {archive_path:?}: {err}"),
        }
    }
    outcome
}

/// Consolidates an archive read from `reader`; `label` names it in errors and
/// logs.
pub fn consolidate<R: Read + Seek>(
    reader: R,
    label: &Path,
    output: &Path,
    config: &ConsolidateConfig,
    cancel: &CancelFlag,
) -> Result<JobResult> {
    let encoding = config
        .encoding()
        .map_err(|err| ConsolidateError::InvalidConfig {
            reason: err.to_string(),
        })?;
    let mut job = Job::new(label, config, encoding, cancel);
    info!("Consolidating {label:?} -> {output:?}");
    match job.run(reader, output) {
        Ok(result) => {
            job.transition(JobState::Done);
            info!(
                "Wrote {} row(s) from {} entry(ies) to {:?} ({} skipped)",
                result.rows_written,
                result.entries_processed,
                result.consolidated_path,
                result.skipped_entries.len()
            );
            Ok(result)
        }
        Err(err) => {
            job.transition(JobState::Failed);
            error!("Consolidation of {label:?} failed: {err}");
            Err(err)
        }
    }
}

struct Job<'a> {
    label: &'a Path,
    config: &'a ConsolidateConfig,
    encoding: &'static Encoding,
    cancel: &'a CancelFlag,
    state: JobState,
    reconciler: SchemaReconciler,
    distinct: DistinctAggregator,
    preview: PreviewCollector,
    skipped: Vec<SkippedEntry>,
}

impl<'a> Job<'a> {
    fn new(
        label: &'a Path,
        config: &'a ConsolidateConfig,
        encoding: &'static Encoding,
        cancel: &'a CancelFlag,
    ) -> Self {
        Self {
            label,
            config,
            encoding,
            cancel,
            state: JobState::Idle,
            reconciler: SchemaReconciler::new(&config.drop_columns),
            distinct: DistinctAggregator::new(),
            preview: PreviewCollector::new(config.preview_rows),
            skipped: Vec::new(),
        }
    }

    fn transition(&mut self, next: JobState) {
        debug!("Job {:?}: {} -> {}", self.label, self.state, next);
        self.state = next;
    }

    fn run<R: Read + Seek>(&mut self, reader: R, output: &Path) -> Result<JobResult> {
        let mut archive = archive::open_archive(reader, self.label)?;
        self.transition(JobState::ArchiveOpened);

        let entries = archive::csv_entries(&mut archive, self.label)?;
        if entries.is_empty() {
            return Err(ConsolidateError::EmptyArchive {
                path: self.label.to_path_buf(),
            });
        }
        info!("Found {} CSV entry(ies) in {:?}", entries.len(), self.label);

        let mut writer = ConsolidatedWriter::create(output, self.config.delimiter)?;
        for (idx, entry) in entries.iter().enumerate() {
            self.transition(JobState::PerEntry(idx));
            self.check_cancelled()?;
            match self.consume_entry(&mut archive, entry, &mut writer) {
                Ok(rows) => debug!("Merged {rows} row(s) from '{}'", entry.name),
                Err(err) if !err.is_fatal() => {
                    warn!("Skipping entry '{}': {err}", entry.name);
                    self.skipped.push(SkippedEntry {
                        name: entry.name.clone(),
                        reason: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        self.transition(JobState::Finalizing);
        let rows_written = writer.rows_written();
        let consolidated_path = writer.finish()?;
        let header = self.reconciler.canonical().cloned();
        let preview = std::mem::replace(&mut self.preview, PreviewCollector::new(0));
        Ok(JobResult {
            preview: preview.into_objects(header.as_ref()),
            distinct: self.distinct.finish(self.config.distinct_cap),
            consolidated_path,
            rows_written,
            entries_processed: entries.len() - self.skipped.len(),
            skipped_entries: std::mem::take(&mut self.skipped),
        })
    }

    /// Drains one entry into a spool and merges it only if it parses cleanly.
    fn consume_entry<R: Read + Seek>(
        &mut self,
        archive: &mut ZipArchive<R>,
        entry: &ArchiveEntry,
        writer: &mut ConsolidatedWriter,
    ) -> Result<u64> {
        let file = archive
            .by_index(entry.index)
            .map_err(|err| ConsolidateError::EntryParse {
                entry: entry.name.clone(),
                line: 0,
                reason: err.to_string(),
            })?;
        let mut source = RowSource::open(
            entry.name.as_str(),
            file,
            self.config.delimiter,
            self.encoding,
        )?;

        let (header, frozen_now) = self.reconciler.observe(source.headers());
        if frozen_now {
            info!(
                "Canonical header from '{}': {} column(s)",
                entry.name,
                header.len()
            );
            writer.write_header(header)?;
        }

        let mut spool = writer.open_spool()?;
        let mut staged_preview = PreviewCollector::new(self.preview.remaining());
        let mut staged_distinct = DistinctAggregator::new();
        while let Some(raw) = source.next_row()? {
            if self.cancel.is_cancelled() {
                return Err(ConsolidateError::Cancelled {
                    path: self.label.to_path_buf(),
                });
            }
            let projected = schema::project(&raw, header);
            staged_distinct.ingest(&raw, &self.config.aliases);
            if !header.is_empty() {
                staged_preview.offer(&projected);
            }
            spool
                .write_row(&projected)
                .map_err(|err| ConsolidateError::write_finalize(writer.path(), err))?;
        }
        debug!(
            "Read {} row(s) from '{}'",
            source.rows_read(),
            source.name()
        );

        let rows = writer.commit(spool)?;
        self.preview.absorb(staged_preview);
        self.distinct.merge(staged_distinct);
        Ok(rows)
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(ConsolidateError::Cancelled {
                path: self.label.to_path_buf(),
            });
        }
        Ok(())
    }
}
