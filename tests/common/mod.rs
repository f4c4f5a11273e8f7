#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};
use zip::{ZipWriter, write::SimpleFileOptions};

/// One member of a test archive.
pub enum Member<'a> {
    File(&'a str, &'a [u8]),
    Dir(&'a str),
}

pub fn csv_file<'a>(name: &'a str, contents: &'a str) -> Member<'a> {
    Member::File(name, contents.as_bytes())
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Builds a zip archive under the workspace from `members`, in order.
    pub fn write_archive(&self, name: &str, members: &[Member<'_>]) -> PathBuf {
        let path = self.join(name);
        let file = File::create(&path).expect("create archive");
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        for member in members {
            match member {
                Member::File(entry, bytes) => {
                    zip.start_file(*entry, options).expect("start entry");
                    zip.write_all(bytes).expect("write entry");
                }
                Member::Dir(entry) => {
                    zip.add_directory(*entry, options).expect("add directory");
                }
            }
        }
        zip.finish().expect("finish archive");
        path
    }

    /// Names of everything directly under `dir` relative to the workspace.
    pub fn listing(&self, dir: &str) -> Vec<String> {
        let mut names = fs::read_dir(self.join(dir))
            .expect("read dir")
            .map(|entry| entry.expect("dir entry").file_name().to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        names.sort();
        names
    }
}

/// Parses a consolidated CSV into its header and rows.
pub fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .expect("open consolidated csv");
    let headers = reader
        .headers()
        .expect("headers")
        .iter()
        .map(str::to_string)
        .collect();
    let rows = reader
        .records()
        .map(|record| {
            record
                .expect("record")
                .iter()
                .map(str::to_string)
                .collect()
        })
        .collect();
    (headers, rows)
}
