// CSV-directory storage for raw caches and exported artifacts.
//
// Table names map to paths under a root directory. A name may contain `/`
// (e.g. `QB/median_fp_by_age_...csv`); parent directories are created on
// write.

use agecurve_core::{Frame, TableSink, TableSource};
use serde::Serialize;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("JSON error writing {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------
// CsvDir
// ---------------------------------------------------------------------------

/// A directory of CSV files, usable as both a source and a sink.
#[derive(Debug, Clone)]
pub struct CsvDir {
    root: PathBuf,
}

impl CsvDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        CsvDir { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path backing the named table.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Serialize `value` as pretty JSON to `name` under the root.
    pub fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf, StorageError> {
        let path = self.path_for(name);
        let file = create_file(&path)?;
        serde_json::to_writer_pretty(file, value).map_err(|e| StorageError::Json {
            path: path.display().to_string(),
            source: e,
        })?;
        Ok(path)
    }
}

impl TableSource for CsvDir {
    type Error = StorageError;

    fn get(&self, name: &str) -> Result<Frame, StorageError> {
        let path = self.path_for(name);
        let file = std::fs::File::open(&path).map_err(|e| StorageError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        read_frame_from_reader(file).map_err(|e| StorageError::Csv {
            path: path.display().to_string(),
            source: e,
        })
    }
}

impl TableSink for CsvDir {
    type Error = StorageError;

    fn put(&mut self, name: &str, frame: &Frame) -> Result<(), StorageError> {
        let path = self.path_for(name);
        let file = create_file(&path)?;
        write_frame_to_writer(file, frame).map_err(|e| StorageError::Csv {
            path: path.display().to_string(),
            source: e,
        })
    }
}

// ---------------------------------------------------------------------------
// Reader/writer helpers (private, enable testing without temp files)
// ---------------------------------------------------------------------------

/// Rows are read flexibly; ragged rows are rejected later when the frame is
/// parsed into a table, with a message naming the player.
fn read_frame_from_reader<R: Read>(rdr: R) -> Result<Frame, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(rdr);
    let header = reader.headers()?.iter().map(str::to_string).collect();
    let mut frame = Frame::new(header);
    for record in reader.records() {
        frame.rows.push(record?.iter().map(str::to_string).collect());
    }
    Ok(frame)
}

fn write_frame_to_writer<W: Write>(wtr: W, frame: &Frame) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(wtr);
    writer.write_record(&frame.header)?;
    for row in &frame.rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn create_file(path: &Path) -> Result<std::fs::File, StorageError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StorageError::Io {
            path: parent.display().to_string(),
            source: e,
        })?;
    }
    std::fs::File::create(path).map_err(|e| StorageError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
