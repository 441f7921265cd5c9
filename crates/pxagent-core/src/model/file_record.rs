//! Download / conversion status of one file belonging to a dataset.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// Expected but no job has produced it yet.
    Todo,
    /// A job producing this file is running (download or conversion).
    Downloading,
    Ready,
    /// Retries are exhausted; the file could not be produced.
    Unavailable,
}

impl FileStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FileStatus::Todo => "TODO",
            FileStatus::Downloading => "DOWNLOADING",
            FileStatus::Ready => "READY",
            FileStatus::Unavailable => "UNAVAILABLE",
        }
    }
}

/// Which file of a dataset a [`FileRef`] points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FileKind {
    Manifest,
    Raw,
    Mzml,
    MzmlGz,
}

/// Identifies a FileRecord by dataset and fileroot instead of by pointer.
/// Resolved through the dataset processor when a job finishes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileRef {
    pub dataset_id: String,
    pub fileroot: String,
    pub kind: FileKind,
}

impl FileRef {
    pub fn new(dataset_id: impl Into<String>, fileroot: impl Into<String>, kind: FileKind) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            fileroot: fileroot.into(),
            kind,
        }
    }
}

impl std::fmt::Display for FileRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}:{:?}", self.dataset_id, self.fileroot, self.kind)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub status: FileStatus,
    pub fileroot: String,
    pub filename: String,
    pub full_path: PathBuf,
    /// Directory the file lives in (and the working directory of its job).
    pub location: PathBuf,
    /// Remote locator; `None` for files produced locally.
    pub uri: Option<String>,
    pub expected_size: Option<u64>,
    pub current_size: Option<u64>,
    pub is_complete: bool,
    pub filetype: String,
}

impl FileRecord {
    /// New `TODO` record for `filename` inside `location`.
    pub fn expected(
        location: &Path,
        fileroot: impl Into<String>,
        filename: impl Into<String>,
        filetype: impl Into<String>,
        uri: Option<String>,
    ) -> Self {
        let filename = filename.into();
        Self {
            status: FileStatus::Todo,
            fileroot: fileroot.into(),
            full_path: location.join(&filename),
            filename,
            location: location.to_path_buf(),
            uri,
            expected_size: None,
            current_size: None,
            is_complete: false,
            filetype: filetype.into(),
        }
    }

    pub fn with_expected_size(mut self, size: Option<u64>) -> Self {
        self.expected_size = size;
        self
    }

    pub fn is_ready(&self) -> bool {
        self.status == FileStatus::Ready
    }

    pub fn mark_ready(&mut self, size: u64) {
        self.status = FileStatus::Ready;
        self.is_complete = true;
        self.current_size = Some(size);
    }

    /// Size of the local file, if it exists.
    pub fn local_size(&self) -> Option<u64> {
        std::fs::metadata(&self.full_path).ok().map(|m| m.len())
    }

    /// True when the local file exists and its size matches the expected
    /// size. Without a known expected size the file cannot be trusted.
    pub fn local_copy_matches(&self) -> bool {
        match (self.expected_size, self.local_size()) {
            (Some(expected), Some(actual)) => expected == actual,
            _ => false,
        }
    }
}
