//! Abstract work items emitted by the dataset state machine.

use std::path::PathBuf;

use super::file_record::{FileRecord, FileRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskCommand {
    DownloadFile,
    ConvertToMzml,
}

impl TaskCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskCommand::DownloadFile => "download_file",
            TaskCommand::ConvertToMzml => "convert_to_mzml",
        }
    }
}

/// A task refers to the file it produces via [`FileRef`] and carries a
/// snapshot of that file's record taken when the task was emitted.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub command: TaskCommand,
    pub file: FileRef,
    pub file_metadata: FileRecord,
    /// Source file for conversions (the raw file's full path).
    pub input: Option<PathBuf>,
}

impl Task {
    pub fn download(file: FileRef, file_metadata: FileRecord) -> Self {
        Self {
            command: TaskCommand::DownloadFile,
            file,
            file_metadata,
            input: None,
        }
    }

    pub fn convert(file: FileRef, file_metadata: FileRecord, input: PathBuf) -> Self {
        Self {
            command: TaskCommand::ConvertToMzml,
            file,
            file_metadata,
            input: Some(input),
        }
    }
}
