//! Dataset, its processing lifecycle and per-dataset error codes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::file_record::{FileKind, FileRecord};
use crate::record::DatasetRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetStatus {
    Queued,
    Processing,
    Ready,
    Error,
}

impl DatasetStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DatasetStatus::Queued => "QUEUED",
            DatasetStatus::Processing => "PROCESSING",
            DatasetStatus::Ready => "READY",
            DatasetStatus::Error => "ERROR",
        }
    }
}

/// Lifecycle states in forward order. The derived ordering is the
/// processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProcessingState {
    Queued,
    SetUp,
    ReadyToDownload,
    Downloading,
    ReadyToConvert,
    Converting,
    ReadyToCompress,
    Compressing,
    Wait,
}

impl ProcessingState {
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessingState::Queued => "Queued",
            ProcessingState::SetUp => "Set up",
            ProcessingState::ReadyToDownload => "Ready to download",
            ProcessingState::Downloading => "Downloading",
            ProcessingState::ReadyToConvert => "Ready to convert",
            ProcessingState::Converting => "Converting",
            ProcessingState::ReadyToCompress => "Ready to compress",
            ProcessingState::Compressing => "Compressing",
            ProcessingState::Wait => "Wait",
        }
    }
}

/// Why a dataset stopped with `status=ERROR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    MissingLocation,
    InvalidLocation,
    CannotCreateLocation,
    LocationMissing,
    CannotFetchPXRecord,
    CannotWritePXRecord,
    PXRecordMissing,
    CannotParsePXJSON,
    CannotFindFullDatasetLinks,
    CannotFindFtpLocation,
    CannotListFtpLocation,
    NoRawFilesFound,
    FailedFilenameMatch,
    FailedFileRootMatch,
    MissingMSRunFiles,
    FileVanished,
    ConversionFailed,
    MissingMzmlFiles,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MissingLocation => "MissingLocation",
            ErrorCode::InvalidLocation => "InvalidLocation",
            ErrorCode::CannotCreateLocation => "CannotCreateLocation",
            ErrorCode::LocationMissing => "LocationMissing",
            ErrorCode::CannotFetchPXRecord => "CannotFetchPXRecord",
            ErrorCode::CannotWritePXRecord => "CannotWritePXRecord",
            ErrorCode::PXRecordMissing => "PXRecordMissing",
            ErrorCode::CannotParsePXJSON => "CannotParsePXJSON",
            ErrorCode::CannotFindFullDatasetLinks => "CannotFindFullDatasetLinks",
            ErrorCode::CannotFindFtpLocation => "CannotFindFtpLocation",
            ErrorCode::CannotListFtpLocation => "CannotListFtpLocation",
            ErrorCode::NoRawFilesFound => "NoRawFilesFound",
            ErrorCode::FailedFilenameMatch => "FailedFilenameMatch",
            ErrorCode::FailedFileRootMatch => "FailedFileRootMatch",
            ErrorCode::MissingMSRunFiles => "MissingMSRunFiles",
            ErrorCode::FileVanished => "FileVanished",
            ErrorCode::ConversionFailed => "ConversionFailed",
            ErrorCode::MissingMzmlFiles => "MissingMzmlFiles",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One MS run: the raw file and the files derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct MsRun {
    pub raw_file: FileRecord,
    pub mzml_file: Option<FileRecord>,
    pub mzml_gz_file: Option<FileRecord>,
}

impl MsRun {
    pub fn new(raw_file: FileRecord) -> Self {
        Self {
            raw_file,
            mzml_file: None,
            mzml_gz_file: None,
        }
    }

    /// True once the converted or the compressed file is ready and still
    /// on disk.
    pub fn is_converted(&self) -> bool {
        [&self.mzml_gz_file, &self.mzml_file]
            .into_iter()
            .flatten()
            .any(|r| r.is_ready() && r.local_size().is_some())
    }
}

#[derive(Debug, Clone, Default)]
pub struct DatasetMetadata {
    pub location: Option<PathBuf>,
    pub record: Option<DatasetRecord>,
    pub ftp_location: Option<String>,
    pub manifest: Option<FileRecord>,
    pub ms_runs: BTreeMap<String, MsRun>,
}

#[derive(Debug, Clone)]
pub struct Dataset {
    pub dataset_id: String,
    pub status: DatasetStatus,
    processing_state: ProcessingState,
    /// Last error code; set together with `status=ERROR`.
    pub error: Option<ErrorCode>,
    pub metadata: DatasetMetadata,
}

impl Dataset {
    pub fn new(dataset_id: impl Into<String>, location: PathBuf) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            status: DatasetStatus::Queued,
            processing_state: ProcessingState::Queued,
            error: None,
            metadata: DatasetMetadata {
                location: Some(location),
                ..DatasetMetadata::default()
            },
        }
    }

    pub fn processing_state(&self) -> ProcessingState {
        self.processing_state
    }

    /// Move to `next`. Moving backwards is refused and returns false.
    pub fn set_state(&mut self, next: ProcessingState) -> bool {
        if next < self.processing_state {
            tracing::warn!(
                dataset = %self.dataset_id,
                from = self.processing_state.as_str(),
                to = next.as_str(),
                "refusing to move processing state backwards"
            );
            return false;
        }
        self.processing_state = next;
        true
    }

    pub fn fail(&mut self, code: ErrorCode) {
        self.status = DatasetStatus::Error;
        self.error = Some(code);
    }

    pub fn is_failed(&self) -> bool {
        self.status == DatasetStatus::Error
    }

    /// Directory that receives the record and all data files.
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.metadata.location.as_deref().map(|l| l.join("data"))
    }

    pub fn file(&self, kind: FileKind, fileroot: &str) -> Option<&FileRecord> {
        match kind {
            FileKind::Manifest => self.metadata.manifest.as_ref(),
            FileKind::Raw => self.metadata.ms_runs.get(fileroot).map(|r| &r.raw_file),
            FileKind::Mzml => self
                .metadata
                .ms_runs
                .get(fileroot)
                .and_then(|r| r.mzml_file.as_ref()),
            FileKind::MzmlGz => self
                .metadata
                .ms_runs
                .get(fileroot)
                .and_then(|r| r.mzml_gz_file.as_ref()),
        }
    }

    pub fn file_mut(&mut self, kind: FileKind, fileroot: &str) -> Option<&mut FileRecord> {
        match kind {
            FileKind::Manifest => self.metadata.manifest.as_mut(),
            FileKind::Raw => self
                .metadata
                .ms_runs
                .get_mut(fileroot)
                .map(|r| &mut r.raw_file),
            FileKind::Mzml => self
                .metadata
                .ms_runs
                .get_mut(fileroot)
                .and_then(|r| r.mzml_file.as_mut()),
            FileKind::MzmlGz => self
                .metadata
                .ms_runs
                .get_mut(fileroot)
                .and_then(|r| r.mzml_gz_file.as_mut()),
        }
    }

    /// Number of tracked MS runs.
    pub fn n_files(&self) -> usize {
        self.metadata.ms_runs.len()
    }

    /// Location check: must exist and its last component must be the
    /// dataset id.
    pub fn location_matches_id(location: &Path, dataset_id: &str) -> bool {
        location
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n == dataset_id)
    }
}
