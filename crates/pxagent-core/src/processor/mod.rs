//! Dataset state machine.
//!
//! Each call to [`DatasetProcessor::advance`] does exactly one state's work
//! for a dataset: set up its directory and metadata record, enumerate and
//! download its files, then convert and verify them. Work that needs a
//! subprocess is emitted as [`Task`]s and picked up with
//! [`DatasetProcessor::take_tasks`].

mod conversion;
mod download;
mod setup;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::model::{Dataset, DatasetStatus, ErrorCode, FileRecord, FileRef, ProcessingState, Task};
use crate::remote::RemoteCatalog;
use crate::report::Report;

/// File name of the persisted dataset record inside `<location>/data`.
pub const RECORD_FILE: &str = "ProteomeXchange.json";
/// Manifest accompanying a dataset's raw files in its FTP location.
pub const MANIFEST_FILE: &str = "README.txt";
/// Extension of vendor raw files enumerated from an FTP listing.
pub const RAW_EXTENSION: &str = "raw";

/// Assess tolerates missing evidence and remediates; verify treats it as a
/// hard failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Assess,
    Verify,
}

impl Mode {
    /// States reached by doing remedial work are verified on the next step.
    pub fn for_state(state: ProcessingState) -> Self {
        match state {
            ProcessingState::SetUp
            | ProcessingState::Downloading
            | ProcessingState::Converting
            | ProcessingState::Compressing => Mode::Verify,
            _ => Mode::Assess,
        }
    }
}

/// Why a step stopped the dataset.
#[derive(Debug)]
pub(crate) struct StepFailure {
    pub code: ErrorCode,
    pub message: String,
}

pub(crate) fn fail(code: ErrorCode, message: impl Into<String>) -> StepFailure {
    StepFailure {
        code,
        message: message.into(),
    }
}

/// Result of one step: the state to move to.
pub(crate) type StepResult = Result<ProcessingState, StepFailure>;

/// Collaborators a step may use besides the dataset itself.
pub(crate) struct Step<'a> {
    pub catalog: &'a dyn RemoteCatalog,
    pub tasks: &'a mut Vec<Task>,
    pub report: &'a mut Report,
    pub mode: Mode,
}

pub struct DatasetProcessor {
    datasets: BTreeMap<String, Dataset>,
    data_path: PathBuf,
    catalog: Box<dyn RemoteCatalog>,
    tasks_todo: Vec<Task>,
}

impl DatasetProcessor {
    pub fn new(data_path: impl Into<PathBuf>, catalog: Box<dyn RemoteCatalog>) -> Self {
        Self {
            datasets: BTreeMap::new(),
            data_path: data_path.into(),
            catalog,
            tasks_todo: Vec::new(),
        }
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn dataset(&self, dataset_id: &str) -> Option<&Dataset> {
        self.datasets.get(dataset_id)
    }

    pub fn datasets(&self) -> impl Iterator<Item = &Dataset> {
        self.datasets.values()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks_todo
    }

    /// Track `dataset_id` under `<data_path>/<dataset_id>`. Returns false
    /// if it was already tracked.
    pub fn add_dataset(&mut self, dataset_id: &str, report: &mut Report) -> bool {
        if self.datasets.contains_key(dataset_id) {
            report.warning(format!("Dataset {} is already being processed", dataset_id));
            return false;
        }
        let location = self.data_path.join(dataset_id);
        report.info(format!(
            "Adding dataset {} with location {}",
            dataset_id,
            location.display()
        ));
        self.datasets
            .insert(dataset_id.to_string(), Dataset::new(dataset_id, location));
        true
    }

    /// Advance every tracked dataset one step.
    pub fn process(&mut self, report: &mut Report) {
        let ids: Vec<String> = self.datasets.keys().cloned().collect();
        for id in ids {
            self.advance(&id, report);
        }
    }

    /// Do one state's work for `dataset_id`. Failed and finished datasets
    /// are left untouched.
    pub fn advance(&mut self, dataset_id: &str, report: &mut Report) {
        let Some(ds) = self.datasets.get_mut(dataset_id) else {
            report.warning(format!("Dataset {} is not being processed", dataset_id));
            return;
        };
        if ds.is_failed() || ds.status == DatasetStatus::Ready {
            return;
        }

        let state = ds.processing_state();
        let mut step = Step {
            catalog: self.catalog.as_ref(),
            tasks: &mut self.tasks_todo,
            report,
            mode: Mode::for_state(state),
        };
        ds.status = DatasetStatus::Processing;
        let result = match state {
            ProcessingState::Queued | ProcessingState::SetUp => setup::assess_setup(ds, &mut step),
            ProcessingState::ReadyToDownload | ProcessingState::Downloading => {
                download::assess_download(ds, &mut step)
            }
            ProcessingState::ReadyToConvert | ProcessingState::Converting => {
                conversion::assess_conversion(ds, &mut step)
            }
            ProcessingState::ReadyToCompress | ProcessingState::Compressing => {
                conversion::assess_compression(ds, &mut step)
            }
            ProcessingState::Wait => Ok(ProcessingState::Wait),
        };

        match result {
            Ok(next) => {
                if next != state {
                    step.report.info(format!(
                        "Dataset {}: {} -> {}",
                        ds.dataset_id,
                        state.as_str(),
                        next.as_str()
                    ));
                }
                ds.set_state(next);
                if next == ProcessingState::Wait {
                    ds.status = DatasetStatus::Ready;
                }
            }
            Err(StepFailure { code, message }) => {
                step.report
                    .error(code.as_str(), format!("Dataset {}: {}", ds.dataset_id, message));
                ds.fail(code);
            }
        }
    }

    /// Hand over the accumulated tasks and clear the list.
    pub fn take_tasks(&mut self) -> Vec<Task> {
        std::mem::take(&mut self.tasks_todo)
    }

    /// Resolve a file reference to the record it names.
    pub fn file_mut(&mut self, file: &FileRef) -> Option<&mut FileRecord> {
        self.datasets
            .get_mut(&file.dataset_id)?
            .file_mut(file.kind, &file.fileroot)
    }

    /// One line per dataset plus the number of pending tasks.
    pub fn show(&self) -> String {
        let mut buffer = format!("DatasetProcessor: {} datasets\n", self.datasets.len());
        for ds in self.datasets.values() {
            buffer.push_str(&format!(
                "      {} - {} - {} - {} files",
                ds.dataset_id,
                ds.status.as_str(),
                ds.processing_state().as_str(),
                ds.n_files()
            ));
            if let Some(code) = ds.error {
                buffer.push_str(&format!(" - {}", code));
            }
            buffer.push('\n');
        }
        buffer.push_str(&format!("  pending tasks: {}\n", self.tasks_todo.len()));
        buffer
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::model::{FileKind, TaskCommand};

    fn processor(dir: &Path, catalog: FakeCatalog) -> DatasetProcessor {
        DatasetProcessor::new(dir, Box::new(catalog))
    }

    #[test]
    fn mode_follows_state() {
        assert_eq!(Mode::for_state(ProcessingState::Queued), Mode::Assess);
        assert_eq!(Mode::for_state(ProcessingState::SetUp), Mode::Verify);
        assert_eq!(Mode::for_state(ProcessingState::ReadyToDownload), Mode::Assess);
        assert_eq!(Mode::for_state(ProcessingState::Downloading), Mode::Verify);
        assert_eq!(Mode::for_state(ProcessingState::Compressing), Mode::Verify);
        assert_eq!(Mode::for_state(ProcessingState::Wait), Mode::Assess);
    }

    #[test]
    fn adding_twice_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = processor(dir.path(), FakeCatalog::default());
        let mut report = Report::new();
        assert!(p.add_dataset("PXD000001", &mut report));
        assert!(!p.add_dataset("PXD000001", &mut report));
        assert_eq!(p.datasets().count(), 1);
        assert_eq!(report.n_warnings(), 1);
    }

    #[test]
    fn full_run_reaches_wait() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = FakeCatalog::default()
            .with_record("PXD000001", &record_without_files())
            .with_listing(FTP, &[("a.raw", 3), ("b.RAW", 3), ("notes.txt", 10)]);
        let mut p = processor(dir.path(), catalog);
        let mut report = Report::new();
        p.add_dataset("PXD000001", &mut report);

        // Queued -> SetUp (directory created, record fetched).
        p.process(&mut report);
        let ds = p.dataset("PXD000001").unwrap();
        assert_eq!(ds.processing_state(), ProcessingState::SetUp);
        let data = dir.path().join("PXD000001/data");
        assert!(data.join(RECORD_FILE).is_file());

        // SetUp -> ReadyToDownload.
        p.process(&mut report);
        assert_eq!(
            p.dataset("PXD000001").unwrap().processing_state(),
            ProcessingState::ReadyToDownload
        );

        // Enumerate: manifest plus two raw files to download.
        p.process(&mut report);
        assert_eq!(
            p.dataset("PXD000001").unwrap().processing_state(),
            ProcessingState::Downloading
        );
        let tasks = p.take_tasks();
        assert_eq!(tasks.len(), 3);
        assert!(tasks.iter().all(|t| t.command == TaskCommand::DownloadFile));
        assert!(p.tasks().is_empty());

        // Pretend the downloads finished.
        for task in &tasks {
            std::fs::write(&task.file_metadata.full_path, b"abc").unwrap();
            p.file_mut(&task.file).unwrap().mark_ready(3);
        }
        p.process(&mut report);
        assert_eq!(
            p.dataset("PXD000001").unwrap().processing_state(),
            ProcessingState::ReadyToConvert
        );

        // One conversion per raw file.
        p.process(&mut report);
        let tasks = p.take_tasks();
        assert_eq!(tasks.len(), 2);
        assert!(tasks.iter().all(|t| t.command == TaskCommand::ConvertToMzml));
        for task in &tasks {
            assert_eq!(task.file.kind, FileKind::Mzml);
            std::fs::write(&task.file_metadata.full_path, b"<mzML/>").unwrap();
            p.file_mut(&task.file).unwrap().mark_ready(7);
        }

        // Converting -> ReadyToCompress -> Compressing -> Wait.
        for _ in 0..3 {
            p.process(&mut report);
        }
        let ds = p.dataset("PXD000001").unwrap();
        assert_eq!(ds.processing_state(), ProcessingState::Wait);
        assert_eq!(ds.status, DatasetStatus::Ready);
        assert_eq!(report.n_errors(), 0);

        // Further advances change nothing.
        p.process(&mut report);
        p.process(&mut report);
        let ds = p.dataset("PXD000001").unwrap();
        assert_eq!(ds.processing_state(), ProcessingState::Wait);
        assert!(p.tasks().is_empty());
    }

    #[test]
    fn location_must_match_id() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = processor(dir.path(), FakeCatalog::default());
        let mut report = Report::new();
        p.add_dataset("PXD000001", &mut report);
        p.datasets
            .get_mut("PXD000001")
            .unwrap()
            .metadata
            .location = Some(dir.path().join("PXD000002"));
        p.process(&mut report);
        let ds = p.dataset("PXD000001").unwrap();
        assert_eq!(ds.error, Some(ErrorCode::InvalidLocation));
        assert_eq!(ds.processing_state(), ProcessingState::Queued);
        assert_eq!(report.last_error_code(), Some("InvalidLocation"));
    }

    #[test]
    fn unreleased_dataset_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = processor(dir.path(), FakeCatalog::default());
        let mut report = Report::new();
        p.add_dataset("PXD999999", &mut report);
        p.process(&mut report);
        let ds = p.dataset("PXD999999").unwrap();
        assert_eq!(ds.status, DatasetStatus::Error);
        assert_eq!(ds.error, Some(ErrorCode::CannotFetchPXRecord));
        // The directory was still created; errors are terminal.
        p.process(&mut report);
        assert_eq!(report.n_errors(), 1);
    }

    #[test]
    fn one_failing_dataset_does_not_stop_others() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = FakeCatalog::default().with_record("PXD000001", &record_without_files());
        let mut p = processor(dir.path(), catalog);
        let mut report = Report::new();
        p.add_dataset("PXD000001", &mut report);
        p.add_dataset("PXD999999", &mut report);
        p.process(&mut report);
        assert_eq!(
            p.dataset("PXD000001").unwrap().processing_state(),
            ProcessingState::SetUp
        );
        assert!(p.dataset("PXD999999").unwrap().is_failed());
    }

    #[test]
    fn file_mut_resolves_refs() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = processor(dir.path(), FakeCatalog::default());
        let mut report = Report::new();
        p.add_dataset("PXD000001", &mut report);
        let missing = FileRef::new("PXD000001", "a", FileKind::Raw);
        assert!(p.file_mut(&missing).is_none());
        let unknown = FileRef::new("PXD000002", "a", FileKind::Raw);
        assert!(p.file_mut(&unknown).is_none());
        assert!(p
            .dataset("PXD000001")
            .and_then(|d| d.file(FileKind::Manifest, "README"))
            .is_none());
    }

    #[test]
    fn show_lists_datasets() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = processor(dir.path(), FakeCatalog::default());
        let mut report = Report::new();
        p.add_dataset("PXD000001", &mut report);
        let text = p.show();
        assert!(text.contains("PXD000001 - QUEUED - Queued - 0 files"));
        assert!(text.contains("pending tasks: 0"));
    }
}
