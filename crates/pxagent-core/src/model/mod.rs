//! Data model shared by the state machine, translator and scheduler.

mod dataset;
mod file_record;
mod task;

pub use dataset::{Dataset, DatasetMetadata, DatasetStatus, ErrorCode, MsRun, ProcessingState};
pub use file_record::{FileKind, FileRecord, FileRef, FileStatus};
pub use task::{Task, TaskCommand};
