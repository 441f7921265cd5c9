//! Conversion to mzML and the final compressed-file check.

use std::path::Path;

use super::{fail, Mode, Step, StepResult};
use crate::model::{
    Dataset, ErrorCode, FileKind, FileRecord, FileRef, FileStatus, ProcessingState, Task,
};

const MZML_TYPE: &str = "mzML";
const MZML_GZ_TYPE: &str = "mzML.gz";

fn mzml_name(fileroot: &str) -> String {
    format!("{}.{}", fileroot, MZML_TYPE)
}

fn mzml_gz_name(fileroot: &str) -> String {
    format!("{}.{}", fileroot, MZML_GZ_TYPE)
}

/// Record for a file found on disk that nothing tracked yet.
fn found_on_disk(
    data_dir: &Path,
    fileroot: &str,
    filename: String,
    filetype: &str,
) -> Option<FileRecord> {
    let mut record = FileRecord::expected(data_dir, fileroot, filename, filetype, None);
    let size = record.local_size()?;
    record.mark_ready(size);
    Some(record)
}

/// Register converted files already on disk and emit a conversion task for
/// every run that has neither an mzML nor an mzML.gz record.
pub(super) fn assess_conversion(ds: &mut Dataset, step: &mut Step<'_>) -> StepResult {
    let data_dir = ds
        .data_dir()
        .ok_or_else(|| fail(ErrorCode::MissingLocation, "no location has been set"))?;

    let mut pending = 0;
    for (fileroot, run) in ds.metadata.ms_runs.iter_mut() {
        if run.mzml_gz_file.is_none() {
            run.mzml_gz_file =
                found_on_disk(&data_dir, fileroot, mzml_gz_name(fileroot), MZML_GZ_TYPE);
        }
        if run.mzml_file.is_none() {
            run.mzml_file = found_on_disk(&data_dir, fileroot, mzml_name(fileroot), MZML_TYPE);
            if run.mzml_file.is_some() {
                step.report
                    .info(format!("Found {} untracked but already present", mzml_name(fileroot)));
            }
        }
        if run.is_converted() {
            continue;
        }

        let file = FileRef::new(&ds.dataset_id, fileroot, FileKind::Mzml);
        let input = run.raw_file.full_path.clone();
        if run.mzml_file.is_none() {
            let record =
                FileRecord::expected(&data_dir, fileroot, mzml_name(fileroot), MZML_TYPE, None);
            step.report
                .info(format!("Queueing {} for conversion", run.raw_file.filename));
            step.tasks.push(Task::convert(file, record.clone(), input));
            run.mzml_file = Some(record);
            pending += 1;
            continue;
        }
        let Some(mzml) = run.mzml_file.as_mut() else {
            continue;
        };
        match mzml.status {
            FileStatus::Unavailable => {
                return Err(fail(
                    ErrorCode::ConversionFailed,
                    format!("unable to convert {}", run.raw_file.filename),
                ))
            }
            // Not converted, so a READY record means the file is gone.
            FileStatus::Ready => {
                if step.mode == Mode::Verify {
                    return Err(fail(
                        ErrorCode::FileVanished,
                        format!("{} was converted but is gone", mzml.full_path.display()),
                    ));
                }
                mzml.status = FileStatus::Todo;
                mzml.is_complete = false;
                step.tasks.push(Task::convert(file, mzml.clone(), input));
            }
            FileStatus::Todo | FileStatus::Downloading => {}
        }
        pending += 1;
    }

    if pending == 0 {
        Ok(ProcessingState::ReadyToCompress)
    } else {
        Ok(ProcessingState::Converting)
    }
}

/// Assess registers compressed files already on disk; verify checks that
/// every run still has its converted output, then the dataset is done.
pub(super) fn assess_compression(ds: &mut Dataset, step: &mut Step<'_>) -> StepResult {
    let data_dir = ds
        .data_dir()
        .ok_or_else(|| fail(ErrorCode::MissingLocation, "no location has been set"))?;

    match step.mode {
        Mode::Assess => {
            for (fileroot, run) in ds.metadata.ms_runs.iter_mut() {
                if run.mzml_gz_file.is_none() {
                    run.mzml_gz_file =
                        found_on_disk(&data_dir, fileroot, mzml_gz_name(fileroot), MZML_GZ_TYPE);
                }
            }
            Ok(ProcessingState::Compressing)
        }
        Mode::Verify => {
            for run in ds.metadata.ms_runs.values() {
                if let Some(gz) = run.mzml_gz_file.as_ref().filter(|r| r.is_ready()) {
                    if gz.local_size().is_none() {
                        return Err(fail(
                            ErrorCode::FileVanished,
                            format!("{} is gone", gz.full_path.display()),
                        ));
                    }
                }
                if !run.is_converted() {
                    return Err(fail(
                        ErrorCode::MissingMzmlFiles,
                        format!("no converted file for {}", run.raw_file.filename),
                    ));
                }
            }
            step.report.info(format!("Dataset {} is complete", ds.dataset_id));
            Ok(ProcessingState::Wait)
        }
    }
}
