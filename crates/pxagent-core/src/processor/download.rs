//! Download: manifest and raw file enumeration, download tasks, and the
//! check that every raw file has arrived.

use std::path::Path;

use super::{fail, Mode, Step, StepFailure, StepResult, MANIFEST_FILE, RAW_EXTENSION};
use crate::model::{
    Dataset, ErrorCode, FileKind, FileRecord, FileRef, FileStatus, MsRun, ProcessingState, Task,
};
use crate::uri::{has_extension, join_url, remote_name, NameError};

/// A raw file the dataset is expected to contain.
struct RawCandidate {
    uri: String,
    size: Option<u64>,
}

pub(super) fn assess_download(ds: &mut Dataset, step: &mut Step<'_>) -> StepResult {
    let data_dir = ds
        .data_dir()
        .ok_or_else(|| fail(ErrorCode::MissingLocation, "no location has been set"))?;
    let ftp = ds
        .metadata
        .ftp_location
        .clone()
        .ok_or_else(|| fail(ErrorCode::CannotFindFtpLocation, "no FTP location known"))?;

    if ds.metadata.manifest.is_none() {
        let uri = join_url(&ftp, MANIFEST_FILE).ok_or_else(|| {
            fail(
                ErrorCode::CannotFindFtpLocation,
                format!("FTP location {} is not a valid URL", ftp),
            )
        })?;
        let record = FileRecord::expected(&data_dir, "README", MANIFEST_FILE, "txt", Some(uri));
        step.report
            .info(format!("Queueing manifest ({}) for download", MANIFEST_FILE));
        step.tasks.push(Task::download(
            FileRef::new(&ds.dataset_id, "README", FileKind::Manifest),
            record.clone(),
        ));
        ds.metadata.manifest = Some(record);
    }

    // Enumeration only happens while assessing; once downloading, the set
    // of tracked runs is fixed.
    if step.mode == Mode::Assess {
        let candidates = raw_candidates(ds, &ftp, step)?;
        if candidates.is_empty() && ds.metadata.ms_runs.is_empty() {
            return Err(fail(
                ErrorCode::NoRawFilesFound,
                format!("no .{} files found for the dataset", RAW_EXTENSION),
            ));
        }
        track_candidates(ds, &data_dir, candidates, step)?;
    }

    let mut outstanding = 0;
    if let Some(manifest) = ds.metadata.manifest.as_ref() {
        match manifest.status {
            FileStatus::Todo | FileStatus::Downloading => outstanding += 1,
            FileStatus::Unavailable => step.report.warning(format!(
                "Dataset {}: manifest could not be downloaded",
                ds.dataset_id
            )),
            FileStatus::Ready => {}
        }
    }

    for (fileroot, run) in ds.metadata.ms_runs.iter_mut() {
        let raw = &mut run.raw_file;
        match raw.status {
            FileStatus::Unavailable => {
                return Err(fail(
                    ErrorCode::MissingMSRunFiles,
                    format!("unable to download MS run {}", raw.filename),
                ))
            }
            FileStatus::Ready if raw.local_size().is_none() => match step.mode {
                Mode::Verify => {
                    return Err(fail(
                        ErrorCode::FileVanished,
                        format!("{} was downloaded but is gone", raw.full_path.display()),
                    ))
                }
                Mode::Assess => {
                    step.report.warning(format!(
                        "{} was downloaded but is gone; downloading again",
                        raw.full_path.display()
                    ));
                    raw.status = FileStatus::Todo;
                    raw.is_complete = false;
                    raw.current_size = None;
                    step.tasks.push(Task::download(
                        FileRef::new(&ds.dataset_id, fileroot, FileKind::Raw),
                        raw.clone(),
                    ));
                    outstanding += 1;
                }
            },
            FileStatus::Ready => {}
            FileStatus::Todo | FileStatus::Downloading => outstanding += 1,
        }
    }

    if outstanding == 0 {
        step.report.info(format!(
            "Dataset {}: all MS runs are downloaded",
            ds.dataset_id
        ));
        Ok(ProcessingState::ReadyToConvert)
    } else {
        Ok(ProcessingState::Downloading)
    }
}

/// Raw files from the record's `datasetFiles`, or failing that, from an
/// FTP listing of the dataset's location.
fn raw_candidates(
    ds: &Dataset,
    ftp: &str,
    step: &mut Step<'_>,
) -> Result<Vec<RawCandidate>, StepFailure> {
    let from_record: Vec<RawCandidate> = ds
        .metadata
        .record
        .as_ref()
        .map(|r| r.raw_file_uris())
        .unwrap_or_default()
        .into_iter()
        .map(|uri| RawCandidate {
            uri: uri.to_string(),
            size: None,
        })
        .collect();
    if !from_record.is_empty() {
        return Ok(from_record);
    }

    step.report.debug(format!(
        "Dataset {}: no raw files in the record, listing {}",
        ds.dataset_id, ftp
    ));
    let entries = step.catalog.list_directory(ftp).map_err(|e| {
        fail(
            ErrorCode::CannotListFtpLocation,
            format!("unable to list {}: {}", ftp, e),
        )
    })?;
    let mut candidates = Vec::new();
    for entry in entries {
        if entry.is_dir || !has_extension(&entry.name, RAW_EXTENSION) {
            continue;
        }
        let uri = join_url(ftp, &entry.name).ok_or_else(|| {
            fail(
                ErrorCode::FailedFilenameMatch,
                format!("cannot build a URI for {}", entry.name),
            )
        })?;
        candidates.push(RawCandidate {
            uri,
            size: entry.size,
        });
    }
    Ok(candidates)
}

/// Add a record for every untracked candidate. A local copy with a known,
/// matching size is taken as is; anything else is queued for download.
fn track_candidates(
    ds: &mut Dataset,
    data_dir: &Path,
    candidates: Vec<RawCandidate>,
    step: &mut Step<'_>,
) -> Result<(), StepFailure> {
    let had_runs = !ds.metadata.ms_runs.is_empty();
    for candidate in candidates {
        let name = remote_name(&candidate.uri).map_err(|e| match e {
            NameError::NoFilename => fail(
                ErrorCode::FailedFilenameMatch,
                format!("unable to get the file name in uri {}", candidate.uri),
            ),
            NameError::NoFileroot => fail(
                ErrorCode::FailedFileRootMatch,
                format!("unable to get the file root for {}", candidate.uri),
            ),
        })?;
        if ds.metadata.ms_runs.contains_key(&name.fileroot) {
            continue;
        }
        if had_runs {
            step.report.warning(format!(
                "Previous catalog of MS runs did not have {}",
                name.fileroot
            ));
        }

        let mut record = FileRecord::expected(
            data_dir,
            name.fileroot.as_str(),
            name.filename.as_str(),
            name.extension.as_str(),
            Some(candidate.uri),
        )
        .with_expected_size(candidate.size);
        if record.local_copy_matches() {
            step.report.info(format!(
                "Found MS run raw file {} untracked but already present",
                name.filename
            ));
            if let Some(size) = candidate.size {
                record.mark_ready(size);
            }
        } else {
            step.report
                .info(format!("Queueing MS run raw file {} for download", name.filename));
            step.tasks.push(Task::download(
                FileRef::new(&ds.dataset_id, name.fileroot.as_str(), FileKind::Raw),
                record.clone(),
            ));
        }
        ds.metadata.ms_runs.insert(name.fileroot, MsRun::new(record));
    }
    Ok(())
}
