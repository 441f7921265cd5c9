//! Set up: dataset directory and metadata record.

use std::fs;

use super::{fail, Mode, Step, StepResult, RECORD_FILE};
use crate::model::{Dataset, ErrorCode, ProcessingState};
use crate::record::DatasetRecord;

/// Make sure `<location>/data` exists and holds a parseable record with an
/// FTP location. In assess mode missing pieces are created and the dataset
/// is verified on the next step.
pub(super) fn assess_setup(ds: &mut Dataset, step: &mut Step<'_>) -> StepResult {
    step.report
        .debug(format!("Dataset {}: checking set up", ds.dataset_id));
    let location = ds
        .metadata
        .location
        .clone()
        .ok_or_else(|| fail(ErrorCode::MissingLocation, "no location has been set"))?;
    if !Dataset::location_matches_id(&location, &ds.dataset_id) {
        return Err(fail(
            ErrorCode::InvalidLocation,
            format!("location {} does not end with the dataset id", location.display()),
        ));
    }

    let mut remediated = false;
    let data_dir = location.join("data");
    if !data_dir.is_dir() {
        if step.mode == Mode::Verify {
            return Err(fail(
                ErrorCode::LocationMissing,
                format!("tried to create {} but it is not found", data_dir.display()),
            ));
        }
        fs::create_dir_all(&data_dir).map_err(|e| {
            fail(
                ErrorCode::CannotCreateLocation,
                format!("unable to create {}: {}", data_dir.display(), e),
            )
        })?;
        step.report
            .info(format!("Created dataset location {}", data_dir.display()));
        remediated = true;
    }

    let record_path = data_dir.join(RECORD_FILE);
    if !record_path.is_file() {
        if step.mode == Mode::Verify {
            return Err(fail(
                ErrorCode::PXRecordMissing,
                format!("tried to verify {} but it is not found", record_path.display()),
            ));
        }
        let body = step.catalog.fetch_record(&ds.dataset_id).map_err(|e| {
            fail(
                ErrorCode::CannotFetchPXRecord,
                format!("unable to fetch the ProteomeCentral record: {}", e),
            )
        })?;
        fs::write(&record_path, body).map_err(|e| {
            fail(
                ErrorCode::CannotWritePXRecord,
                format!("unable to write {}: {}", record_path.display(), e),
            )
        })?;
        step.report
            .info(format!("Fetched ProteomeXchange record for {}", ds.dataset_id));
        remediated = true;
    }

    let text = fs::read_to_string(&record_path).map_err(|e| {
        fail(
            ErrorCode::PXRecordMissing,
            format!("unable to read {}: {}", record_path.display(), e),
        )
    })?;
    let record = DatasetRecord::parse(&text).map_err(|e| {
        fail(
            ErrorCode::CannotParsePXJSON,
            format!("unable to parse {}: {}", record_path.display(), e),
        )
    })?;
    let ftp_location = match record.ftp_location() {
        None => {
            return Err(fail(
                ErrorCode::CannotFindFullDatasetLinks,
                "record has no fullDatasetLinks",
            ))
        }
        Some(None) => {
            return Err(fail(
                ErrorCode::CannotFindFtpLocation,
                "record has no Dataset FTP location",
            ))
        }
        Some(Some(ftp)) => ftp.to_string(),
    };
    ds.metadata.ftp_location = Some(ftp_location);
    ds.metadata.record = Some(record);

    if remediated {
        Ok(ProcessingState::SetUp)
    } else {
        Ok(ProcessingState::ReadyToDownload)
    }
}
