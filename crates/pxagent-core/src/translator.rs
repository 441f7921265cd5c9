//! Maps abstract tasks to concrete subprocess jobs.

use std::path::Path;

use thiserror::Error;

use crate::model::{Task, TaskCommand};
use crate::scheduler::{JobSpec, JobType, RetryPolicy};
use crate::uri::{filename_from_url_path, is_safe_filename};

/// Converter executable used when none is configured.
pub const DEFAULT_CONVERTER: &str = "ThermoRawFileParser";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TranslateError {
    #[error("no download URI for {0}")]
    MissingUri(String),
    #[error("no input file for conversion of {0}")]
    MissingInput(String),
    #[error("cannot derive a file name from {0}")]
    BadUrl(String),
}

#[derive(Debug, Clone)]
pub struct TaskTranslator {
    converter: String,
    retry: RetryPolicy,
}

impl Default for TaskTranslator {
    fn default() -> Self {
        Self::new(DEFAULT_CONVERTER)
    }
}

impl TaskTranslator {
    pub fn new(converter: impl Into<String>) -> Self {
        Self {
            converter: converter.into(),
            retry: RetryPolicy::default(),
        }
    }

    /// Translate one task into a job spec bound to the task's file.
    pub fn translate(&self, task: &Task) -> Result<JobSpec, TranslateError> {
        let record = &task.file_metadata;
        let mut spec = match task.command {
            TaskCommand::DownloadFile => {
                let uri = record
                    .uri
                    .as_deref()
                    .ok_or_else(|| TranslateError::MissingUri(record.filename.clone()))?;
                let mut spec = JobSpec::new(
                    JobType::Download,
                    curl_args(&record.filename, uri),
                    record.location.clone(),
                );
                spec.expected_size = record.expected_size;
                spec
            }
            TaskCommand::ConvertToMzml => {
                let input = task
                    .input
                    .as_ref()
                    .ok_or_else(|| TranslateError::MissingInput(record.filename.clone()))?;
                JobSpec::new(
                    JobType::Convert,
                    vec![
                        self.converter.clone(),
                        "-m".into(),
                        "0".into(),
                        "-f".into(),
                        "2".into(),
                        "-i".into(),
                        input.display().to_string(),
                    ],
                    record.location.clone(),
                )
            }
        };
        spec.retry = self.retry;
        spec.expected_output_file = Some(record.full_path.clone());
        spec.file = Some(task.file.clone());
        Ok(spec)
    }

    /// Ad-hoc download of `url` into `data_path`, not tied to any dataset.
    pub fn translate_get(&self, url: &str, data_path: &Path) -> Result<JobSpec, TranslateError> {
        let filename = filename_from_url_path(url)
            .filter(|f| is_safe_filename(f))
            .ok_or_else(|| TranslateError::BadUrl(url.to_string()))?;
        let mut spec = JobSpec::new(
            JobType::Download,
            curl_args(&filename, url),
            data_path.to_path_buf(),
        );
        spec.retry = self.retry;
        spec.expected_output_file = Some(data_path.join(&filename));
        Ok(spec)
    }
}

/// `curl` keeping the remote timestamp and resuming a partial file.
fn curl_args(filename: &str, uri: &str) -> Vec<String> {
    ["curl", "-R", "-C", "-", "-o", filename, uri]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
