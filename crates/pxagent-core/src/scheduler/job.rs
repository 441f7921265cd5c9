//! Job types, states and the registry entry for one subprocess.

use std::path::PathBuf;
use std::process::Child;
use std::time::SystemTime;

use super::retry::RetryPolicy;
use crate::model::FileRef;

pub type JobId = u64;

/// Kind of work a job performs; per-type concurrency caps are keyed on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JobType {
    Download,
    Convert,
}

impl JobType {
    pub const ALL: [JobType; 2] = [JobType::Download, JobType::Convert];

    pub fn as_str(self) -> &'static str {
        match self {
            JobType::Download => "download",
            JobType::Convert => "convert",
        }
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "download" => Ok(JobType::Download),
            "convert" => Ok(JobType::Convert),
            other => Err(format!("unknown job type: {}", other)),
        }
    }
}

/// Scheduling state of a registered job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Queued, waiting for a free slot.
    Queued,
    Running,
    /// Requeued after a stall or a bad exit; launched ahead of queued jobs.
    Redo,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "qw",
            JobStatus::Running => "run",
            JobStatus::Redo => "redo",
        }
    }
}

/// Everything needed to (re)start a job. Survives requeues unchanged
/// apart from `n_retries`.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSpec {
    pub job_type: JobType,
    /// `args[0]` is the program.
    pub args: Vec<String>,
    /// Working directory of the child.
    pub location: PathBuf,
    pub retry: RetryPolicy,
    pub n_retries: u32,
    pub expected_output_file: Option<PathBuf>,
    pub expected_size: Option<u64>,
    /// FileRecord this job produces; `None` for ad-hoc downloads.
    pub file: Option<FileRef>,
}

impl JobSpec {
    pub fn new(job_type: JobType, args: Vec<String>, location: PathBuf) -> Self {
        Self {
            job_type,
            args,
            location,
            retry: RetryPolicy::default(),
            n_retries: 0,
            expected_output_file: None,
            expected_size: None,
            file: None,
        }
    }

    pub fn command_line(&self) -> String {
        self.args.join(" ")
    }
}

/// Registry entry: the spec plus runtime state.
#[derive(Debug)]
pub struct Job {
    pub job_id: JobId,
    pub status: JobStatus,
    pub spec: JobSpec,
    pub pid: Option<u32>,
    pub(super) handle: Option<Child>,
    pub launch_timestamp: Option<SystemTime>,
}

impl Job {
    pub(super) fn new(job_id: JobId, status: JobStatus, spec: JobSpec) -> Self {
        Self {
            job_id,
            status,
            spec,
            pid: None,
            handle: None,
            launch_timestamp: None,
        }
    }

    pub fn job_type(&self) -> JobType {
        self.spec.job_type
    }

    /// Modification time of the expected output file, if it exists.
    pub fn output_mtime(&self) -> Option<SystemTime> {
        let path = self.spec.expected_output_file.as_ref()?;
        std::fs::metadata(path).and_then(|m| m.modified()).ok()
    }
}
