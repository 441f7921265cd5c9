//! Job scheduler.
//!
//! Launches queued jobs as subprocesses under a global and a per-type cap,
//! polls them without blocking, kills and requeues stalled jobs, and
//! verifies the output of finished ones. All counters live in
//! [`JobControl`] and change only through `add`, `launch` and `poll`.

mod budget;
mod job;
mod process;
mod retry;

pub use budget::JobControl;
pub use job::{Job, JobId, JobSpec, JobStatus, JobType};
pub use retry::{RetryDecision, RetryPolicy, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_STALENESS};

use std::collections::BTreeMap;
use std::fmt;
use std::process::{Child, ExitStatus};
use std::time::{Duration, SystemTime};

use crate::model::FileRef;

/// Error code reported when a job runs out of retries.
pub const MAX_RETRIES_REACHED: &str = "MaxRetriesReached";
/// Error code reported when a job's process cannot be spawned.
pub const JOB_LAUNCH_FAILED: &str = "JobLaunchFailed";

/// How long a terminated job gets to exit before it is killed.
const KILL_GRACE: Duration = Duration::from_secs(5);

/// Why a job attempt did not produce its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Output file and job both older than the staleness window.
    Stalled,
    /// Exited with a non-zero status (or was killed by a signal).
    BadExit(Option<i32>),
    MissingOutput,
    SizeMismatch { expected: u64, actual: u64 },
    SpawnFailed(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Stalled => f.write_str("output stopped changing"),
            FailureReason::BadExit(Some(code)) => write!(f, "exited with status {}", code),
            FailureReason::BadExit(None) => f.write_str("terminated by signal"),
            FailureReason::MissingOutput => f.write_str("expected output file is missing"),
            FailureReason::SizeMismatch { expected, actual } => {
                write!(f, "output size {} does not match expected {}", actual, expected)
            }
            FailureReason::SpawnFailed(e) => write!(f, "cannot launch: {}", e),
        }
    }
}

/// Result of a scheduling step, reported back to the owner of the files.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Launched {
        job_id: JobId,
        file: Option<FileRef>,
    },
    Completed {
        job_id: JobId,
        file: Option<FileRef>,
        size: Option<u64>,
    },
    /// Re-added as `redo` under a new id.
    Requeued {
        old_job_id: JobId,
        new_job_id: JobId,
        file: Option<FileRef>,
        n_retries: u32,
        reason: FailureReason,
    },
    /// Dropped after `max_retries` retries.
    Exhausted {
        job_id: JobId,
        file: Option<FileRef>,
        n_retries: u32,
        reason: FailureReason,
    },
    /// Spawn failed; the job stays registered as `redo`.
    LaunchFailed {
        job_id: JobId,
        file: Option<FileRef>,
        n_retries: u32,
        error: String,
    },
}

/// A killed child waiting to be reaped.
#[derive(Debug)]
struct Reaping {
    job_id: JobId,
    child: Child,
    kill_after: SystemTime,
}

enum Finish {
    Stalled,
    /// `try_wait` failed; the exit status is unknown.
    Lost,
    Exited(Option<ExitStatus>),
}

#[derive(Debug)]
pub struct JobScheduler {
    jobs: BTreeMap<JobId, Job>,
    control: JobControl,
    reaping: Vec<Reaping>,
}

impl JobScheduler {
    pub fn new(control: JobControl) -> Self {
        Self {
            jobs: BTreeMap::new(),
            control,
            reaping: Vec::new(),
        }
    }

    pub fn control(&self) -> &JobControl {
        &self.control
    }

    pub fn job(&self, job_id: JobId) -> Option<&Job> {
        self.jobs.get(&job_id)
    }

    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }

    pub fn n_waiting(&self) -> usize {
        self.jobs
            .values()
            .filter(|j| j.status != JobStatus::Running)
            .count()
    }

    /// Register a job as `qw` and return its id.
    pub fn add(&mut self, spec: JobSpec) -> JobId {
        self.insert(spec, JobStatus::Queued)
    }

    fn insert(&mut self, spec: JobSpec, status: JobStatus) -> JobId {
        let job_id = self.control.allocate_id();
        tracing::debug!(
            job_id,
            job_type = spec.job_type.as_str(),
            status = status.as_str(),
            "adding job to the queue"
        );
        self.jobs.insert(job_id, Job::new(job_id, status, spec));
        self.control.n_jobs += 1;
        job_id
    }

    fn remove(&mut self, job_id: JobId) -> Option<Job> {
        let job = self.jobs.remove(&job_id)?;
        self.control.n_jobs = self.control.n_jobs.saturating_sub(1);
        Some(job)
    }

    pub fn launch(&mut self) -> Vec<JobOutcome> {
        self.launch_at(SystemTime::now())
    }

    /// Start as many waiting jobs as the caps allow: `redo` jobs first,
    /// then `qw`, each in id order. A type at its cap is skipped without
    /// blocking other types.
    pub fn launch_at(&mut self, now: SystemTime) -> Vec<JobOutcome> {
        let mut outcomes = Vec::new();
        if self.control.global_full() || self.n_waiting() == 0 {
            return outcomes;
        }

        let ids_with = |status: JobStatus| -> Vec<JobId> {
            self.jobs
                .values()
                .filter(|j| j.status == status)
                .map(|j| j.job_id)
                .collect()
        };
        let mut order = ids_with(JobStatus::Redo);
        order.extend(ids_with(JobStatus::Queued));

        for job_id in order {
            if self.control.global_full() {
                break;
            }
            let Some(job) = self.jobs.get_mut(&job_id) else {
                continue;
            };
            let job_type = job.job_type();
            if !self.control.reserve(job_type) {
                continue;
            }
            match process::spawn(&job.spec.args, &job.spec.location) {
                Ok(child) => {
                    tracing::info!(
                        job_id,
                        pid = child.id(),
                        cmd = %job.spec.command_line(),
                        "launching job"
                    );
                    job.pid = Some(child.id());
                    job.handle = Some(child);
                    job.status = JobStatus::Running;
                    job.launch_timestamp = Some(now);
                    outcomes.push(JobOutcome::Launched {
                        job_id,
                        file: job.spec.file.clone(),
                    });
                }
                Err(e) => {
                    self.control.release(job_type);
                    tracing::warn!(job_id, error = %e, cmd = %job.spec.command_line(), "cannot launch job");
                    match job.spec.retry.decide(job.spec.n_retries) {
                        RetryDecision::Requeue(n_retries) => {
                            job.spec.n_retries = n_retries;
                            job.status = JobStatus::Redo;
                            outcomes.push(JobOutcome::LaunchFailed {
                                job_id,
                                file: job.spec.file.clone(),
                                n_retries,
                                error: e.to_string(),
                            });
                        }
                        RetryDecision::Exhausted => {
                            if let Some(job) = self.remove(job_id) {
                                outcomes.push(self.exhausted(
                                    job_id,
                                    job.spec,
                                    FailureReason::SpawnFailed(e.to_string()),
                                ));
                            }
                        }
                    }
                }
            }
        }
        outcomes
    }

    pub fn poll(&mut self) -> Vec<JobOutcome> {
        self.poll_at(SystemTime::now())
    }

    /// Check every running job once without blocking. Stalled jobs are
    /// terminated and requeued; exited jobs are verified. Registry changes
    /// are applied after the scan.
    pub fn poll_at(&mut self, now: SystemTime) -> Vec<JobOutcome> {
        self.reap(now);
        let mut outcomes = Vec::new();
        if self.control.n_running_jobs() == 0 {
            return outcomes;
        }

        let mut finished: Vec<(JobId, Finish)> = Vec::new();
        for job in self.jobs.values_mut() {
            if job.status != JobStatus::Running {
                continue;
            }
            let output_mtime = job.output_mtime();
            let Some(child) = job.handle.as_mut() else {
                continue;
            };
            match child.try_wait() {
                Ok(None) => {
                    let launched = job.launch_timestamp.unwrap_or(now);
                    if job.spec.retry.is_stale(now, launched, output_mtime) {
                        tracing::warn!(
                            job_id = job.job_id,
                            output = ?job.spec.expected_output_file,
                            "maximum staleness reached, killing job"
                        );
                        if let Err(e) = process::terminate(child) {
                            tracing::warn!(job_id = job.job_id, error = %e, "cannot terminate job");
                        }
                        finished.push((job.job_id, Finish::Stalled));
                    }
                }
                Ok(Some(status)) => finished.push((job.job_id, Finish::Exited(Some(status)))),
                Err(e) => {
                    tracing::warn!(job_id = job.job_id, error = %e, "cannot poll job, terminating it");
                    if let Err(e) = process::terminate(child) {
                        tracing::warn!(job_id = job.job_id, error = %e, "cannot terminate job");
                    }
                    finished.push((job.job_id, Finish::Lost));
                }
            }
        }

        for (job_id, finish) in finished {
            let Some(mut job) = self.remove(job_id) else {
                continue;
            };
            self.control.release(job.job_type());
            let failure = match finish {
                Finish::Stalled => {
                    self.hand_to_reaper(&mut job, now);
                    Some(FailureReason::Stalled)
                }
                Finish::Lost => {
                    self.hand_to_reaper(&mut job, now);
                    Some(FailureReason::BadExit(None))
                }
                Finish::Exited(status) => {
                    tracing::info!(job_id, status = ?status, "job is complete");
                    match verify_output(&job.spec, status) {
                        Ok(size) => {
                            outcomes.push(JobOutcome::Completed {
                                job_id,
                                file: job.spec.file.clone(),
                                size,
                            });
                            None
                        }
                        Err(reason) => Some(reason),
                    }
                }
            };
            if let Some(reason) = failure {
                outcomes.push(self.retry(job_id, job.spec, reason));
            }
        }
        outcomes
    }

    /// Keep a signalled child until it exits or its grace period ends.
    fn hand_to_reaper(&mut self, job: &mut Job, now: SystemTime) {
        if let Some(child) = job.handle.take() {
            self.reaping.push(Reaping {
                job_id: job.job_id,
                child,
                kill_after: now + KILL_GRACE,
            });
        }
    }

    /// Requeue under a new id, or drop once retries are used up.
    fn retry(&mut self, job_id: JobId, mut spec: JobSpec, reason: FailureReason) -> JobOutcome {
        match spec.retry.decide(spec.n_retries) {
            RetryDecision::Requeue(n_retries) => {
                tracing::warn!(job_id, n_retries, %reason, "requeueing job");
                spec.n_retries = n_retries;
                let file = spec.file.clone();
                let new_job_id = self.insert(spec, JobStatus::Redo);
                JobOutcome::Requeued {
                    old_job_id: job_id,
                    new_job_id,
                    file,
                    n_retries,
                    reason,
                }
            }
            RetryDecision::Exhausted => self.exhausted(job_id, spec, reason),
        }
    }

    fn exhausted(&self, job_id: JobId, spec: JobSpec, reason: FailureReason) -> JobOutcome {
        tracing::error!(
            job_id,
            code = MAX_RETRIES_REACHED,
            max_retries = spec.retry.max_retries,
            output = ?spec.expected_output_file,
            %reason,
            "max retries reached"
        );
        JobOutcome::Exhausted {
            job_id,
            file: spec.file,
            n_retries: spec.n_retries,
            reason,
        }
    }

    /// Collect terminated children; SIGKILL those past the grace period.
    /// A child that can no longer be waited for is not ours to reap.
    fn reap(&mut self, now: SystemTime) {
        self.reaping.retain_mut(|r| match r.child.try_wait() {
            Ok(Some(_)) => false,
            Ok(None) if now >= r.kill_after => {
                tracing::debug!(job_id = r.job_id, "killing job that ignored SIGTERM");
                if let Err(e) = r.child.kill() {
                    tracing::debug!(job_id = r.job_id, error = %e, "cannot kill job");
                }
                if let Err(e) = r.child.wait() {
                    tracing::debug!(job_id = r.job_id, error = %e, "cannot reap job");
                }
                false
            }
            Ok(None) => true,
            Err(e) => {
                tracing::debug!(job_id = r.job_id, error = %e, "cannot wait for job, dropping it");
                false
            }
        });
    }

    /// Summary of the counters and each running job, logged at debug level.
    pub fn show_jobs(&self) -> String {
        self.show_jobs_at(SystemTime::now())
    }

    pub fn show_jobs_at(&self, now: SystemTime) -> String {
        let mut buffer = format!(
            "  n_jobs={}, n_running_jobs={}\n",
            self.control.n_jobs(),
            self.control.n_running_jobs()
        );
        for job in self.jobs.values().filter(|j| j.status == JobStatus::Running) {
            let output = match job.output_mtime() {
                Some(mtime) => format!(
                    "file age: {} s",
                    now.duration_since(mtime).unwrap_or_default().as_secs()
                ),
                None => "none".to_string(),
            };
            buffer.push_str(&format!(
                "    - {}: status={}, type={}, cmd={}, output: {}\n",
                job.job_id,
                job.status.as_str(),
                job.job_type(),
                job.spec.command_line(),
                output
            ));
        }
        tracing::debug!("{}", buffer.trim_end());
        buffer
    }

    /// Terminate every running job and wait (bounded) for them to exit.
    /// Returns how many jobs were terminated.
    pub fn shutdown(&mut self) -> usize {
        let now = SystemTime::now();
        let running: Vec<JobId> = self
            .jobs
            .values()
            .filter(|j| j.status == JobStatus::Running)
            .map(|j| j.job_id)
            .collect();
        let n = running.len();
        for job_id in running {
            let Some(mut job) = self.remove(job_id) else {
                continue;
            };
            self.control.release(job.job_type());
            if let Some(child) = job.handle.as_mut() {
                tracing::info!(job_id, "terminating job");
                if let Err(e) = process::terminate(child) {
                    tracing::warn!(job_id, error = %e, "cannot terminate job");
                }
            }
            self.hand_to_reaper(&mut job, now);
        }
        let deadline = now + KILL_GRACE;
        for r in &mut self.reaping {
            r.kill_after = r.kill_after.min(deadline);
        }
        while !self.reaping.is_empty() {
            let now = SystemTime::now();
            self.reap(now);
            if !self.reaping.is_empty() {
                std::thread::sleep(Duration::from_millis(100));
            }
        }
        n
    }
}

/// A finished job succeeded iff it exited cleanly and its expected output
/// (if any) exists with the expected size (if known).
fn verify_output(spec: &JobSpec, status: Option<ExitStatus>) -> Result<Option<u64>, FailureReason> {
    match status {
        Some(s) if s.success() => {}
        Some(s) => return Err(FailureReason::BadExit(s.code())),
        None => return Err(FailureReason::BadExit(None)),
    }
    let Some(path) = spec.expected_output_file.as_ref() else {
        return Ok(None);
    };
    let actual = std::fs::metadata(path)
        .map(|m| m.len())
        .map_err(|_| FailureReason::MissingOutput)?;
    match spec.expected_size {
        Some(expected) if expected != actual => {
            Err(FailureReason::SizeMismatch { expected, actual })
        }
        _ => Ok(Some(actual)),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::model::FileKind;
    use std::path::Path;
    use std::time::Instant;

    fn control(global: usize, download: Option<usize>) -> JobControl {
        let mut caps = BTreeMap::new();
        if let Some(cap) = download {
            caps.insert(JobType::Download, cap);
        }
        JobControl::new(global, caps)
    }

    fn shell(dir: &Path, script: &str) -> JobSpec {
        JobSpec::new(
            JobType::Download,
            vec!["sh".into(), "-c".into(), script.into()],
            dir.to_path_buf(),
        )
    }

    /// Poll until no job is running or the deadline passes.
    fn poll_until_idle(s: &mut JobScheduler) -> Vec<JobOutcome> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut all = Vec::new();
        while s.control().n_running_jobs() > 0 && Instant::now() < deadline {
            all.extend(s.poll());
            std::thread::sleep(Duration::from_millis(20));
        }
        all
    }

    #[test]
    fn per_type_cap_limits_launch() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = JobScheduler::new(control(2, Some(1)));
        for _ in 0..3 {
            s.add(shell(dir.path(), "sleep 5"));
        }
        let launched = s.launch();
        assert_eq!(launched.len(), 1);
        assert_eq!(s.control().n_running_jobs(), 1);
        assert_eq!(s.control().n_running(JobType::Download), 1);
        assert_eq!(
            s.jobs().filter(|j| j.status == JobStatus::Running).count(),
            1
        );
        assert_eq!(s.shutdown(), 1);
        assert_eq!(s.control().n_running_jobs(), 0);
    }

    #[test]
    fn uncapped_type_uses_global_cap() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = JobScheduler::new(control(2, Some(1)));
        s.add(shell(dir.path(), "sleep 5"));
        let mut convert = shell(dir.path(), "sleep 5");
        convert.job_type = JobType::Convert;
        s.add(convert.clone());
        s.add(convert);
        s.launch();
        assert_eq!(s.control().n_running(JobType::Download), 1);
        assert_eq!(s.control().n_running(JobType::Convert), 1);
        assert_eq!(s.control().n_running_jobs(), 2);
        s.shutdown();
    }

    #[test]
    fn ids_are_unique_and_increasing() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = JobScheduler::new(control(1, None));
        let a = s.add(shell(dir.path(), "true"));
        let b = s.add(shell(dir.path(), "true"));
        assert!(b > a);
        assert_eq!(s.control().n_jobs(), 2);
        assert_eq!(s.jobs().count(), s.control().n_jobs());
    }

    #[test]
    fn stalled_job_is_killed_and_requeued() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("a.raw");
        std::fs::write(&out, b"partial").unwrap();
        let mut spec = shell(dir.path(), "sleep 30");
        spec.expected_output_file = Some(out);
        spec.file = Some(FileRef::new("PXD000001", "a", FileKind::Raw));

        let mut s = JobScheduler::new(control(2, Some(1)));
        let t0 = SystemTime::now();
        let first = s.add(spec);
        s.launch_at(t0);

        // Within the window nothing happens.
        assert!(s.poll_at(t0 + Duration::from_secs(10)).is_empty());

        let outcomes = s.poll_at(t0 + Duration::from_secs(40));
        assert_eq!(outcomes.len(), 1);
        let JobOutcome::Requeued {
            old_job_id,
            new_job_id,
            n_retries,
            reason,
            ..
        } = &outcomes[0]
        else {
            panic!("expected requeue, got {:?}", outcomes[0]);
        };
        assert_eq!(*old_job_id, first);
        assert!(*new_job_id > first);
        assert_eq!(*n_retries, 1);
        assert_eq!(*reason, FailureReason::Stalled);
        let requeued = s.job(*new_job_id).unwrap();
        assert_eq!(requeued.status, JobStatus::Redo);
        assert_eq!(requeued.spec.n_retries, 1);
        assert_eq!(s.control().n_running_jobs(), 0);
        assert_eq!(s.control().n_jobs(), 1);
    }

    #[test]
    fn job_without_output_is_never_stale() {
        let dir = tempfile::tempdir().unwrap();
        let mut spec = shell(dir.path(), "sleep 30");
        spec.expected_output_file = Some(dir.path().join("never.raw"));
        let mut s = JobScheduler::new(control(1, None));
        let t0 = SystemTime::now();
        s.add(spec);
        s.launch_at(t0);
        assert!(s.poll_at(t0 + Duration::from_secs(3600)).is_empty());
        assert_eq!(s.control().n_running_jobs(), 1);
        s.shutdown();
    }

    #[test]
    fn stall_past_max_retries_is_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("a.raw");
        std::fs::write(&out, b"x").unwrap();
        let mut spec = shell(dir.path(), "sleep 30");
        spec.expected_output_file = Some(out);
        spec.retry.max_retries = 1;

        let mut s = JobScheduler::new(control(1, None));
        let mut t = SystemTime::now();
        s.add(spec);
        s.launch_at(t);
        t += Duration::from_secs(40);
        let first = s.poll_at(t);
        assert!(matches!(first[0], JobOutcome::Requeued { n_retries: 1, .. }));

        s.launch_at(t);
        t += Duration::from_secs(40);
        let second = s.poll_at(t);
        assert!(matches!(
            second[0],
            JobOutcome::Exhausted {
                n_retries: 1,
                reason: FailureReason::Stalled,
                ..
            }
        ));
        assert_eq!(s.control().n_jobs(), 0);
    }

    #[test]
    fn completed_job_reports_size() {
        let dir = tempfile::tempdir().unwrap();
        let mut spec = shell(dir.path(), "printf abc > out.txt");
        spec.expected_output_file = Some(dir.path().join("out.txt"));
        spec.expected_size = Some(3);
        let mut s = JobScheduler::new(control(1, None));
        let id = s.add(spec);
        s.launch();
        let outcomes = poll_until_idle(&mut s);
        assert_eq!(
            outcomes,
            vec![JobOutcome::Completed {
                job_id: id,
                file: None,
                size: Some(3)
            }]
        );
        assert_eq!(s.control().n_jobs(), 0);
    }

    #[test]
    fn clean_exit_without_output_is_requeued() {
        let dir = tempfile::tempdir().unwrap();
        let mut spec = shell(dir.path(), "true");
        spec.expected_output_file = Some(dir.path().join("missing.raw"));
        let mut s = JobScheduler::new(control(1, None));
        s.add(spec);
        s.launch();
        let outcomes = poll_until_idle(&mut s);
        assert!(matches!(
            outcomes[0],
            JobOutcome::Requeued {
                n_retries: 1,
                reason: FailureReason::MissingOutput,
                ..
            }
        ));
    }

    #[test]
    fn failing_exit_is_requeued() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = JobScheduler::new(control(1, None));
        s.add(shell(dir.path(), "exit 3"));
        s.launch();
        let outcomes = poll_until_idle(&mut s);
        assert!(matches!(
            outcomes[0],
            JobOutcome::Requeued {
                reason: FailureReason::BadExit(Some(3)),
                ..
            }
        ));
    }

    #[test]
    fn redo_jobs_launch_first() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = JobScheduler::new(control(1, None));
        s.add(shell(dir.path(), "sleep 5"));
        let redo = s.insert(shell(dir.path(), "sleep 5"), JobStatus::Redo);
        let outcomes = s.launch();
        assert_eq!(
            outcomes,
            vec![JobOutcome::Launched {
                job_id: redo,
                file: None
            }]
        );
        s.shutdown();
    }

    #[test]
    fn spawn_failure_stays_registered() {
        let dir = tempfile::tempdir().unwrap();
        let spec = JobSpec::new(
            JobType::Convert,
            vec!["/nonexistent/pxagent-test-tool".into()],
            dir.path().to_path_buf(),
        );
        let mut s = JobScheduler::new(control(1, None));
        let id = s.add(spec);
        let outcomes = s.launch();
        assert!(matches!(
            outcomes[0],
            JobOutcome::LaunchFailed { n_retries: 1, .. }
        ));
        assert_eq!(s.job(id).unwrap().status, JobStatus::Redo);
        assert_eq!(s.control().n_running_jobs(), 0);
    }

    #[test]
    fn show_jobs_lists_running() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = JobScheduler::new(control(1, None));
        s.add(shell(dir.path(), "sleep 5"));
        s.launch();
        let text = s.show_jobs();
        assert!(text.contains("n_jobs=1, n_running_jobs=1"));
        assert!(text.contains("cmd=sh -c sleep 5"));
        s.shutdown();
    }

    #[test]
    fn unwaitable_job_is_handed_to_the_reaper() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = JobScheduler::new(control(1, None));
        let id = s.add(shell(dir.path(), "exit 0"));
        s.launch();
        let pid = libc::pid_t::try_from(s.job(id).unwrap().pid.unwrap()).unwrap();
        // Collect the child directly so the scheduler's own wait fails.
        let mut status = 0;
        assert_eq!(unsafe { libc::waitpid(pid, &mut status, 0) }, pid);

        let outcomes = s.poll();
        assert!(matches!(
            outcomes.as_slice(),
            [JobOutcome::Requeued {
                reason: FailureReason::BadExit(None),
                n_retries: 1,
                ..
            }]
        ));
        assert_eq!(s.control().n_running_jobs(), 0);
        assert_eq!(s.reaping.len(), 1);

        s.poll();
        assert!(s.reaping.is_empty());
    }

    #[test]
    fn reaper_kills_child_that_ignores_sigterm() {
        let dir = tempfile::tempdir().unwrap();
        let args: Vec<String> = vec!["sh".into(), "-c".into(), "trap '' TERM; sleep 30".into()];
        let child = process::spawn(&args, dir.path()).unwrap();
        let mut s = JobScheduler::new(control(1, None));
        let now = SystemTime::now();
        s.reaping.push(Reaping {
            job_id: 1,
            child,
            kill_after: now,
        });

        let started = Instant::now();
        s.reap(now);
        assert!(s.reaping.is_empty());
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
