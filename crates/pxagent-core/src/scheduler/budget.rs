//! Running-job counters and concurrency caps.
//!
//! Owned by the scheduler; slots are reserved when a job launches and
//! released when it exits or is killed.

use std::collections::BTreeMap;

use super::job::JobType;

#[derive(Debug, Clone)]
pub struct JobControl {
    pub(super) next_job_id: u64,
    pub(super) n_jobs: usize,
    n_running_jobs: usize,
    n_running_jobs_by_type: BTreeMap<JobType, usize>,
    max_running_jobs: usize,
    /// Types absent from this map are limited only by `max_running_jobs`.
    caps_by_type: BTreeMap<JobType, usize>,
}

impl JobControl {
    pub fn new(max_running_jobs: usize, caps_by_type: BTreeMap<JobType, usize>) -> Self {
        Self {
            next_job_id: 1,
            n_jobs: 0,
            n_running_jobs: 0,
            n_running_jobs_by_type: BTreeMap::new(),
            max_running_jobs: max_running_jobs.max(1),
            caps_by_type,
        }
    }

    pub fn n_jobs(&self) -> usize {
        self.n_jobs
    }

    pub fn n_running_jobs(&self) -> usize {
        self.n_running_jobs
    }

    pub fn n_running(&self, job_type: JobType) -> usize {
        self.n_running_jobs_by_type
            .get(&job_type)
            .copied()
            .unwrap_or(0)
    }

    pub fn max_running_jobs(&self) -> usize {
        self.max_running_jobs
    }

    pub fn cap(&self, job_type: JobType) -> Option<usize> {
        self.caps_by_type.get(&job_type).copied()
    }

    pub fn global_full(&self) -> bool {
        self.n_running_jobs >= self.max_running_jobs
    }

    pub fn type_full(&self, job_type: JobType) -> bool {
        self.cap(job_type)
            .is_some_and(|cap| self.n_running(job_type) >= cap)
    }

    /// Reserve a slot for `job_type`. Returns false (and reserves nothing)
    /// when either the global or the per-type cap is reached.
    pub fn reserve(&mut self, job_type: JobType) -> bool {
        if self.global_full() || self.type_full(job_type) {
            return false;
        }
        self.n_running_jobs += 1;
        *self.n_running_jobs_by_type.entry(job_type).or_insert(0) += 1;
        true
    }

    /// Release a slot previously reserved with `reserve`.
    pub fn release(&mut self, job_type: JobType) {
        self.n_running_jobs = self.n_running_jobs.saturating_sub(1);
        if let Some(n) = self.n_running_jobs_by_type.get_mut(&job_type) {
            *n = n.saturating_sub(1);
        }
    }

    pub(super) fn allocate_id(&mut self) -> u64 {
        let id = self.next_job_id;
        self.next_job_id += 1;
        id
    }
}
