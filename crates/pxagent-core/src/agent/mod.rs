//! The agent: owns the dataset processor, translator and job scheduler and
//! drives them one poll cycle at a time.
//!
//! [`Agent::cycle`] is synchronous; [`runner::run`] calls it from the tokio
//! blocking pool between sleeps.

pub mod runner;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::commands::{AgentCommand, CommandLog, CommandLogError};
use crate::config::{AgentConfig, ConfigError};
use crate::control::{ControlError, ProcessMarkers};
use crate::model::FileStatus;
use crate::processor::DatasetProcessor;
use crate::remote::RemoteCatalog;
use crate::report::{Report, Severity};
use crate::scheduler::{
    JobControl, JobOutcome, JobScheduler, JOB_LAUNCH_FAILED, MAX_RETRIES_REACHED,
};
use crate::translator::TaskTranslator;

/// Fatal problems while starting the agent.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Control(#[from] ControlError),
    #[error(transparent)]
    CommandLog(#[from] CommandLogError),
    #[error("cannot create agent home {path}: {source}")]
    Home {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("specified data_path {0} is missing")]
    MissingDataPath(PathBuf),
}

impl AgentError {
    pub fn code(&self) -> &'static str {
        match self {
            AgentError::Config(e) => e.code(),
            AgentError::Control(e) => e.code(),
            AgentError::CommandLog(e) => e.code(),
            AgentError::Home { .. } => "CannotCreateHome",
            AgentError::MissingDataPath(_) => "MissingDataPath",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Starting,
    Running,
    Stopping,
    Stopped,
}

impl AgentState {
    pub fn as_str(self) -> &'static str {
        match self {
            AgentState::Starting => "Starting",
            AgentState::Running => "Running",
            AgentState::Stopping => "Stopping",
            AgentState::Stopped => "Stopped",
        }
    }
}

pub struct Agent {
    config: AgentConfig,
    home: PathBuf,
    markers: ProcessMarkers,
    commands: Option<CommandLog>,
    processor: DatasetProcessor,
    translator: TaskTranslator,
    scheduler: JobScheduler,
    report: Report,
    state: AgentState,
    previous_show: String,
}

impl Agent {
    pub fn new(
        config: AgentConfig,
        home: &Path,
        catalog: Box<dyn RemoteCatalog>,
        translator: TaskTranslator,
    ) -> Self {
        let control = JobControl::new(config.max_running_jobs, config.type_caps());
        Self {
            processor: DatasetProcessor::new(config.data_path.clone(), catalog),
            scheduler: JobScheduler::new(control),
            markers: ProcessMarkers::new(home),
            home: home.to_path_buf(),
            commands: None,
            translator,
            config,
            report: Report::new(),
            state: AgentState::Starting,
            previous_show: String::new(),
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    pub fn processor(&self) -> &DatasetProcessor {
        &self.processor
    }

    pub fn scheduler(&self) -> &JobScheduler {
        &self.scheduler
    }

    /// Claim the home directory, open the command log and check the data
    /// path. Any failure is fatal and is also recorded in the report.
    pub fn start(&mut self) -> Result<u32, AgentError> {
        self.report.debug("Preparing the agent state");
        let result = self.prepare();
        match &result {
            Ok(pid) => {
                self.report
                    .info(format!("Agent started with PID {} in {}", pid, self.home.display()));
                self.state = AgentState::Running;
            }
            Err(e) => self.report.error(e.code(), e.to_string()),
        }
        result
    }

    fn prepare(&mut self) -> Result<u32, AgentError> {
        fs::create_dir_all(&self.home).map_err(|source| AgentError::Home {
            path: self.home.clone(),
            source,
        })?;
        let pid = self.markers.acquire()?;
        self.commands = Some(CommandLog::open(&self.home)?);
        if !self.config.data_path.exists() {
            self.markers.release();
            return Err(AgentError::MissingDataPath(self.config.data_path.clone()));
        }
        Ok(pid)
    }

    pub fn stop_requested(&self) -> bool {
        self.markers.stop_requested()
    }

    /// One poll cycle: commands, one step per dataset, translate tasks,
    /// launch, poll.
    pub fn cycle(&mut self) {
        self.read_commands();

        self.processor.process(&mut self.report);

        let show = self.processor.show();
        if show != self.previous_show {
            self.report.info(show.trim_end().to_string());
            self.previous_show = show;
        }

        for task in self.processor.take_tasks() {
            match self.translator.translate(&task) {
                Ok(spec) => {
                    self.scheduler.add(spec);
                }
                Err(e) => self.report.warning(format!(
                    "Cannot queue {} for {}: {}",
                    task.command.as_str(),
                    task.file,
                    e
                )),
            }
        }

        let launched = self.scheduler.launch();
        self.apply_outcomes(launched);
        let polled = self.scheduler.poll();
        self.apply_outcomes(polled);

        if self.scheduler.control().n_running_jobs() > 0 {
            self.scheduler.show_jobs();
        }
    }

    fn read_commands(&mut self) {
        let Some(log) = self.commands.as_mut() else {
            return;
        };
        let lines = match log.read_new_lines() {
            Ok(lines) => lines,
            Err(e) => {
                self.report.error(e.code(), e.to_string());
                return;
            }
        };
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<AgentCommand>() {
                Ok(command) => self.execute(command),
                Err(e) => self.report.warning(e),
            }
        }
    }

    /// Execute one command from the command log.
    pub fn execute(&mut self, command: AgentCommand) {
        self.report.info(format!("Received command '{}'", command));
        match command {
            AgentCommand::AddDataset(id) => {
                self.processor.add_dataset(&id, &mut self.report);
            }
            AgentCommand::Get(url) => {
                match self.translator.translate_get(&url, &self.config.data_path) {
                    Ok(spec) => {
                        let job_id = self.scheduler.add(spec);
                        self.report
                            .info(format!("Queued job {} to download {}", job_id, url));
                    }
                    Err(e) => self.report.warning(e.to_string()),
                }
            }
        }
    }

    /// Reflect scheduler outcomes on the FileRecords they refer to.
    pub fn apply_outcomes(&mut self, outcomes: Vec<JobOutcome>) {
        for outcome in outcomes {
            self.apply_outcome(outcome);
        }
    }

    fn apply_outcome(&mut self, outcome: JobOutcome) {
        let (file, status) = match &outcome {
            JobOutcome::Launched { file, .. } => (file, FileStatus::Downloading),
            JobOutcome::Completed { file, .. } => (file, FileStatus::Ready),
            JobOutcome::Requeued { file, .. } | JobOutcome::LaunchFailed { file, .. } => {
                (file, FileStatus::Todo)
            }
            JobOutcome::Exhausted { file, .. } => (file, FileStatus::Unavailable),
        };

        match &outcome {
            JobOutcome::Completed { job_id, file: None, .. } => {
                self.report.info(format!("Job {} is complete", job_id))
            }
            JobOutcome::Exhausted {
                job_id,
                n_retries,
                reason,
                file,
            } => self.report.error(
                MAX_RETRIES_REACHED,
                format!(
                    "Job {} gave up after {} retries ({}){}",
                    job_id,
                    n_retries,
                    reason,
                    file.as_ref()
                        .map(|f| format!(" for {}", f))
                        .unwrap_or_default()
                ),
            ),
            JobOutcome::LaunchFailed { job_id, error, .. } => self.report.error(
                JOB_LAUNCH_FAILED,
                format!("Unable to launch job {}: {}", job_id, error),
            ),
            _ => {}
        }

        let Some(file) = file else {
            return;
        };
        let Some(record) = self.processor.file_mut(file) else {
            self.report
                .warning(format!("No file record for {}; outcome dropped", file));
            return;
        };
        match (&outcome, status) {
            (JobOutcome::Completed { size, .. }, _) => {
                let size = size.or_else(|| record.local_size()).unwrap_or(0);
                record.mark_ready(size);
            }
            (_, status) => record.status = status,
        }
    }

    /// Status summary: agent state, datasets, jobs and the message log.
    pub fn show(&self) -> String {
        let mut buffer = format!(
            "Automation agent: status: {}, state: {}\n",
            self.report.status(),
            self.state.as_str()
        );
        buffer.push_str(&self.processor.show());
        buffer.push_str(&self.scheduler.show_jobs());
        buffer.push_str(&self.report.show(Severity::Debug));
        buffer
    }

    /// Remove markers; running jobs are terminated only if `kill_jobs`.
    pub fn stop(&mut self, kill_jobs: bool) {
        self.state = AgentState::Stopping;
        self.report.info("Stopping agent");
        if kill_jobs {
            let n = self.scheduler.shutdown();
            if n > 0 {
                self.report.info(format!("Terminated {} running jobs", n));
            }
        } else if self.scheduler.control().n_running_jobs() > 0 {
            self.report.warning(format!(
                "Leaving {} jobs running",
                self.scheduler.control().n_running_jobs()
            ));
        }
        self.markers.release();
        self.state = AgentState::Stopped;
    }
}
