//! CLI for the pxagent dataset acquisition agent.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pxagent_core::config;
use pxagent_core::control::default_home_dir;
use std::path::PathBuf;

use commands::{run_add, run_agent, run_get, run_status, run_stop};

/// Top-level CLI for pxagent.
#[derive(Debug, Parser)]
#[command(name = "pxagent")]
#[command(
    about = "pxagent: fetch ProteomeXchange datasets and convert their raw files",
    long_about = None
)]
pub struct Cli {
    /// Configuration file (default: $XDG_CONFIG_HOME/pxagent/config.toml).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Agent home holding the PID, STOP and command files
    /// (default: $XDG_STATE_HOME/pxagent).
    #[arg(long, global = true, value_name = "DIR")]
    pub home: Option<PathBuf>,

    /// Log to stderr instead of the log file.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run the agent poll loop until a STOP file appears or Ctrl-C.
    Run {
        /// Terminate running download and conversion jobs on shutdown.
        #[arg(long)]
        kill_jobs: bool,
        /// Raw to mzML converter executable.
        #[arg(long, value_name = "PATH")]
        converter: Option<String>,
    },

    /// Show whether an agent is running in the home directory.
    Status,

    /// Ask the running agent to process a ProteomeXchange dataset.
    Add {
        /// Dataset identifier, e.g. PXD000001.
        dataset_id: String,
    },

    /// Ask the running agent to download a single URL into the data path.
    Get {
        /// Direct HTTP/HTTPS/FTP URL.
        url: String,
    },

    /// Ask the running agent to stop at its next poll.
    Stop,
}

impl Cli {
    fn home_dir(&self) -> Result<PathBuf> {
        match &self.home {
            Some(home) => Ok(home.clone()),
            None => default_home_dir().context("cannot determine the agent home directory"),
        }
    }

    pub async fn run(self) -> Result<()> {
        let home = self.home_dir()?;

        match self.command {
            CliCommand::Run {
                kill_jobs,
                converter,
            } => {
                let cfg = match &self.config {
                    Some(path) => config::load_or_init_at(path)?,
                    None => config::load_or_init()?,
                };
                tracing::debug!("loaded config: {:?}", cfg);
                run_agent(cfg, &home, converter, kill_jobs).await?;
            }
            CliCommand::Status => run_status(&home)?,
            CliCommand::Add { dataset_id } => run_add(&home, &dataset_id)?,
            CliCommand::Get { url } => run_get(&home, &url)?,
            CliCommand::Stop => run_stop(&home)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
