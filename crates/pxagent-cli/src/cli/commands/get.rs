//! `pxagent get` – queue an ad-hoc download for the running agent.

use anyhow::Result;
use pxagent_core::commands::{AgentCommand, CommandLog};
use std::path::Path;

pub fn run_get(home: &Path, url: &str) -> Result<()> {
    std::fs::create_dir_all(home)?;
    CommandLog::append(home, &AgentCommand::Get(url.to_string()))?;
    println!("Queued download of {}", url);
    Ok(())
}
