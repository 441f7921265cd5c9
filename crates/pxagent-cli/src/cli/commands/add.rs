//! `pxagent add` – queue a dataset for the running agent.

use anyhow::Result;
use pxagent_core::commands::{AgentCommand, CommandLog};
use std::path::Path;

pub fn run_add(home: &Path, dataset_id: &str) -> Result<()> {
    std::fs::create_dir_all(home)?;
    CommandLog::append(home, &AgentCommand::AddDataset(dataset_id.to_string()))?;
    println!("Queued dataset {}", dataset_id);
    Ok(())
}
