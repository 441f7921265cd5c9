//! `pxagent stop` – ask the running agent to shut down.

use anyhow::Result;
use pxagent_core::control::ProcessMarkers;
use std::path::Path;

pub fn run_stop(home: &Path) -> Result<()> {
    let markers = ProcessMarkers::new(home);
    let Some(pid) = markers.running_pid() else {
        println!("pxagent is not running in {}", home.display());
        return Ok(());
    };
    markers.request_stop()?;
    println!("Requested stop of PID {}", pid);
    Ok(())
}
