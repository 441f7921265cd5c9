//! `pxagent status` – report whether an agent owns the home directory.

use anyhow::Result;
use pxagent_core::control::ProcessMarkers;
use std::path::Path;

pub fn run_status(home: &Path) -> Result<()> {
    let markers = ProcessMarkers::new(home);
    match markers.running_pid() {
        Some(pid) => {
            println!("pxagent is running with PID {}", pid);
            if markers.stop_requested() {
                println!("a stop has been requested");
            }
        }
        None => println!("pxagent is not running in {}", home.display()),
    }
    Ok(())
}
