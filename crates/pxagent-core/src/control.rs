//! Process lifecycle markers: a `PID` file while an agent is running and a
//! `STOP` file that asks the running agent to shut down at its next poll.
//!
//! Both live in the agent home directory (XDG state dir by default). A
//! control client (e.g. `pxagent stop`) only needs to create the STOP file.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const PID_FILE: &str = "PID";
pub const STOP_FILE: &str = "STOP";

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("there is already a PID file {0}; another instance is running")]
    AlreadyRunning(PathBuf),
    #[error("cannot delete STOP signal file {path}: {source}")]
    CannotDeleteStop {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unable to write PID file {path}: {source}")]
    CannotWritePid {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unable to write STOP file {path}: {source}")]
    CannotWriteStop {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ControlError {
    pub fn code(&self) -> &'static str {
        match self {
            ControlError::AlreadyRunning(_) => "PIDFileAlreadyExists",
            ControlError::CannotDeleteStop { .. } => "CannotDeleteSTOPFile",
            ControlError::CannotWritePid { .. } => "CannotWritePIDFile",
            ControlError::CannotWriteStop { .. } => "CannotWriteSTOPFile",
        }
    }
}

/// Marker files for one agent home. Markers acquired through
/// [`ProcessMarkers::acquire`] are removed again on [`ProcessMarkers::release`]
/// or when the value is dropped.
#[derive(Debug)]
pub struct ProcessMarkers {
    pid_file: PathBuf,
    stop_file: PathBuf,
    held: bool,
}

impl ProcessMarkers {
    pub fn new(home: &Path) -> Self {
        Self {
            pid_file: home.join(PID_FILE),
            stop_file: home.join(STOP_FILE),
            held: false,
        }
    }

    pub fn pid_file(&self) -> &Path {
        &self.pid_file
    }

    pub fn stop_file(&self) -> &Path {
        &self.stop_file
    }

    /// Claim the home for this process: fails if a PID file already exists,
    /// removes a leftover STOP file, then writes our PID.
    pub fn acquire(&mut self) -> Result<u32, ControlError> {
        if self.pid_file.exists() {
            return Err(ControlError::AlreadyRunning(self.pid_file.clone()));
        }
        if self.stop_file.exists() {
            fs::remove_file(&self.stop_file).map_err(|source| {
                ControlError::CannotDeleteStop {
                    path: self.stop_file.clone(),
                    source,
                }
            })?;
        }
        let pid = std::process::id();
        fs::write(&self.pid_file, format!("{}\n", pid)).map_err(|source| {
            ControlError::CannotWritePid {
                path: self.pid_file.clone(),
                source,
            }
        })?;
        self.held = true;
        tracing::debug!(pid, path = %self.pid_file.display(), "wrote PID file");
        Ok(pid)
    }

    /// True once someone has created the STOP file.
    pub fn stop_requested(&self) -> bool {
        self.stop_file.exists()
    }

    /// Create the STOP file so that a running agent shuts down.
    pub fn request_stop(&self) -> Result<(), ControlError> {
        fs::write(&self.stop_file, b"").map_err(|source| ControlError::CannotWriteStop {
            path: self.stop_file.clone(),
            source,
        })
    }

    /// PID recorded by a running agent, if any.
    pub fn running_pid(&self) -> Option<u32> {
        fs::read_to_string(&self.pid_file)
            .ok()
            .and_then(|s| s.trim().parse().ok())
    }

    /// Remove PID and STOP files if we hold them.
    pub fn release(&mut self) {
        if !self.held {
            return;
        }
        for path in [&self.pid_file, &self.stop_file] {
            if path.exists() {
                if let Err(e) = fs::remove_file(path) {
                    tracing::warn!(path = %path.display(), "cannot remove marker: {}", e);
                }
            }
        }
        self.held = false;
    }
}

impl Drop for ProcessMarkers {
    fn drop(&mut self) {
        self.release();
    }
}

/// Default agent home (same XDG state dir as the log file).
pub fn default_home_dir() -> std::io::Result<PathBuf> {
    let dir = xdg::BaseDirectories::with_prefix("pxagent")?.get_state_home();
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_writes_pid_and_release_removes_it() {
        let dir = tempfile::tempdir().unwrap();
        let mut markers = ProcessMarkers::new(dir.path());
        let pid = markers.acquire().unwrap();
        assert_eq!(markers.running_pid(), Some(pid));
        markers.release();
        assert!(!dir.path().join(PID_FILE).exists());
    }

    #[test]
    fn second_instance_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let mut first = ProcessMarkers::new(dir.path());
        first.acquire().unwrap();
        let mut second = ProcessMarkers::new(dir.path());
        let err = second.acquire().unwrap_err();
        assert_eq!(err.code(), "PIDFileAlreadyExists");
        // The refused instance must not delete the other's PID file on drop.
        drop(second);
        assert!(dir.path().join(PID_FILE).exists());
    }

    #[test]
    fn leftover_stop_is_cleared_then_detected_again() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(STOP_FILE), b"").unwrap();
        let mut markers = ProcessMarkers::new(dir.path());
        markers.acquire().unwrap();
        assert!(!markers.stop_requested());

        ProcessMarkers::new(dir.path()).request_stop().unwrap();
        assert!(markers.stop_requested());

        drop(markers);
        assert!(!dir.path().join(STOP_FILE).exists());
        assert!(!dir.path().join(PID_FILE).exists());
    }
}
