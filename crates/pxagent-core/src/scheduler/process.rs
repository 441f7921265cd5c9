//! Spawning and signalling child processes.

use std::io;
use std::path::Path;
use std::process::{Child, Command, Stdio};

/// Spawn `args[0]` with the remaining args in `location`. Output is
/// discarded so a chatty child can never block on a full pipe.
pub(super) fn spawn(args: &[String], location: &Path) -> io::Result<Child> {
    let (program, rest) = args
        .split_first()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command line"))?;
    Command::new(program)
        .args(rest)
        .current_dir(location)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
}

/// Ask the child to exit (SIGTERM). Elsewhere this falls back to a hard kill.
pub(super) fn terminate(child: &mut Child) -> io::Result<()> {
    #[cfg(unix)]
    {
        let pid = libc::pid_t::try_from(child.id())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
        let r = unsafe { libc::kill(pid, libc::SIGTERM) };
        if r == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ESRCH) {
            return Ok(());
        }
        Err(err)
    }
    #[cfg(not(unix))]
    {
        child.kill()
    }
}
