//! Command ingestion from an append-only text file.
//!
//! Producers append one command per line to `agent_commands.txt`. The agent
//! keeps the byte offset of the last consumed line in
//! `agent_commands.pointer` so that a restarted agent never re-runs a
//! command. Only newline-terminated lines are consumed; a line still being
//! written is picked up on a later poll.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

pub const COMMAND_FILE: &str = "agent_commands.txt";
pub const POINTER_FILE: &str = "agent_commands.pointer";

#[derive(Debug, Error)]
pub enum CommandLogError {
    #[error("error reading command pointer file {path}: {reason}")]
    PointerRead { path: PathBuf, reason: String },
    #[error("error writing command pointer file {path}: {source}")]
    PointerWrite {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("error reading command file {path}: {source}")]
    CommandRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("error creating or appending command file {path}: {source}")]
    CommandWrite {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl CommandLogError {
    pub fn code(&self) -> &'static str {
        match self {
            CommandLogError::PointerRead { .. } => "PointerFileReadError",
            CommandLogError::PointerWrite { .. } => "PointerFileWriteError",
            CommandLogError::CommandRead { .. } => "CommandFileReadError",
            CommandLogError::CommandWrite { .. } => "CommandFileCreateError",
        }
    }
}

/// Commands understood by the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentCommand {
    /// `add_dataset <ID>`: start tracking a dataset.
    AddDataset(String),
    /// `get <URL>`: one-off download into the data path.
    Get(String),
}

impl FromStr for AgentCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim();
        let (verb, arg) = match line.split_once(char::is_whitespace) {
            Some((verb, arg)) => (verb, arg.trim()),
            None => (line, ""),
        };
        if arg.is_empty() {
            return Err(format!("unable to interpret command '{}'", line));
        }
        match verb {
            "add_dataset" => Ok(AgentCommand::AddDataset(arg.to_string())),
            "get" => Ok(AgentCommand::Get(arg.to_string())),
            _ => Err(format!("unable to interpret command '{}'", line)),
        }
    }
}

impl std::fmt::Display for AgentCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentCommand::AddDataset(id) => write!(f, "add_dataset {}", id),
            AgentCommand::Get(url) => write!(f, "get {}", url),
        }
    }
}

/// Reader side of the command file with its persisted cursor.
#[derive(Debug)]
pub struct CommandLog {
    command_file: PathBuf,
    pointer_file: PathBuf,
    offset: u64,
}

impl CommandLog {
    /// Open the log in `home`, reading the cursor (or creating it at 0) and
    /// creating an empty command file if there is none.
    pub fn open(home: &Path) -> Result<Self, CommandLogError> {
        let mut log = Self {
            command_file: home.join(COMMAND_FILE),
            pointer_file: home.join(POINTER_FILE),
            offset: 0,
        };

        if log.pointer_file.exists() {
            log.offset = read_pointer(&log.pointer_file)?;
        } else {
            log.write_pointer()?;
        }

        if !log.command_file.exists() {
            fs::File::create(&log.command_file).map_err(|source| {
                CommandLogError::CommandWrite {
                    path: log.command_file.clone(),
                    source,
                }
            })?;
        }

        Ok(log)
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn write_pointer(&self) -> Result<(), CommandLogError> {
        fs::write(&self.pointer_file, format!("{}\n", self.offset)).map_err(|source| {
            CommandLogError::PointerWrite {
                path: self.pointer_file.clone(),
                source,
            }
        })
    }

    /// Return the next complete line past the cursor, advancing and
    /// persisting the cursor. Blank lines are skipped.
    pub fn next_line(&mut self) -> Result<Option<String>, CommandLogError> {
        let data = match fs::read(&self.command_file) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CommandLogError::CommandRead {
                    path: self.command_file.clone(),
                    source,
                })
            }
        };

        // A truncated file would leave the cursor past its end; wait for it
        // to grow again rather than moving the cursor backwards.
        let mut start = self.offset as usize;
        while start < data.len() {
            let Some(rel_end) = data[start..].iter().position(|b| *b == b'\n') else {
                return Ok(None);
            };
            let end = start + rel_end + 1;
            let line = String::from_utf8_lossy(&data[start..end]).trim().to_string();
            self.offset = end as u64;
            self.write_pointer()?;
            if !line.is_empty() {
                return Ok(Some(line));
            }
            start = end;
        }
        Ok(None)
    }

    /// Drain all complete lines currently available.
    pub fn read_new_lines(&mut self) -> Result<Vec<String>, CommandLogError> {
        let mut lines = Vec::new();
        while let Some(line) = self.next_line()? {
            lines.push(line);
        }
        Ok(lines)
    }

    /// Producer side: append one command line to the command file in `home`.
    pub fn append(home: &Path, command: &AgentCommand) -> Result<(), CommandLogError> {
        let path = home.join(COMMAND_FILE);
        let write_err = |source| CommandLogError::CommandWrite {
            path: path.clone(),
            source,
        };
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(write_err)?;
        writeln!(file, "{}", command).map_err(write_err)
    }
}

fn read_pointer(path: &Path) -> Result<u64, CommandLogError> {
    let text = fs::read_to_string(path).map_err(|e| CommandLogError::PointerRead {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let last = text.lines().map(str::trim).filter(|l| !l.is_empty()).last();
    match last {
        None => Ok(0),
        Some(value) => value.parse().map_err(|_| CommandLogError::PointerRead {
            path: path.to_path_buf(),
            reason: format!("not a byte offset: '{}'", value),
        }),
    }
}
