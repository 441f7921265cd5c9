use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::scheduler::JobType;

/// Errors raised while reading, writing or validating the agent config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot locate config directory: {0}")]
    Xdg(#[from] xdg::BaseDirectoriesError),
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("cannot serialize default config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config value: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Stable code used when the error is reported.
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Xdg(_) | ConfigError::Read { .. } => "ConfigFileReadError",
            ConfigError::Write { .. } | ConfigError::Serialize(_) => "ConfigFileWriteError",
            ConfigError::Parse { .. } => "ConfigFileKeyError",
            ConfigError::Invalid(_) => "ConfigValueError",
        }
    }
}

/// Agent configuration loaded from `~/.config/pxagent/config.toml`.
///
/// Unknown keys are rejected so that misspelled settings fail loudly instead
/// of silently falling back to defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Seconds to sleep between poll cycles.
    pub sleep_interval: u64,
    /// Seconds between "agent is alive" log lines.
    pub heartbeat_interval: u64,
    /// Root directory under which every dataset gets its own directory.
    pub data_path: PathBuf,
    /// Maximum number of jobs running at once, all types together.
    pub max_running_jobs: usize,
    /// Per job type cap ("download", "convert"). Types not listed are only
    /// bounded by `max_running_jobs`.
    pub max_running_jobs_by_type: BTreeMap<String, usize>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        let mut by_type = BTreeMap::new();
        by_type.insert(JobType::Download.as_str().to_string(), 2);
        by_type.insert(JobType::Convert.as_str().to_string(), 1);
        Self {
            sleep_interval: 3,
            heartbeat_interval: 60,
            data_path: PathBuf::from("/proteomics/peptideatlas2/archive"),
            max_running_jobs: 2,
            max_running_jobs_by_type: by_type,
        }
    }
}

impl AgentConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(data: &str, path: &Path) -> Result<Self, ConfigError> {
        let cfg: AgentConfig = toml::from_str(data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check value ranges and per-type keys.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sleep_interval == 0 {
            return Err(ConfigError::Invalid("sleep_interval must be at least 1".into()));
        }
        if self.heartbeat_interval == 0 {
            return Err(ConfigError::Invalid(
                "heartbeat_interval must be at least 1".into(),
            ));
        }
        if self.max_running_jobs == 0 {
            return Err(ConfigError::Invalid(
                "max_running_jobs must be at least 1".into(),
            ));
        }
        for (name, cap) in &self.max_running_jobs_by_type {
            if name.parse::<JobType>().is_err() {
                return Err(ConfigError::Invalid(format!(
                    "max_running_jobs_by_type has unknown job type '{}'",
                    name
                )));
            }
            if *cap == 0 {
                return Err(ConfigError::Invalid(format!(
                    "max_running_jobs_by_type.{} must be at least 1",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Per-type caps keyed by job type.
    pub fn type_caps(&self) -> BTreeMap<JobType, usize> {
        self.max_running_jobs_by_type
            .iter()
            .filter_map(|(name, cap)| name.parse::<JobType>().ok().map(|t| (t, *cap)))
            .collect()
    }
}

pub fn config_path() -> Result<PathBuf, ConfigError> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("pxagent")?;
    Ok(xdg_dirs.get_config_home().join("config.toml"))
}

/// Load configuration from the default location, creating it if missing.
pub fn load_or_init() -> Result<AgentConfig, ConfigError> {
    load_or_init_at(&config_path()?)
}

/// Load configuration from `path`. If the file does not exist a default one
/// is written there and the defaults are returned.
pub fn load_or_init_at(path: &Path) -> Result<AgentConfig, ConfigError> {
    if !path.exists() {
        let default_cfg = AgentConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(write_err)?;
            }
        }
        fs::write(path, toml).map_err(write_err)?;
        tracing::warn!(
            "did not find config file {}, created one with current defaults",
            path.display()
        );
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let cfg = AgentConfig::from_toml_str(&data, path)?;
    tracing::info!("read agent config file {}", path.display());
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> Result<AgentConfig, ConfigError> {
        AgentConfig::from_toml_str(toml, Path::new("test.toml"))
    }

    #[test]
    fn default_config_values() {
        let cfg = AgentConfig::default();
        assert_eq!(cfg.sleep_interval, 3);
        assert_eq!(cfg.heartbeat_interval, 60);
        assert_eq!(cfg.max_running_jobs, 2);
        assert_eq!(cfg.max_running_jobs_by_type.get("download"), Some(&2));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn config_toml_custom_values() {
        let cfg = parse(
            r#"
            sleep_interval = 5
            heartbeat_interval = 120
            data_path = "/data/px"
            max_running_jobs = 4

            [max_running_jobs_by_type]
            download = 3
            convert = 1
        "#,
        )
        .unwrap();
        assert_eq!(cfg.sleep_interval, 5);
        assert_eq!(cfg.data_path, PathBuf::from("/data/px"));
        let caps = cfg.type_caps();
        assert_eq!(caps.get(&JobType::Download), Some(&3));
        assert_eq!(caps.get(&JobType::Convert), Some(&1));
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = parse(
            r#"
            sleep_interval = 5
            heartbeat_interval = 120
            data_path = "/data/px"
            max_running_jobs = 4
            max_runing_jobs = 9
            [max_running_jobs_by_type]
            download = 3
        "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert_eq!(err.code(), "ConfigFileKeyError");
    }

    #[test]
    fn unknown_job_type_is_rejected() {
        let err = parse(
            r#"
            sleep_interval = 5
            heartbeat_interval = 120
            data_path = "/data/px"
            max_running_jobs = 4
            [max_running_jobs_by_type]
            upload = 3
        "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn zero_global_cap_is_rejected() {
        let mut cfg = AgentConfig::default();
        cfg.max_running_jobs = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn load_or_init_writes_defaults_then_reads_them_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let created = load_or_init_at(&path).unwrap();
        assert!(path.exists());
        let reread = load_or_init_at(&path).unwrap();
        assert_eq!(created, reread);
    }
}
