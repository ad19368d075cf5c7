//! Configuration file parsing and management.
//!
//! The only tunable is the concurrency limit. It can come from a TOML file,
//! an environment variable, or the caller; this module handles the first two
//! and leaves CLI precedence to the binary.

use crate::error::UrlCountError;
use crate::types::MAX_CONCURRENCY;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the concurrency limit.
pub const ENV_CONCURRENCY: &str = "URL_COUNT_CONCURRENCY";

/// Environment variable naming an explicit config file.
pub const ENV_CONFIG: &str = "URL_COUNT_CONFIG";

/// Configuration loaded from TOML files.
///
/// ```toml
/// [pipeline]
/// concurrency = 8
/// ```
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub pipeline: Option<PipelineSection>,
}

/// The `[pipeline]` table.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PipelineSection {
    /// Maximum concurrent fetches
    pub concurrency: Option<usize>,
}

impl FileConfig {
    pub fn concurrency(&self) -> Option<usize> {
        self.pipeline.as_ref().and_then(|p| p.concurrency)
    }
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Whether to log which files were picked up
    pub verbose: bool,
}

impl ConfigManager {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load configuration from a specific file.
    ///
    /// Missing files, unreadable files, invalid TOML and out-of-range values
    /// are all errors.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, UrlCountError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(UrlCountError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            UrlCountError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| {
            UrlCountError::config(format!(
                "Failed to parse TOML configuration '{}': {}",
                path.display(),
                e
            ))
        })?;

        self.validate_config(&config)?;

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config is lowest, then the home directory, then the current
    /// directory. Files that fail to load are skipped with a warning.
    pub fn discover_and_load(&self) -> FileConfig {
        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        let mut merged_config = FileConfig::default();
        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    if self.verbose {
                        info!(path = %path.display(), "loaded config file");
                    }
                    merged_config = self.merge_configs(merged_config, config);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "ignoring config file"),
            }
        }

        merged_config
    }

    /// Load `explicit` if given, otherwise fall back to discovery.
    pub fn load(&self, explicit: Option<&Path>) -> Result<FileConfig, UrlCountError> {
        match explicit {
            Some(path) => self.load_file(path),
            None => Ok(self.discover_and_load()),
        }
    }

    /// Looks for configuration files in the current directory.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        ["./url-count.toml", "./.url-count.toml"]
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    /// Looks for configuration files in the user's home directory.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        [".url-count.toml", "url-count.toml"]
            .iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|path| path.exists())
    }

    /// Follows the XDG Base Directory Specification.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("url-count").join("config.toml");
        path.exists().then_some(path)
    }

    /// Values from `higher` take precedence over values from `lower`.
    fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            pipeline: match (lower.pipeline, higher.pipeline) {
                (Some(mut lower_pipeline), Some(higher_pipeline)) => {
                    if higher_pipeline.concurrency.is_some() {
                        lower_pipeline.concurrency = higher_pipeline.concurrency;
                    }
                    Some(lower_pipeline)
                }
                (lower_pipeline, higher_pipeline) => higher_pipeline.or(lower_pipeline),
            },
        }
    }

    fn validate_config(&self, config: &FileConfig) -> Result<(), UrlCountError> {
        if let Some(concurrency) = config.concurrency() {
            if concurrency == 0 || concurrency > MAX_CONCURRENCY {
                return Err(UrlCountError::config(format!(
                    "Concurrency must be between 1 and {}",
                    MAX_CONCURRENCY
                )));
            }
        }
        Ok(())
    }
}

/// Configuration values read from `URL_COUNT_*` environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvConfig {
    pub concurrency: Option<usize>,
    pub config: Option<PathBuf>,
}

/// Load configuration from environment variables.
///
/// Invalid values are logged as warnings and ignored.
pub fn load_env_config(verbose: bool) -> EnvConfig {
    load_env_config_from(verbose, |key| env::var(key).ok())
}

/// Same as [`load_env_config`], with a custom variable lookup.
pub fn load_env_config_from<F>(verbose: bool, lookup: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();

    if let Some(val) = lookup(ENV_CONCURRENCY) {
        match val.trim().parse::<usize>() {
            Ok(concurrency) if (1..=MAX_CONCURRENCY).contains(&concurrency) => {
                env_config.concurrency = Some(concurrency);
                if verbose {
                    info!("using {}={}", ENV_CONCURRENCY, concurrency);
                }
            }
            _ => warn!(
                "invalid {}='{}', must be 1-{}",
                ENV_CONCURRENCY, val, MAX_CONCURRENCY
            ),
        }
    }

    if let Some(path) = lookup(ENV_CONFIG) {
        if !path.trim().is_empty() {
            if verbose {
                info!("using {}={}", ENV_CONFIG, path);
            }
            env_config.config = Some(PathBuf::from(path));
        }
    }

    env_config
}
