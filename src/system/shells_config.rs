// src/system/shells_config.rs

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{CONFIG_DIR_NAME, SHELL_CONFIG_FILENAME};

lazy_static! {
    static ref CONFIG_DIR: Mutex<Option<PathBuf>> = Mutex::new(None);
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not find system config directory.")]
    ConfigDirNotFound,
    #[error("Could not create config directory at '{path}': {source}")]
    ConfigDirCreation {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse shell.toml: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Failed to serialize shell config to TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Top-level contents of `shell.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WrapperConfig {
    pub shell: ShellConfig,
}

/// The wrapped interpreter: where it lives, how to start it quietly, and the
/// name of the console-host child that must be preserved across a break.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConfig {
    /// Path to the interpreter. `~` is expanded at spawn time.
    pub path: String,
    /// Arguments that suppress the interpreter's startup banner.
    #[serde(default)]
    pub quiet_args: Vec<String>,
    /// Process name of the interactive console host descendant. When absent,
    /// host discovery is skipped and a break kills all descendants.
    #[serde(default)]
    pub host_process: Option<String>,
}

impl ShellConfig {
    pub fn expanded_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.path).into_owned())
    }
}

/// Loads the wrapper configuration, generating the default file on first run.
pub fn load_config() -> Result<WrapperConfig, ConfigError> {
    let config_path = get_config_dir()?.join(SHELL_CONFIG_FILENAME);
    if !config_path.exists() {
        let default_config = default_config();
        let toml_string = toml::to_string_pretty(&default_config)?;
        fs::write(&config_path, toml_string)?;
        log::debug!("default shell config written to {}", config_path.display());
        Ok(default_config)
    } else {
        load_from(&config_path)
    }
}

/// Parses an existing configuration file.
pub fn load_from(path: &Path) -> Result<WrapperConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

fn default_config() -> WrapperConfig {
    let shell = if cfg!(target_os = "windows") {
        ShellConfig {
            path: "cmd.exe".to_string(),
            quiet_args: vec!["/Q".to_string()],
            host_process: Some("conhost.exe".to_string()),
        }
    } else {
        ShellConfig {
            path: "bash".to_string(),
            quiet_args: Vec::new(),
            host_process: None,
        }
    };
    WrapperConfig { shell }
}

/// Returns the path to the clickshell configuration directory, creating it
/// if needed. Memoized: the first call computes and caches the path.
fn get_config_dir() -> Result<PathBuf, ConfigError> {
    let mut cached = CONFIG_DIR
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(path) = &*cached {
        return Ok(path.clone());
    }

    let config_path = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join(CONFIG_DIR_NAME);
    if !config_path.exists() {
        fs::create_dir_all(&config_path).map_err(|source| ConfigError::ConfigDirCreation {
            path: config_path.display().to_string(),
            source,
        })?;
    }

    *cached = Some(config_path.clone());
    Ok(config_path)
}
