use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use serde::Deserialize;

use sg_core::{DEFAULT_SUBSPACE_PORT, DEFAULT_TIMEOUT_SECS};

use crate::error::{Result, StoreError};

pub const CONFIG_FILE: &str = "config.toml";

/// Gate-local settings. Everything has a default so a fresh install can
/// dial before a config file exists.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GateConfig {
    /// TCP port peer gates are reached on.
    pub subspace_port: u16,
    /// Connect/IO timeout for one subspace exchange, in seconds.
    pub timeout_secs: u64,
    /// Listener bind address.
    pub bind: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            subspace_port: DEFAULT_SUBSPACE_PORT,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            bind: "0.0.0.0".to_string(),
        }
    }
}

impl GateConfig {
    /// Load `config.toml` under the data dir; an absent file means
    /// defaults, anything else malformed is an error.
    pub fn load(base_dir: &Path) -> Result<Self> {
        let path = base_dir.join(CONFIG_FILE);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(StoreError::InvalidData(format!(
                "read {}: {e}",
                path.display()
            ))),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Default base directory for gate data.
pub fn default_base_dir() -> PathBuf {
    dirs_home().join(".stargate")
}

fn dirs_home() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}
