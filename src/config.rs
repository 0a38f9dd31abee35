use std::{fs, path::Path, path::PathBuf, time::Duration};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::GpioError;
use crate::executor::DEFAULT_COMMAND_TIMEOUT;
use crate::gpio::{DEFAULT_SYSFS_ROOT, SysfsLayout};
use crate::line::Direction;
use crate::pins;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    pub unix_socket: Option<String>,
    pub host: Option<String>,
    pub path: String,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// Direct reads and writes of the attribute files.
    #[default]
    File,
    /// `echo` / `cat` through `sh`.
    Shell,
    /// In-memory emulation, for running without hardware.
    Mock,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SysfsConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for SysfsConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            backend: BackendKind::default(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl SysfsConfig {
    pub fn layout(&self) -> SysfsLayout {
        SysfsLayout::new(&self.root)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(DEFAULT_SYSFS_ROOT)
}

fn default_timeout_ms() -> u64 {
    DEFAULT_COMMAND_TIMEOUT.as_millis() as u64
}

fn default_release_on_drop() -> bool {
    true
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PinConfig {
    pub name: String,
    pub direction: Direction,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub http: HttpConfig,
    #[serde(default)]
    pub sysfs: SysfsConfig,
    #[serde(default = "default_release_on_drop")]
    pub release_on_drop: bool,
    pub pins: FxHashMap<u32, PinConfig>, // keyed by physical pin
}

impl AppConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, GpioError> {
        let contents = fs::read_to_string(&path)
            .map_err(|e| GpioError::Config(format!("Failed to read config: {e}")))?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self, GpioError> {
        let config: Self = serde_json::from_str(contents)
            .map_err(|e| GpioError::Config(format!("Invalid config json: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), GpioError> {
        if self.http.unix_socket.is_none() && self.http.host.is_none() {
            return Err(GpioError::Config(
                "either 'unix_socket' or 'host' must be specified".into(),
            ));
        }
        if self.sysfs.timeout_ms == 0 {
            return Err(GpioError::Config("'timeout_ms' must be positive".into()));
        }
        for physical in self.pins.keys() {
            pins::translate(*physical)
                .map_err(|e| GpioError::Config(format!("pin {physical}: {e}")))?;
        }
        Ok(())
    }
}
