use log::{info, warn};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::config::{AppConfig, PinConfig};
use crate::error::GpioError;
use crate::executor::CommandResult;
use crate::line::{Direction, LineController, LineState};
use crate::pins::LogicalPin;

pub const DEFAULT_SYSFS_ROOT: &str = "/sys/class/gpio";

/// Access to the attribute files of the sysfs gpio class.
///
/// Writes report `Success("")` when the attribute accepted the value. Reads
/// report the file content with the trailing newline removed. Diagnostic
/// detail of a failure is logged by the implementation and not returned.
pub trait SysfsBackend: Send + Sync + 'static {
    fn write_attr(&self, path: &Path, value: &str) -> impl Future<Output = CommandResult> + Send;
    fn read_attr(&self, path: &Path) -> impl Future<Output = CommandResult> + Send;
}

/// Paths of the control files below a sysfs gpio root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysfsLayout {
    root: PathBuf,
}

impl Default for SysfsLayout {
    fn default() -> Self {
        Self::new(DEFAULT_SYSFS_ROOT)
    }
}

impl SysfsLayout {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn export_path(&self) -> PathBuf {
        self.root.join("export")
    }

    pub fn unexport_path(&self) -> PathBuf {
        self.root.join("unexport")
    }

    pub fn line_dir(&self, line: u32) -> PathBuf {
        self.root.join(format!("gpio{line}"))
    }

    pub fn direction_path(&self, line: u32) -> PathBuf {
        self.line_dir(line).join("direction")
    }

    pub fn value_path(&self, line: u32) -> PathBuf {
        self.line_dir(line).join("value")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PinDescriptor {
    pub name: String,
    pub physical: u32,
    pub logical: LogicalPin,
    pub direction: Direction,
    /// Read back from the hardware, `null` while the line is not exported.
    pub reported_direction: Option<Direction>,
    pub state: LineState,
}

struct PinEntry<B: SysfsBackend> {
    name: String,
    line: Mutex<LineController<B>>,
}

/// Owns one [`LineController`] per configured physical pin.
///
/// Requests for the same pin are serialized by the per-pin mutex, requests for
/// different pins run independently.
pub struct GpioManager<B: SysfsBackend> {
    pins: FxHashMap<u32, PinEntry<B>>,
}

impl<B: SysfsBackend> GpioManager<B> {
    pub fn new(config: &AppConfig, backend: Arc<B>) -> Result<Self, GpioError> {
        let layout = config.sysfs.layout();
        let mut pins = FxHashMap::default();

        for (physical, PinConfig { name, direction }) in &config.pins {
            let line = LineController::new(backend.clone(), layout.clone(), *physical, *direction)?
                .with_release_on_drop(config.release_on_drop);
            pins.insert(
                *physical,
                PinEntry {
                    name: name.clone(),
                    line: Mutex::new(line),
                },
            );
        }

        Ok(Self { pins })
    }

    fn pin(&self, physical: u32) -> Result<&PinEntry<B>, GpioError> {
        self.pins
            .get(&physical)
            .ok_or_else(|| GpioError::NotFoundPin(physical.to_string()))
    }

    async fn describe(name: &str, line: &LineController<B>) -> PinDescriptor {
        PinDescriptor {
            name: name.to_string(),
            physical: line.physical(),
            logical: line.line(),
            direction: line.direction(),
            reported_direction: line.read_direction().await,
            state: line.state(),
        }
    }

    pub async fn list_pins(&self) -> BTreeMap<u32, PinDescriptor> {
        let mut out = BTreeMap::new();
        for (physical, entry) in &self.pins {
            let line = entry.line.lock().await;
            out.insert(*physical, Self::describe(&entry.name, &line).await);
        }
        out
    }

    pub async fn get_pin_descriptor(&self, physical: u32) -> Result<PinDescriptor, GpioError> {
        let entry = self.pin(physical)?;
        let line = entry.line.lock().await;

        Ok(Self::describe(&entry.name, &line).await)
    }

    pub async fn initialize(&self, physical: u32) -> Result<PinDescriptor, GpioError> {
        let entry = self.pin(physical)?;
        let mut line = entry.line.lock().await;
        line.initialize().await?;

        Ok(Self::describe(&entry.name, &line).await)
    }

    pub async fn turn_on(&self, physical: u32) -> Result<bool, GpioError> {
        self.pin(physical)?.line.lock().await.turn_on().await
    }

    pub async fn turn_off(&self, physical: u32) -> Result<bool, GpioError> {
        self.pin(physical)?.line.lock().await.turn_off().await
    }

    pub async fn is_on(&self, physical: u32) -> Result<bool, GpioError> {
        self.pin(physical)?.line.lock().await.is_on().await
    }

    pub async fn read_value(&self, physical: u32) -> Result<Option<String>, GpioError> {
        self.pin(physical)?.line.lock().await.read_value().await
    }

    pub async fn unexport(&self, physical: u32) -> Result<bool, GpioError> {
        Ok(self.pin(physical)?.line.lock().await.unexport().await)
    }

    /// Unexports every pin that still holds its line. Returns how many were
    /// released successfully.
    pub async fn release_all(&self) -> usize {
        let mut released = 0;
        for (physical, entry) in &self.pins {
            let mut line = entry.line.lock().await;
            if !line.state().holds_line() {
                continue;
            }
            if line.unexport().await {
                released += 1;
            } else {
                warn!("pin {physical} could not be unexported on shutdown");
            }
        }
        info!("released {released} gpio line(s)");
        released
    }
}
