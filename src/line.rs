//! Lifecycle of a single sysfs gpio line.
//!
//! A [`LineController`] goes through `Created -> Exported -> Ready -> Released`.
//! Failures while bringing the line up are hard errors. Once the line is
//! ready, reads and writes report soft outcomes (`false` / `None`) so a
//! control loop can keep going after a transient failure.

use log::{debug, error, info, warn};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::GpioError;
use crate::gpio::{SysfsBackend, SysfsLayout};
use crate::pins::{self, LogicalPin};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "in")]
    Input,
    #[serde(rename = "out")]
    Output,
}

impl Direction {
    /// Word written to the `direction` attribute.
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Input => "in",
            Direction::Output => "out",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = GpioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in" => Ok(Direction::Input),
            "out" => Ok(Direction::Output),
            other => Err(GpioError::InvalidDirection(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineState {
    Created,
    Exported,
    Ready,
    Released,
}

impl LineState {
    /// Whether the kernel side of the line is (possibly) still exported.
    pub fn holds_line(self) -> bool {
        matches!(self, LineState::Exported | LineState::Ready)
    }
}

impl fmt::Display for LineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LineState::Created => "created",
            LineState::Exported => "exported",
            LineState::Ready => "ready",
            LineState::Released => "released",
        })
    }
}

/// Exclusive owner of one logical gpio line.
///
/// Nothing prevents two controllers (or two processes) from driving the same
/// line; keeping at most one live controller per line is up to the caller.
///
/// Dropping a controller that still holds its line logs a warning and, unless
/// disabled with [`with_release_on_drop`](Self::with_release_on_drop),
/// schedules a best-effort unexport on the current tokio runtime.
pub struct LineController<B: SysfsBackend> {
    backend: Arc<B>,
    layout: SysfsLayout,
    physical: u32,
    line: LogicalPin,
    direction: Direction,
    state: LineState,
    release_on_drop: bool,
}

impl<B: SysfsBackend> LineController<B> {
    /// Validates the physical pin. Does not touch the hardware.
    pub fn new(
        backend: Arc<B>,
        layout: SysfsLayout,
        physical: u32,
        direction: Direction,
    ) -> Result<Self, GpioError> {
        let line = pins::translate(physical)?;

        Ok(Self {
            backend,
            layout,
            physical,
            line,
            direction,
            state: LineState::Created,
            release_on_drop: true,
        })
    }

    pub fn with_release_on_drop(mut self, enabled: bool) -> Self {
        self.release_on_drop = enabled;
        self
    }

    pub fn physical(&self) -> u32 {
        self.physical
    }

    pub fn line(&self) -> LogicalPin {
        self.line
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn state(&self) -> LineState {
        self.state
    }

    /// Exports the line and configures its direction.
    ///
    /// If the direction cannot be set the export is undone (best effort) and
    /// the controller returns to `Created`. Should the undo fail as well the
    /// controller stays `Exported`, so a later `initialize` only retries the
    /// direction and `unexport` can still release the line.
    pub async fn initialize(&mut self) -> Result<(), GpioError> {
        let line = self.line.number();

        match self.state {
            LineState::Created => {
                let export = self.layout.export_path();
                if !self
                    .backend
                    .write_attr(&export, &line.to_string())
                    .await
                    .is_success()
                {
                    error!("export of line {line} failed");
                    return Err(GpioError::Export(line));
                }
                self.state = LineState::Exported;
                debug!("line {line} exported");
            }
            LineState::Exported => debug!("line {line} already exported, configuring direction"),
            state @ (LineState::Ready | LineState::Released) => {
                return Err(GpioError::InvalidState { line, state });
            }
        }

        let direction_path = self.layout.direction_path(line);
        if !self
            .backend
            .write_attr(&direction_path, self.direction.as_str())
            .await
            .is_success()
        {
            let unexport = self.layout.unexport_path();
            if self
                .backend
                .write_attr(&unexport, &line.to_string())
                .await
                .is_success()
            {
                warn!("direction of line {line} could not be set, export undone");
                self.state = LineState::Created;
            } else {
                error!("direction of line {line} could not be set and the export could not be undone");
            }
            return Err(GpioError::DirectionConfig(line));
        }

        self.state = LineState::Ready;
        info!(
            "physical pin {} ready as line {line} ({})",
            self.physical, self.direction
        );
        Ok(())
    }

    pub async fn turn_on(&self) -> Result<bool, GpioError> {
        self.write_level("1", "turn_on").await
    }

    pub async fn turn_off(&self) -> Result<bool, GpioError> {
        self.write_level("0", "turn_off").await
    }

    /// `true` iff the value attribute reads `1`. A failed read is `false`.
    pub async fn is_on(&self) -> Result<bool, GpioError> {
        self.require(Direction::Output, "is_on")?;
        if !self.ready_for("is_on") {
            return Ok(false);
        }

        let value = self
            .backend
            .read_attr(&self.layout.value_path(self.line.number()))
            .await;
        Ok(value.output().is_some_and(|v| v == "1"))
    }

    /// Raw text of the value attribute, `None` when it could not be read.
    pub async fn read_value(&self) -> Result<Option<String>, GpioError> {
        self.require(Direction::Input, "read_value")?;
        if !self.ready_for("read_value") {
            return Ok(None);
        }

        Ok(self
            .backend
            .read_attr(&self.layout.value_path(self.line.number()))
            .await
            .into_output())
    }

    /// Direction as reported by the `direction` attribute. `None` when the line
    /// is not exported or the attribute holds something other than `in`/`out`.
    pub async fn read_direction(&self) -> Option<Direction> {
        if !self.state.holds_line() {
            return None;
        }

        let text = self
            .backend
            .read_attr(&self.layout.direction_path(self.line.number()))
            .await
            .into_output()?;
        text.parse().ok()
    }

    /// Releases the line. The controller ends up `Released` whatever the
    /// outcome of the unexport; the return value reports that outcome.
    pub async fn unexport(&mut self) -> bool {
        let line = self.line.number();

        match self.state {
            LineState::Released => {
                warn!("line {line} already released");
                false
            }
            LineState::Created => {
                self.state = LineState::Released;
                true
            }
            LineState::Exported | LineState::Ready => {
                let ok = self
                    .backend
                    .write_attr(&self.layout.unexport_path(), &line.to_string())
                    .await
                    .is_success();
                self.state = LineState::Released;
                if ok {
                    info!("line {line} unexported");
                } else {
                    warn!("unexport of line {line} failed, controller released anyway");
                }
                ok
            }
        }
    }

    async fn write_level(&self, level: &str, op: &'static str) -> Result<bool, GpioError> {
        self.require(Direction::Output, op)?;
        if !self.ready_for(op) {
            return Ok(false);
        }

        Ok(self
            .backend
            .write_attr(&self.layout.value_path(self.line.number()), level)
            .await
            .is_success())
    }

    fn require(&self, wanted: Direction, op: &'static str) -> Result<(), GpioError> {
        if self.direction == wanted {
            Ok(())
        } else {
            Err(GpioError::DirectionMismatch {
                line: self.line.number(),
                direction: self.direction,
                op,
            })
        }
    }

    fn ready_for(&self, op: &str) -> bool {
        if self.state == LineState::Ready {
            return true;
        }
        warn!("{op} on line {} in state {}", self.line, self.state);
        false
    }
}

impl<B: SysfsBackend> Drop for LineController<B> {
    fn drop(&mut self) {
        if !self.state.holds_line() {
            return;
        }
        warn!("line {} dropped while still exported", self.line);
        if !self.release_on_drop {
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let backend = self.backend.clone();
                let unexport = self.layout.unexport_path();
                let line = self.line.to_string();
                handle.spawn(async move {
                    if !backend.write_attr(&unexport, &line).await.is_success() {
                        warn!("release of dropped line {line} failed");
                    }
                });
            }
            Err(_) => warn!("no runtime to release line {}, it stays exported", self.line),
        }
    }
}
