use log::warn;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::executor::CommandResult;
use crate::gpio::{SysfsBackend, SysfsLayout};

/// An access recorded by [`MockBackend`], in issue order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOp {
    Write { path: PathBuf, value: String },
    Read { path: PathBuf },
}

#[derive(Default)]
struct MockState {
    attrs: FxHashMap<PathBuf, String>,
    ops: Vec<MockOp>,
    failing: HashSet<PathBuf>,
}

/// In-memory stand-in for the sysfs gpio class.
///
/// Writing a line number to `export` creates its `direction` (`in`) and
/// `value` (`0`) attributes, `unexport` removes them. Exporting twice,
/// unexporting an unknown line, bad direction words and writing the value of
/// an input line fail like the kernel would. Paths registered with
/// [`fail_on`](Self::fail_on) fail on every access.
pub struct MockBackend {
    layout: SysfsLayout,
    state: Mutex<MockState>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new(SysfsLayout::default())
    }
}

impl MockBackend {
    pub fn new(layout: SysfsLayout) -> Self {
        Self {
            layout,
            state: Mutex::new(MockState::default()),
        }
    }

    pub fn layout(&self) -> &SysfsLayout {
        &self.layout
    }

    pub fn fail_on<P: Into<PathBuf>>(&self, path: P) {
        self.state.lock().failing.insert(path.into());
    }

    pub fn clear_failures(&self) {
        self.state.lock().failing.clear();
    }

    pub fn ops(&self) -> Vec<MockOp> {
        self.state.lock().ops.clone()
    }

    /// Number of writes issued to `path`, failed ones included.
    pub fn writes_to(&self, path: &Path) -> usize {
        self.state
            .lock()
            .ops
            .iter()
            .filter(|op| matches!(op, MockOp::Write { path: p, .. } if p == path))
            .count()
    }

    pub fn attr(&self, path: &Path) -> Option<String> {
        self.state.lock().attrs.get(path).cloned()
    }

    /// Overwrites an attribute without recording an access, e.g. to drive the
    /// level seen by an input line.
    pub fn set_attr<P: Into<PathBuf>>(&self, path: P, value: &str) {
        self.state.lock().attrs.insert(path.into(), value.to_string());
    }

    pub fn is_exported(&self, line: u32) -> bool {
        self.state
            .lock()
            .attrs
            .contains_key(&self.layout.direction_path(line))
    }

    fn apply_write(&self, path: &Path, value: &str) -> CommandResult {
        let mut state = self.state.lock();
        state.ops.push(MockOp::Write {
            path: path.to_path_buf(),
            value: value.to_string(),
        });

        if state.failing.contains(path) {
            return CommandResult::Failure;
        }

        let value = value.trim();
        if path == self.layout.export_path() || path == self.layout.unexport_path() {
            let Ok(line) = value.parse::<u32>() else {
                warn!("mock: invalid line number {value:?}");
                return CommandResult::Failure;
            };
            let direction = self.layout.direction_path(line);
            let level = self.layout.value_path(line);
            let exported = state.attrs.contains_key(&direction);

            if path == self.layout.export_path() {
                if exported {
                    warn!("mock: line {line} is busy");
                    return CommandResult::Failure;
                }
                state.attrs.insert(direction, "in".into());
                state.attrs.insert(level, "0".into());
            } else {
                if !exported {
                    warn!("mock: line {line} is not exported");
                    return CommandResult::Failure;
                }
                state.attrs.remove(&direction);
                state.attrs.remove(&level);
            }
            return CommandResult::Success(String::new());
        }

        if !state.attrs.contains_key(path) {
            warn!("mock: no such attribute {}", path.display());
            return CommandResult::Failure;
        }

        match path.file_name().and_then(|n| n.to_str()) {
            Some("direction") if matches!(value, "in" | "out") => {
                state.attrs.insert(path.to_path_buf(), value.to_string());
                if let Some(dir) = path.parent() {
                    state.attrs.insert(dir.join("value"), "0".into());
                }
                CommandResult::Success(String::new())
            }
            Some("value") if matches!(value, "0" | "1") => {
                let direction = path.parent().map(|dir| dir.join("direction"));
                let is_output = direction
                    .and_then(|d| state.attrs.get(&d).cloned())
                    .is_some_and(|d| d == "out");
                if !is_output {
                    warn!("mock: {} is not writable on an input line", path.display());
                    return CommandResult::Failure;
                }
                state.attrs.insert(path.to_path_buf(), value.to_string());
                CommandResult::Success(String::new())
            }
            _ => {
                warn!("mock: {value:?} rejected by {}", path.display());
                CommandResult::Failure
            }
        }
    }

    fn apply_read(&self, path: &Path) -> CommandResult {
        let mut state = self.state.lock();
        state.ops.push(MockOp::Read {
            path: path.to_path_buf(),
        });

        if state.failing.contains(path) {
            return CommandResult::Failure;
        }
        match state.attrs.get(path) {
            Some(value) => CommandResult::Success(value.clone()),
            None => CommandResult::Failure,
        }
    }
}

impl SysfsBackend for MockBackend {
    async fn write_attr(&self, path: &Path, value: &str) -> CommandResult {
        self.apply_write(path, value)
    }

    async fn read_attr(&self, path: &Path) -> CommandResult {
        self.apply_read(path)
    }
}
