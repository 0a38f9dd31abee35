use log::warn;
use std::io;
use std::path::Path;
use std::time::Duration;

use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;

use crate::executor::{CommandResult, DEFAULT_COMMAND_TIMEOUT, normalize_output};
use crate::gpio::SysfsBackend;

/// Reads and writes the attribute files directly.
///
/// Every access opens its own handle, which is closed when the access
/// returns. The wait for the filesystem is bounded by `timeout`.
#[derive(Debug, Clone, Copy)]
pub struct FileBackend {
    timeout: Duration,
}

impl Default for FileBackend {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_TIMEOUT)
    }
}

impl FileBackend {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

async fn write_file(path: &Path, value: &str) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(path)
        .await?;
    file.write_all(value.as_bytes()).await?;
    // tokio files write in the background; flush surfaces the kernel's verdict
    file.flush().await
}

impl SysfsBackend for FileBackend {
    async fn write_attr(&self, path: &Path, value: &str) -> CommandResult {
        match timeout(self.timeout, write_file(path, value)).await {
            Ok(Ok(())) => CommandResult::Success(String::new()),
            Ok(Err(e)) => {
                warn!("write {value:?} to {}: {e}", path.display());
                CommandResult::Failure
            }
            Err(_) => {
                warn!("write to {} timed out after {:?}", path.display(), self.timeout);
                CommandResult::Failure
            }
        }
    }

    async fn read_attr(&self, path: &Path) -> CommandResult {
        match timeout(self.timeout, fs::read_to_string(path)).await {
            Ok(Ok(contents)) => CommandResult::Success(normalize_output(contents)),
            Ok(Err(e)) => {
                warn!("read {}: {e}", path.display());
                CommandResult::Failure
            }
            Err(_) => {
                warn!("read of {} timed out after {:?}", path.display(), self.timeout);
                CommandResult::Failure
            }
        }
    }
}
