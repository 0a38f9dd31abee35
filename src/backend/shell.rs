use std::path::Path;

use crate::executor::{CommandExecutor, CommandResult};
use crate::gpio::SysfsBackend;

/// Touches the attribute files with `echo` and `cat` through the
/// [`CommandExecutor`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellBackend {
    executor: CommandExecutor,
}

impl ShellBackend {
    pub fn new(executor: CommandExecutor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &CommandExecutor {
        &self.executor
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

impl SysfsBackend for ShellBackend {
    async fn write_attr(&self, path: &Path, value: &str) -> CommandResult {
        let cmd = format!(
            "echo {} > {}",
            quote(value),
            quote(&path.to_string_lossy())
        );
        self.executor.run(&cmd).await
    }

    async fn read_attr(&self, path: &Path) -> CommandResult {
        let cmd = format!("cat {}", quote(&path.to_string_lossy()));
        self.executor.run(&cmd).await
    }
}
