pub mod file;
pub mod mock;
pub mod shell;

pub use file::FileBackend;
pub use mock::{MockBackend, MockOp};
pub use shell::ShellBackend;
