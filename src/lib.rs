pub mod backend;
pub mod config;
pub mod error;
pub mod executor;
pub mod gpio;
pub mod line;
pub mod pins;
pub mod routes;

pub use backend::{FileBackend, MockBackend, MockOp, ShellBackend};
pub use config::{AppConfig, BackendKind, HttpConfig, PinConfig, SysfsConfig};
pub use error::GpioError;
pub use executor::{CommandExecutor, CommandResult};
pub use gpio::{GpioManager, PinDescriptor, SysfsBackend, SysfsLayout};
pub use line::{Direction, LineController, LineState};
pub use pins::{LogicalPin, translate};
pub use routes::AppState;
