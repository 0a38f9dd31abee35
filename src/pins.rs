//! Physical connector pin to sysfs line number translation.
//!
//! The table covers the GPIO capable pins of the Dragonboard 410c low speed
//! expansion header (connector letters B through L).

use std::fmt;

use serde::Serialize;

use crate::error::GpioError;

const PIN_MAP: [(u32, u32); 11] = [
    (24, 12),  // B
    (25, 13),  // C
    (26, 69),  // D
    (27, 115), // E
    (28, 4),   // F
    (29, 24),  // G
    (30, 25),  // H
    (31, 35),  // I
    (32, 34),  // J
    (33, 28),  // K
    (34, 33),  // L
];

/// Line number as understood by the kernel's sysfs gpio interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct LogicalPin(u32);

impl LogicalPin {
    pub fn number(self) -> u32 {
        self.0
    }
}

impl fmt::Display for LogicalPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub fn translate(physical: u32) -> Result<LogicalPin, GpioError> {
    PIN_MAP
        .iter()
        .find(|(p, _)| *p == physical)
        .map(|(_, logical)| LogicalPin(*logical))
        .ok_or(GpioError::InvalidPin(physical))
}

/// Physical pins accepted by [`translate`], ascending.
pub fn supported_pins() -> impl Iterator<Item = u32> {
    PIN_MAP.iter().map(|(p, _)| *p)
}
