//! QSPI display-panel link.
//!
//! Panels on a QSPI interface (GC9B71 and relatives) wrap every register
//! access in a fixed frame:
//!
//! ```text
//! 0x12 (1 line) │ 00 CMD 00 (3 bytes, 4 lines) │ params / pixels (4 lines)
//! ```
//!
//! Register writes put the register in `CMD`; pixel data goes to RAMWR
//! (`0x2C`) in the same frame. The panel's init command table lives with the
//! panel driver, not here.

use embedded_hal::spi::MODE_0;

use crate::bus::MultiLaneBus;
use crate::config::BusConfig;
use crate::transaction::{LineWidth, Transaction};
use crate::Error;

/// Frame instruction for both register and pixel writes.
pub const WRITE_INSTRUCTION: u8 = 0x12;

/// Memory write (pixel data) register.
pub const RAMWR: u8 = 0x2C;

/// Clock used for the panel link.
pub const PANEL_CLOCK_HZ: u32 = 48_000_000;

/// Bus settings for the panel link: 48 MHz, mode 0, quad data.
pub const PANEL_BUS_CONFIG: BusConfig = BusConfig::new(PANEL_CLOCK_HZ)
    .with_mode(MODE_0)
    .with_data_lines(LineWidth::Quad);

/// Display panel transport over a multi-lane bus.
pub struct PanelLink<B> {
    bus: B,
}

impl<B: MultiLaneBus> PanelLink<B> {
    /// Wrap `bus`. Call [`PanelLink::init`] before writing.
    pub const fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Configure the bus for the panel.
    ///
    /// # Errors
    ///
    /// Whatever the bus returns from configure.
    pub fn init(&mut self) -> Result<(), Error> {
        self.bus.configure(&PANEL_BUS_CONFIG)
    }

    /// Write a register: `command[0]` is the register, the rest its
    /// parameters.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyCommand`] for an empty slice, otherwise the bus error.
    pub fn write_command(&mut self, command: &[u8]) -> Result<(), Error> {
        let (&register, params) = command.split_first().ok_or(Error::EmptyCommand)?;
        self.frame(register, params)
    }

    /// Stream pixel data to panel RAM.
    ///
    /// # Errors
    ///
    /// The bus error.
    pub fn write_data(&mut self, pixels: &[u8]) -> Result<(), Error> {
        self.frame(RAMWR, pixels)
    }

    /// Give the bus back.
    pub fn release(self) -> B {
        self.bus
    }

    fn frame(&mut self, register: u8, payload: &[u8]) -> Result<(), Error> {
        let mut txn = Transaction::new()
            .with_instruction(WRITE_INSTRUCTION, LineWidth::Single)
            .with_address(u32::from(register) << 8, 3, LineWidth::Quad)
            .with_write(payload, LineWidth::Quad);
        self.bus.transfer(&mut txn).map(|_| ())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn panel_bus_config() {
        assert_eq!(PANEL_BUS_CONFIG.max_hz, 48_000_000);
        assert_eq!(PANEL_BUS_CONFIG.mode, MODE_0);
        assert_eq!(PANEL_BUS_CONFIG.data_lines, LineWidth::Quad);
        assert_eq!(PANEL_BUS_CONFIG.half_period_ns().unwrap(), 10);
    }
}
