//! Quad NOR flash reads.
//!
//! Targets the common 25-series command set (W25Q, GD25Q, IS25LP):
//!
//! | Command | Byte | Phases                                                   |
//! |---------|------|----------------------------------------------------------|
//! | JEDEC ID | 0x9F | instruction, 3 data bytes, all single line              |
//! | Fast Read Quad I/O | 0xEB | instruction (1), address 24-bit (4), mode (4), 4 dummy, data (4) |
//!
//! The mode byte is sent as `0xFF` so the device never enters continuous
//! read mode; every read carries its own instruction.
//!
//! Reads are split into chunks of at most [`MAX_READ_CHUNK`] bytes.

use embedded_storage::nor_flash::{check_read, ErrorType, ReadNorFlash};

use crate::bus::MultiLaneBus;
use crate::transaction::{LineWidth, Transaction};
use crate::Error;

/// Read JEDEC identification.
pub const CMD_READ_JEDEC_ID: u8 = 0x9F;

/// Fast Read Quad I/O.
pub const CMD_FAST_READ_QUAD_IO: u8 = 0xEB;

/// Mode byte that keeps continuous read disabled.
pub const MODE_NO_CONTINUOUS_READ: u8 = 0xFF;

/// Dummy cycles between mode byte and data for 0xEB.
pub const FAST_READ_QUAD_DUMMY_CYCLES: u8 = 4;

/// Address bytes of 24-bit addressing.
pub const ADDRESS_BYTES: u8 = 3;

/// Largest single read transaction.
pub const MAX_READ_CHUNK: usize = 4096;

/// Quad NOR flash on a multi-lane bus.
pub struct QuadFlash<B> {
    bus: B,
    capacity: usize,
}

impl<B: MultiLaneBus> QuadFlash<B> {
    /// Flash of `capacity` bytes on `bus`. The bus must already be
    /// configured.
    pub const fn new(bus: B, capacity: usize) -> Self {
        Self { bus, capacity }
    }

    /// Manufacturer, memory type and capacity bytes.
    ///
    /// # Errors
    ///
    /// The bus error.
    pub fn read_jedec_id(&mut self) -> Result<[u8; 3], Error> {
        let mut id = [0u8; 3];
        let mut txn = Transaction::new()
            .with_instruction(CMD_READ_JEDEC_ID, LineWidth::Single)
            .with_read(&mut id, LineWidth::Single);
        self.bus.transfer(&mut txn)?;
        Ok(id)
    }

    /// Give the bus back.
    pub fn release(self) -> B {
        self.bus
    }

    fn fast_read(&mut self, offset: u32, buffer: &mut [u8]) -> Result<(), Error> {
        let mut txn = Transaction::new()
            .with_instruction(CMD_FAST_READ_QUAD_IO, LineWidth::Single)
            .with_address(offset, ADDRESS_BYTES, LineWidth::Quad)
            .with_alternate_bytes(u32::from(MODE_NO_CONTINUOUS_READ), 1, LineWidth::Quad)
            .with_dummy_cycles(FAST_READ_QUAD_DUMMY_CYCLES)
            .with_read(buffer, LineWidth::Quad);
        self.bus.transfer(&mut txn).map(|_| ())
    }
}

impl<B: MultiLaneBus> ErrorType for QuadFlash<B> {
    type Error = Error;
}

impl<B: MultiLaneBus> ReadNorFlash for QuadFlash<B> {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        check_read(&*self, offset, bytes.len())?;
        let mut offset = offset;
        for chunk in bytes.chunks_mut(MAX_READ_CHUNK) {
            self.fast_read(offset, chunk)?;
            let step = u32::try_from(chunk.len()).map_err(|_| Error::OutOfBounds)?;
            offset = offset.checked_add(step).ok_or(Error::OutOfBounds)?;
        }
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
