//! Transaction descriptor.
//!
//! A [`Transaction`] describes one command on a multi-lane bus as up to four
//! phases, always emitted in this order:
//!
//! ```text
//! ┌─────────────┬────────────────────┬────────────┬─────────────┐
//! │ instruction │ address + mode     │ dummy      │ data        │
//! │ 1 byte      │ 0-4 + 0-4 bytes    │ N cycles   │ read/write  │
//! └─────────────┴────────────────────┴────────────┴─────────────┘
//! ```
//!
//! Each phase carries its own [`LineWidth`]. A phase that is absent (no
//! instruction, size 0, zero dummy cycles, zero length) is skipped entirely;
//! backends never emit a zero-length phase.
//!
//! The descriptor is built by the caller for each call and only read by the
//! engine, apart from the receive buffer of a read data phase.

use crate::config::{ADDRESS_SCRATCH_CAPACITY, MAX_ADDRESS_BYTES, MAX_ALTERNATE_BYTES};
use crate::Error;

/// Scratch buffer holding the serialised address and mode bytes.
pub type ScratchBuffer = heapless::Vec<u8, ADDRESS_SCRATCH_CAPACITY>;

// ── LineWidth ────────────────────────────────────────────────────────────────

/// Number of signal lines a phase is clocked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum LineWidth {
    /// One line (classic SPI, MOSI/MISO).
    Single = 1,
    /// Two lines (IO0-IO1).
    Dual = 2,
    /// Four lines (IO0-IO3).
    Quad = 4,
}

impl LineWidth {
    /// Line count as a number (1, 2 or 4).
    #[must_use]
    pub const fn lines(self) -> u8 {
        self as u8
    }

    /// log2 width code used by both controllers: 1→0, 2→1, 4→2.
    #[must_use]
    pub const fn code(self) -> u8 {
        (self as u8) >> 1
    }

    /// Parse a line count.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidLineWidth`] for anything other than 1, 2 or 4.
    pub const fn from_lines(lines: u8) -> Result<Self, Error> {
        match lines {
            1 => Ok(Self::Single),
            2 => Ok(Self::Dual),
            4 => Ok(Self::Quad),
            _ => Err(Error::InvalidLineWidth { lines }),
        }
    }

    /// Inverse of [`LineWidth::code`].
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Single),
            1 => Some(Self::Dual),
            2 => Some(Self::Quad),
            _ => None,
        }
    }
}

// ── Phases ───────────────────────────────────────────────────────────────────

/// One-byte instruction phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Instruction {
    /// Instruction byte.
    pub content: u8,
    /// Lines the instruction is clocked on.
    pub lines: LineWidth,
}

/// Address phase. `size == 0` means no address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Address {
    /// Address value, emitted big-endian.
    pub content: u32,
    /// Bytes emitted (0-4).
    pub size: u8,
    /// Lines the address and mode bytes are clocked on.
    pub lines: LineWidth,
}

impl Address {
    /// No address phase.
    pub const NONE: Self = Self {
        content: 0,
        size: 0,
        lines: LineWidth::Single,
    };
}

/// Alternate (mode) bytes, emitted right after the address.
/// `size == 0` means no mode bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlternateBytes {
    /// Mode value, emitted big-endian.
    pub content: u32,
    /// Bytes emitted.
    pub size: u8,
    /// Requested line count.
    pub lines: LineWidth,
}

impl AlternateBytes {
    /// No mode bytes.
    pub const NONE: Self = Self {
        content: 0,
        size: 0,
        lines: LineWidth::Single,
    };
}

/// Buffer of the data phase. The variant decides the direction.
#[derive(Debug, Default)]
pub enum DataBuffer<'a> {
    /// No buffer. With a non-zero length this is a read without a place to
    /// put the bytes, and the transfer is rejected.
    #[default]
    None,
    /// Bytes to send.
    Send(&'a [u8]),
    /// Storage for received bytes.
    Receive(&'a mut [u8]),
}

/// Data-phase direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// No data phase.
    None,
    /// Peripheral → host.
    Read,
    /// Host → peripheral.
    Write,
}

/// Data phase. `length == 0` means no data phase.
#[derive(Debug)]
pub struct DataPhase<'a> {
    /// Lines the data is clocked on.
    pub lines: LineWidth,
    /// Bytes to move.
    pub length: usize,
    /// Source or destination.
    pub buffer: DataBuffer<'a>,
}

impl DataPhase<'_> {
    /// No data phase.
    pub const NONE: Self = Self {
        lines: LineWidth::Single,
        length: 0,
        buffer: DataBuffer::None,
    };

    /// Direction implied by the length and buffer.
    #[must_use]
    pub fn direction(&self) -> Direction {
        if self.length == 0 {
            return Direction::None;
        }
        match self.buffer {
            DataBuffer::Send(_) => Direction::Write,
            DataBuffer::None | DataBuffer::Receive(_) => Direction::Read,
        }
    }
}

// ── Transaction ──────────────────────────────────────────────────────────────

/// One command on a multi-lane bus.
///
/// # Example
///
/// ```rust
/// use qspi::{LineWidth, Transaction};
///
/// let mut id = [0u8; 3];
/// let txn = Transaction::new()
///     .with_instruction(0x9F, LineWidth::Single)
///     .with_read(&mut id, LineWidth::Single);
/// assert!(txn.validate().is_ok());
/// ```
#[derive(Debug)]
pub struct Transaction<'a> {
    /// Instruction phase; `None` skips it.
    pub instruction: Option<Instruction>,
    /// Address phase.
    pub address: Address,
    /// Mode bytes following the address.
    pub alternate_bytes: AlternateBytes,
    /// Bus clock cycles with no data between address and data phases.
    pub dummy_cycles: u8,
    /// Data phase.
    pub data: DataPhase<'a>,
}

impl Default for Transaction<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Transaction<'a> {
    /// A transaction with every phase absent.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            instruction: None,
            address: Address::NONE,
            alternate_bytes: AlternateBytes::NONE,
            dummy_cycles: 0,
            data: DataPhase::NONE,
        }
    }

    /// Add an instruction phase.
    #[must_use]
    pub const fn with_instruction(mut self, content: u8, lines: LineWidth) -> Self {
        self.instruction = Some(Instruction { content, lines });
        self
    }

    /// Add an address phase of `size` bytes.
    #[must_use]
    pub const fn with_address(mut self, content: u32, size: u8, lines: LineWidth) -> Self {
        self.address = Address {
            content,
            size,
            lines,
        };
        self
    }

    /// Add mode bytes after the address.
    #[must_use]
    pub const fn with_alternate_bytes(mut self, content: u32, size: u8, lines: LineWidth) -> Self {
        self.alternate_bytes = AlternateBytes {
            content,
            size,
            lines,
        };
        self
    }

    /// Add dummy cycles.
    #[must_use]
    pub const fn with_dummy_cycles(mut self, cycles: u8) -> Self {
        self.dummy_cycles = cycles;
        self
    }

    /// Write all of `data`.
    #[must_use]
    pub fn with_write(mut self, data: &'a [u8], lines: LineWidth) -> Self {
        self.data = DataPhase {
            lines,
            length: data.len(),
            buffer: DataBuffer::Send(data),
        };
        self
    }

    /// Fill all of `buffer`.
    #[must_use]
    pub fn with_read(mut self, buffer: &'a mut [u8], lines: LineWidth) -> Self {
        self.data = DataPhase {
            lines,
            length: buffer.len(),
            buffer: DataBuffer::Receive(buffer),
        };
        self
    }

    /// Whether the address/mode phase is emitted.
    #[must_use]
    pub const fn has_address_phase(&self) -> bool {
        self.address.size != 0 || self.alternate_bytes.size != 0
    }

    /// Reject descriptors no backend can execute.
    ///
    /// # Errors
    ///
    /// - [`Error::AddressTooLong`] / [`Error::AlternateBytesTooLong`] for
    ///   phases wider than their 32-bit content.
    /// - [`Error::MissingReceiveBuffer`] for a read without a buffer.
    /// - [`Error::BufferTooShort`] when `length` exceeds the buffer.
    pub fn validate(&self) -> Result<(), Error> {
        if self.address.size > MAX_ADDRESS_BYTES {
            return Err(Error::AddressTooLong {
                size: self.address.size,
            });
        }
        if self.alternate_bytes.size > MAX_ALTERNATE_BYTES {
            return Err(Error::AlternateBytesTooLong {
                size: self.alternate_bytes.size,
            });
        }
        let length = self.data.length;
        if length == 0 {
            return Ok(());
        }
        let capacity = match &self.data.buffer {
            DataBuffer::None => return Err(Error::MissingReceiveBuffer),
            DataBuffer::Send(data) => data.len(),
            DataBuffer::Receive(buffer) => buffer.len(),
        };
        if length > capacity {
            return Err(Error::BufferTooShort { length, capacity });
        }
        Ok(())
    }

    /// Serialise the address followed by the mode bytes, both big-endian.
    ///
    /// `address = 0x123456, size = 3` yields `[0x12, 0x34, 0x56]`.
    ///
    /// The first `address.size` bytes are the address; the mode bytes
    /// follow.
    ///
    /// # Errors
    ///
    /// The size errors of [`Transaction::validate`].
    pub fn address_and_mode_bytes(&self) -> Result<ScratchBuffer, Error> {
        let address_too_long = Error::AddressTooLong {
            size: self.address.size,
        };
        let mode_too_long = Error::AlternateBytesTooLong {
            size: self.alternate_bytes.size,
        };
        let address =
            big_endian_tail(self.address.content, self.address.size).ok_or(address_too_long)?;
        let mode = big_endian_tail(self.alternate_bytes.content, self.alternate_bytes.size)
            .ok_or(mode_too_long)?;
        let mut scratch = ScratchBuffer::new();
        scratch
            .extend_from_slice(&address)
            .map_err(|_| address_too_long)?;
        scratch.extend_from_slice(&mode).map_err(|_| mode_too_long)?;
        Ok(scratch)
    }

    /// The receive buffer, if this is a read.
    #[must_use]
    pub fn received(&self) -> Option<&[u8]> {
        match &self.data.buffer {
            DataBuffer::Receive(buffer) => buffer.get(..self.data.length),
            DataBuffer::None | DataBuffer::Send(_) => None,
        }
    }
}

// The scratch buffer holds the largest address plus the largest mode.
#[allow(clippy::arithmetic_side_effects)]
const _: () = assert!(
    MAX_ADDRESS_BYTES as usize + MAX_ALTERNATE_BYTES as usize <= ADDRESS_SCRATCH_CAPACITY
);

/// The low `size` bytes of `value`, most significant first.
fn big_endian_tail(value: u32, size: u8) -> Option<heapless::Vec<u8, 4>> {
    let bytes = value.to_be_bytes();
    let skip = bytes.len().checked_sub(usize::from(size))?;
    heapless::Vec::from_slice(bytes.get(skip..)?).ok()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
