//! Bus configuration and engine-wide constants.
//!
//! # Hardware
//!
//! **LPSPI** is the SPI block of the LP_FLEXCOMM interfaces. It has no
//! native multi-lane command mode; every phase is shifted through the TX
//! FIFO with the transmit-command register (TCR) selecting the line width.
//!
//! **FlexSPI** is the sequenced controller. Each transaction is compiled
//! into one LUT sequence (4 words, 8 instruction slots) and executed by the
//! hardware sequencer as a single IP command.
//!
//! # Clocking
//!
//! LPSPI derives three chip-select timing delays from the requested
//! clock, each equal to half a bus clock period:
//!
//! ```text
//! delay_ns = (1_000_000_000 / max_hz) / 2
//! ```
//!
//! At 48 MHz (the QSPI display link) this is 10 ns.

use embedded_hal::spi::{Mode, MODE_0};

use crate::transaction::LineWidth;

/// Capacity of the address + mode scratch buffer used by LPSPI.
///
/// Address and alternate bytes are serialised big-endian into this buffer
/// before being pushed through the TX FIFO in one burst.
pub const ADDRESS_SCRATCH_CAPACITY: usize = 32;

/// Maximum address phase length in bytes (one 32-bit address register).
pub const MAX_ADDRESS_BYTES: u8 = 4;

/// Maximum alternate-byte phase length on LPSPI.
pub const MAX_ALTERNATE_BYTES: u8 = 4;

/// Maximum alternate-byte phase length on FlexSPI.
///
/// The sequencer's mode opcode used here is MODE8: one byte on the wire.
pub const MAX_SEQUENCER_ALTERNATE_BYTES: u8 = 1;

/// LPSPI TX/RX FIFO watermark applied at configure time.
pub const FIFO_WATERMARK: u8 = 7;

/// LPSPI frame size field value for 8-bit frames (`FRAMESZ = bits - 1`).
pub const FRAME_SIZE_BITS: u32 = 8;

/// Bus clock cycles consumed by one dummy byte at 4-line width.
pub const DUMMY_CYCLES_PER_BYTE: u8 = 2;

/// Words per LUT sequence.
pub const LUT_WORDS_PER_SEQUENCE: usize = 4;

/// Instruction slots per LUT sequence (two instructions pack per word).
pub const LUT_SLOTS_PER_SEQUENCE: usize = LUT_WORDS_PER_SEQUENCE * 2;

/// LUT word index of the per-transfer (mutable) sequence.
pub const USER_LUT_INDEX: usize = 4;

/// Sequence number the IP command references (`USER_LUT_INDEX / 4`).
pub const USER_SEQUENCE: u8 = 1;

/// LUT word index of the permanently-resident bootstrap sequence.
pub const BOOTSTRAP_LUT_INDEX: usize = 0;

/// Identification read installed as the bootstrap sequence.
pub const BOOTSTRAP_COMMAND: u8 = 0x9F;

/// Registry name prefix for LPSPI buses (`qspi0`, `qspi1`, ...).
pub const LPSPI_NAME_PREFIX: &str = "qspi";

/// Registry name prefix for FlexSPI buses (`fspi0`, ...).
pub const FLEXSPI_NAME_PREFIX: &str = "fspi";

/// Capacity of bus and device names.
pub const NAME_CAPACITY: usize = 16;

/// Configuration accepted by every bus through
/// [`MultiLaneBus::configure`](crate::bus::MultiLaneBus::configure).
///
/// Applied once per bus instance; repeat calls are no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusConfig {
    /// Bus clock in Hz.
    pub max_hz: u32,
    /// Clock polarity / phase. Only modes 0 and 3 are electrically distinct
    /// on LPSPI; anything else is driven as mode 0.
    pub mode: Mode,
    /// Widest data-phase line count the attached device uses.
    pub data_lines: LineWidth,
}

impl BusConfig {
    /// Mode 0, single line, at `max_hz`.
    #[must_use]
    pub const fn new(max_hz: u32) -> Self {
        Self {
            max_hz,
            mode: MODE_0,
            data_lines: LineWidth::Single,
        }
    }

    /// Set the SPI mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the data-phase line count.
    #[must_use]
    pub const fn with_data_lines(mut self, lines: LineWidth) -> Self {
        self.data_lines = lines;
        self
    }

    /// Half a bus clock period in nanoseconds.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidClockRate`](crate::Error::InvalidClockRate) when
    /// `max_hz` is zero.
    pub fn half_period_ns(&self) -> Result<u32, crate::Error> {
        1_000_000_000u32
            .checked_div(self.max_hz)
            .map(|period| period / 2)
            .ok_or(crate::Error::InvalidClockRate)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::spi::MODE_3;

    /// 48 MHz display link: 20.8 ns period, truncated to 20, halved to 10.
    #[test]
    fn half_period_at_48mhz() {
        assert_eq!(BusConfig::new(48_000_000).half_period_ns(), Ok(10));
    }

    #[test]
    fn half_period_rejects_zero_clock() {
        assert_eq!(
            BusConfig::new(0).half_period_ns(),
            Err(crate::Error::InvalidClockRate)
        );
    }

    #[test]
    fn builder_sets_fields() {
        let cfg = BusConfig::new(1_000_000)
            .with_mode(MODE_3)
            .with_data_lines(LineWidth::Quad);
        assert_eq!(cfg.mode, MODE_3);
        assert_eq!(cfg.data_lines, LineWidth::Quad);
        assert_eq!(cfg.half_period_ns(), Ok(500));
    }

    /// The user sequence index must address the first word of a sequence.
    #[test]
    fn user_sequence_is_word_aligned() {
        assert_eq!(USER_LUT_INDEX % LUT_WORDS_PER_SEQUENCE, 0);
        assert_eq!(
            usize::from(USER_SEQUENCE),
            USER_LUT_INDEX / LUT_WORDS_PER_SEQUENCE
        );
        assert_ne!(USER_LUT_INDEX, BOOTSTRAP_LUT_INDEX);
    }

    #[test]
    fn scratch_holds_largest_address_and_mode() {
        assert!(
            usize::from(MAX_ADDRESS_BYTES + MAX_ALTERNATE_BYTES) <= ADDRESS_SCRATCH_CAPACITY
        );
    }
}
