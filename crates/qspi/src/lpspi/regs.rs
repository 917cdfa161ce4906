//! LPSPI register boundary.
//!
//! The driver only talks to the controller through [`LpspiRegisters`]. A
//! board crate implements it over the peripheral access crate; host tests
//! use [`crate::sim::SimLpspi`].
//!
//! # Transmit command register (TCR)
//!
//! ```text
//!  31   30   29:27    26:24  23   22   21    20    19    18    17:16  11:0
//! CPOL CPHA PRESCALE  PCS   LSBF BYSW CONT CONTC RXMSK TXMSK WIDTH FRAMESZ
//! ```
//!
//! Only the fields the engine drives are modelled. `WIDTH` takes the log2
//! line-width code (1→0, 2→1, 4→2).

use embedded_hal::spi::{Mode, Phase, Polarity, MODE_0, MODE_3};

use crate::config::{BusConfig, FRAME_SIZE_BITS};
use crate::transaction::LineWidth;
use crate::Error;

/// TCR field layout.
pub mod tcr {
    /// FRAMESZ: frame size minus one, bits 11:0.
    pub const FRAMESZ_MASK: u32 = 0xFFF;
    /// WIDTH: transfer width code, bits 17:16.
    pub const WIDTH_SHIFT: u32 = 16;
    /// WIDTH field mask.
    pub const WIDTH_MASK: u32 = 0x3 << WIDTH_SHIFT;
    /// TXMSK: clock in a frame without loading TX data.
    pub const TXMSK: u32 = 1 << 18;
    /// RXMSK: discard received data.
    pub const RXMSK: u32 = 1 << 19;
    /// CONTC: continuing command (PCS stays asserted across TCR writes).
    pub const CONTC: u32 = 1 << 20;
    /// CONT: continuous transfer (PCS held between frames).
    pub const CONT: u32 = 1 << 21;
    /// PCS: peripheral chip select, bits 26:24.
    pub const PCS_SHIFT: u32 = 24;
    /// PCS field mask.
    pub const PCS_MASK: u32 = 0x7 << PCS_SHIFT;
}

/// A transmit-command word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransmitCommand(u32);

impl TransmitCommand {
    /// 8-bit frames on PCS0 with continuous transfer and continuing command
    /// set: chip-select stays asserted until [`TransmitCommand::end_frame`].
    #[must_use]
    #[allow(clippy::arithmetic_side_effects)] // FRAME_SIZE_BITS is a non-zero constant
    pub const fn frame_base() -> Self {
        Self(((FRAME_SIZE_BITS - 1) & tcr::FRAMESZ_MASK) | tcr::CONT | tcr::CONTC)
    }

    /// Raw register value.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Register value to write.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Replace the WIDTH field.
    #[must_use]
    pub const fn with_width(self, lines: LineWidth) -> Self {
        Self((self.0 & !tcr::WIDTH_MASK) | ((lines.code() as u32) << tcr::WIDTH_SHIFT))
    }

    /// Discard received frames (transmit-only phase).
    #[must_use]
    pub const fn mask_receive(self) -> Self {
        Self(self.0 | tcr::RXMSK)
    }

    /// Clock frames without TX data (receive-only phase).
    #[must_use]
    pub const fn mask_transmit(self) -> Self {
        Self(self.0 | tcr::TXMSK)
    }

    /// Clear CONTC so the controller releases chip-select.
    #[must_use]
    pub const fn end_frame(self) -> Self {
        Self(self.0 & !tcr::CONTC)
    }

    /// Line width selected by the WIDTH field, if it is a valid code.
    #[must_use]
    pub const fn width(self) -> Option<LineWidth> {
        LineWidth::from_code(((self.0 & tcr::WIDTH_MASK) >> tcr::WIDTH_SHIFT) as u8)
    }

    /// TXMSK set.
    #[must_use]
    pub const fn is_transmit_masked(self) -> bool {
        self.0 & tcr::TXMSK != 0
    }

    /// RXMSK set.
    #[must_use]
    pub const fn is_receive_masked(self) -> bool {
        self.0 & tcr::RXMSK != 0
    }

    /// CONTC set (chip-select held).
    #[must_use]
    pub const fn is_continuing(self) -> bool {
        self.0 & tcr::CONTC != 0
    }

    /// Selected PCS line.
    #[must_use]
    pub const fn pcs(self) -> u8 {
        ((self.0 & tcr::PCS_MASK) >> tcr::PCS_SHIFT) as u8
    }
}

/// Master-mode settings applied once at configure time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LpspiMasterConfig {
    /// SCK rate in Hz.
    pub baud_rate: u32,
    /// Clock idle level.
    pub polarity: Polarity,
    /// Sampling edge.
    pub phase: Phase,
    /// Chip-select line driven by the controller.
    pub pcs: u8,
    /// Chip-select is active low.
    pub pcs_active_low: bool,
    /// PCS[3:2] are repurposed as data lines IO2/IO3 for quad transfers.
    pub pcs_as_data: bool,
    /// Data outputs tristate between frames.
    pub data_out_tristate: bool,
    /// PCS assertion to first SCK edge.
    pub pcs_to_sck_delay_ns: u32,
    /// Last SCK edge to PCS negation.
    pub last_sck_to_pcs_delay_ns: u32,
    /// Delay between transfers.
    pub between_transfer_delay_ns: u32,
}

impl LpspiMasterConfig {
    /// Derive master settings from a bus configuration.
    ///
    /// Mode 3 selects idle-high / second-edge sampling. Every other mode is
    /// driven with mode 0 electrical settings.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidClockRate`] when `max_hz` is zero.
    pub fn from_bus_config(config: &BusConfig) -> Result<Self, Error> {
        let delay_ns = config.half_period_ns()?;
        let mode = electrical_mode(config.mode);
        Ok(Self {
            baud_rate: config.max_hz,
            polarity: mode.polarity,
            phase: mode.phase,
            pcs: 0,
            pcs_active_low: true,
            pcs_as_data: true,
            data_out_tristate: true,
            pcs_to_sck_delay_ns: delay_ns,
            last_sck_to_pcs_delay_ns: delay_ns,
            between_transfer_delay_ns: delay_ns,
        })
    }
}

/// Mode actually driven on the wire for a requested mode.
#[must_use]
pub fn electrical_mode(requested: Mode) -> Mode {
    if requested == MODE_3 {
        return MODE_3;
    }
    if requested != MODE_0 {
        warn!("spi mode not supported by this controller, using mode 0");
    }
    MODE_0
}

/// Register surface of one LPSPI instance.
///
/// Reads take `&mut self`: FIFO status is volatile and the driver owns the
/// peripheral for the duration of a transfer.
pub trait LpspiRegisters {
    /// TX FIFO depth in words.
    fn tx_fifo_size(&mut self) -> u8;
    /// Words currently queued in the TX FIFO.
    fn tx_fifo_count(&mut self) -> u8;
    /// Words currently waiting in the RX FIFO.
    fn rx_fifo_count(&mut self) -> u8;
    /// Flush the selected FIFOs.
    fn flush_fifos(&mut self, tx: bool, rx: bool);
    /// Clear all write-one-to-clear status flags.
    fn clear_status_flags(&mut self);
    /// Enable or disable the module.
    fn set_enabled(&mut self, enabled: bool);
    /// Write the transmit-command register.
    fn write_tcr(&mut self, command: TransmitCommand);
    /// Push one word into the TX FIFO.
    fn write_data(&mut self, word: u32);
    /// Pop one word from the RX FIFO.
    fn read_data(&mut self) -> u32;
    /// Apply master-mode settings.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] if the settings cannot be realised from
    /// `source_clock_hz`.
    fn master_init(
        &mut self,
        config: &LpspiMasterConfig,
        source_clock_hz: u32,
    ) -> Result<(), Error>;
    /// Set the TX and RX FIFO watermarks.
    fn set_fifo_watermarks(&mut self, tx: u8, rx: u8);
}

impl<R: LpspiRegisters + ?Sized> LpspiRegisters for &mut R {
    fn tx_fifo_size(&mut self) -> u8 {
        (**self).tx_fifo_size()
    }
    fn tx_fifo_count(&mut self) -> u8 {
        (**self).tx_fifo_count()
    }
    fn rx_fifo_count(&mut self) -> u8 {
        (**self).rx_fifo_count()
    }
    fn flush_fifos(&mut self, tx: bool, rx: bool) {
        (**self).flush_fifos(tx, rx);
    }
    fn clear_status_flags(&mut self) {
        (**self).clear_status_flags();
    }
    fn set_enabled(&mut self, enabled: bool) {
        (**self).set_enabled(enabled);
    }
    fn write_tcr(&mut self, command: TransmitCommand) {
        (**self).write_tcr(command);
    }
    fn write_data(&mut self, word: u32) {
        (**self).write_data(word);
    }
    fn read_data(&mut self) -> u32 {
        (**self).read_data()
    }
    fn master_init(
        &mut self,
        config: &LpspiMasterConfig,
        source_clock_hz: u32,
    ) -> Result<(), Error> {
        (**self).master_init(config, source_clock_hz)
    }
    fn set_fifo_watermarks(&mut self, tx: u8, rx: u8) {
        (**self).set_fifo_watermarks(tx, rx);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use embedded_hal::spi::MODE_1;

    #[test]
    fn frame_base_is_8_bit_continuous_on_pcs0() {
        let base = TransmitCommand::frame_base();
        assert_eq!(base.bits() & tcr::FRAMESZ_MASK, 7);
        assert!(base.is_continuing());
        assert_ne!(base.bits() & tcr::CONT, 0);
        assert_eq!(base.pcs(), 0);
        assert!(!base.is_transmit_masked());
        assert!(!base.is_receive_masked());
    }

    #[test]
    fn width_field_uses_log2_code() {
        let base = TransmitCommand::frame_base();
        assert_eq!(base.with_width(LineWidth::Single).bits() & tcr::WIDTH_MASK, 0);
        assert_eq!(base.with_width(LineWidth::Dual).bits() & tcr::WIDTH_MASK, 1 << 16);
        assert_eq!(base.with_width(LineWidth::Quad).bits() & tcr::WIDTH_MASK, 2 << 16);
        // Replacing, not OR-ing.
        let back = base.with_width(LineWidth::Quad).with_width(LineWidth::Dual);
        assert_eq!(back.width(), Some(LineWidth::Dual));
    }

    #[test]
    fn end_frame_clears_only_contc() {
        let cmd = TransmitCommand::frame_base().with_width(LineWidth::Quad).mask_receive();
        let end = cmd.end_frame();
        assert!(!end.is_continuing());
        assert_eq!(end.bits() | tcr::CONTC, cmd.bits());
    }

    #[test]
    fn mode_3_keeps_idle_high_second_edge() {
        let cfg = LpspiMasterConfig::from_bus_config(&BusConfig::new(1_000_000).with_mode(MODE_3))
            .unwrap();
        assert_eq!(cfg.polarity, Polarity::IdleHigh);
        assert_eq!(cfg.phase, Phase::CaptureOnSecondTransition);
    }

    #[test]
    fn unsupported_mode_falls_back_to_mode_0() {
        let cfg = LpspiMasterConfig::from_bus_config(&BusConfig::new(1_000_000).with_mode(MODE_1))
            .unwrap();
        assert_eq!(cfg.polarity, Polarity::IdleLow);
        assert_eq!(cfg.phase, Phase::CaptureOnFirstTransition);
    }

    #[test]
    fn delays_are_half_a_period() {
        let cfg = LpspiMasterConfig::from_bus_config(&BusConfig::new(10_000_000)).unwrap();
        assert_eq!(cfg.pcs_to_sck_delay_ns, 50);
        assert_eq!(cfg.last_sck_to_pcs_delay_ns, 50);
        assert_eq!(cfg.between_transfer_delay_ns, 50);
        assert!(cfg.pcs_active_low);
        assert!(cfg.pcs_as_data);
        assert!(cfg.data_out_tristate);
    }
}
