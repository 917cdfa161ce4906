//! LPSPI: FIFO controller driven phase by phase in software.
//!
//! The LPSPI block has no notion of instruction/address/dummy phases. Each
//! phase is produced by rewriting the transmit-command register with the
//! phase's line width and pushing bytes through the FIFOs:
//!
//! | Phase       | TCR                     | FIFO traffic                       |
//! |-------------|-------------------------|------------------------------------|
//! | instruction | width, RXMSK            | 1 byte out, wait drained           |
//! | address     | address width, RXMSK    | address bytes, wait drained        |
//! | mode        | mode width, RXMSK       | mode bytes, wait drained           |
//! | dummy       | quad, TXMSK (per byte)  | `cycles / 2` bytes in, discarded   |
//! | data write  | data width, RXMSK       | bytes out, wait drained            |
//! | data read   | data width, TXMSK (per byte) | bytes in                      |
//!
//! CONT and CONTC stay set from the first TCR write until the frame is
//! ended, so chip-select is held across every phase. The frame is ended even
//! when a bounded wait gives up.
//!
//! Dummy cycles are always clocked at quad width: one masked-transmit byte on
//! four lines is two clock cycles, and the controller has no clock-only mode.
//! An odd cycle count loses its last cycle.

mod regs;

pub use regs::{electrical_mode, tcr, LpspiMasterConfig, LpspiRegisters, TransmitCommand};

use crate::bus::MultiLaneBus;
use crate::config::{BusConfig, DUMMY_CYCLES_PER_BYTE, FIFO_WATERMARK};
use crate::transaction::{DataBuffer, LineWidth, Transaction};
use crate::wait::{Spin, WaitPolicy};
use crate::Error;

// ── Wait predicates ──────────────────────────────────────────────────────────

/// Every queued TX word has been shifted out.
pub fn tx_fifo_drained<R: LpspiRegisters + ?Sized>(regs: &mut R) -> bool {
    regs.tx_fifo_count() == 0
}

/// The TX FIFO can take another word.
pub fn tx_fifo_has_room<R: LpspiRegisters + ?Sized>(regs: &mut R, depth: u8) -> bool {
    regs.tx_fifo_count() < depth
}

/// At least one received word is waiting.
pub fn rx_fifo_has_data<R: LpspiRegisters + ?Sized>(regs: &mut R) -> bool {
    regs.rx_fifo_count() != 0
}

// ── Driver ───────────────────────────────────────────────────────────────────

/// One LPSPI instance used as a multi-lane bus.
pub struct LpspiBus<R, W = Spin> {
    regs: R,
    input_clock_hz: u32,
    configured: bool,
    wait: W,
}

impl<R: LpspiRegisters> LpspiBus<R> {
    /// Wrap a controller clocked at `input_clock_hz`. Waits are unbounded.
    pub fn new(regs: R, input_clock_hz: u32) -> Self {
        Self::with_wait_policy(regs, input_clock_hz, Spin)
    }
}

impl<R: LpspiRegisters, W: WaitPolicy> LpspiBus<R, W> {
    /// Wrap a controller with a custom wait policy.
    pub fn with_wait_policy(regs: R, input_clock_hz: u32, wait: W) -> Self {
        Self {
            regs,
            input_clock_hz,
            configured: false,
            wait,
        }
    }

    /// Controller registers.
    pub fn regs(&self) -> &R {
        &self.regs
    }

    /// Controller registers, mutably.
    pub fn regs_mut(&mut self) -> &mut R {
        &mut self.regs
    }

    /// Functional clock feeding the controller.
    pub fn input_clock_hz(&self) -> u32 {
        self.input_clock_hz
    }

    /// Release the controller.
    pub fn into_inner(self) -> R {
        self.regs
    }

    fn wait_tx_drained(&mut self) -> Result<(), Error> {
        let regs = &mut self.regs;
        self.wait.wait_until(|| tx_fifo_drained(regs))
    }

    fn wait_tx_room(&mut self, depth: u8) -> Result<(), Error> {
        let regs = &mut self.regs;
        self.wait.wait_until(|| tx_fifo_has_room(regs, depth))
    }

    fn wait_rx_data(&mut self) -> Result<(), Error> {
        let regs = &mut self.regs;
        self.wait.wait_until(|| rx_fifo_has_data(regs))
    }

    /// Push bytes on `lines` with receive masked, then wait for the FIFO to
    /// drain.
    fn send_phase(&mut self, bytes: &[u8], lines: LineWidth, depth: u8) -> Result<(), Error> {
        let command = TransmitCommand::frame_base().with_width(lines).mask_receive();
        self.regs.write_tcr(command);
        for &byte in bytes {
            self.wait_tx_room(depth)?;
            self.regs.write_data(u32::from(byte));
        }
        self.wait_tx_drained()
    }

    /// Clock one frame in on `lines` and return it.
    #[allow(clippy::cast_possible_truncation)] // 8-bit frames
    fn receive_byte(&mut self, lines: LineWidth) -> Result<u8, Error> {
        let command = TransmitCommand::frame_base().with_width(lines).mask_transmit();
        self.regs.write_tcr(command);
        self.wait_rx_data()?;
        Ok(self.regs.read_data() as u8)
    }

    fn run_phases(
        &mut self,
        transaction: &mut Transaction<'_>,
        scratch: &[u8],
    ) -> Result<usize, Error> {
        let depth = self.regs.tx_fifo_size();

        if let Some(instruction) = transaction.instruction {
            self.send_phase(&[instruction.content], instruction.lines, depth)?;
        }

        let split = usize::from(transaction.address.size).min(scratch.len());
        let (address, mode) = scratch.split_at(split);
        if !address.is_empty() {
            self.send_phase(address, transaction.address.lines, depth)?;
        }
        if !mode.is_empty() {
            self.send_phase(mode, transaction.alternate_bytes.lines, depth)?;
        }

        for _ in 0..transaction.dummy_cycles / DUMMY_CYCLES_PER_BYTE {
            let _ = self.receive_byte(LineWidth::Quad)?;
        }

        let length = transaction.data.length;
        if length == 0 {
            return Ok(0);
        }
        let lines = transaction.data.lines;
        match &mut transaction.data.buffer {
            DataBuffer::Send(data) => {
                let data = data.get(..length).ok_or(Error::BufferTooShort {
                    length,
                    capacity: data.len(),
                })?;
                let command = TransmitCommand::frame_base().with_width(lines).mask_receive();
                for &byte in data {
                    self.regs.write_tcr(command);
                    self.wait_tx_room(depth)?;
                    self.regs.write_data(u32::from(byte));
                }
                // The peripheral must see the last bit before CS is released.
                self.wait_tx_drained()?;
            }
            DataBuffer::Receive(buffer) => {
                let capacity = buffer.len();
                let buffer = buffer
                    .get_mut(..length)
                    .ok_or(Error::BufferTooShort { length, capacity })?;
                for slot in buffer.iter_mut() {
                    *slot = self.receive_byte(lines)?;
                }
            }
            DataBuffer::None => return Err(Error::MissingReceiveBuffer),
        }
        Ok(length)
    }
}

impl<R: LpspiRegisters, W: WaitPolicy> MultiLaneBus for LpspiBus<R, W> {
    fn configure(&mut self, config: &BusConfig) -> Result<(), Error> {
        if self.configured {
            trace!("lpspi already configured, ignoring");
            return Ok(());
        }
        let master = LpspiMasterConfig::from_bus_config(config)?;
        self.regs.master_init(&master, self.input_clock_hz)?;
        self.regs.set_fifo_watermarks(FIFO_WATERMARK, FIFO_WATERMARK);
        self.configured = true;
        debug!(
            "lpspi configured: {} Hz from {} Hz source",
            config.max_hz,
            self.input_clock_hz
        );
        Ok(())
    }

    fn transfer(&mut self, transaction: &mut Transaction<'_>) -> Result<usize, Error> {
        if !self.configured {
            return Err(Error::NotConfigured);
        }
        // Reject malformed descriptors before chip-select is asserted.
        transaction.validate()?;
        let scratch = transaction.address_and_mode_bytes()?;
        trace!(
            "lpspi transfer: instr={} addr+mode={} dummy={} data={}",
            transaction.instruction.is_some(),
            scratch.len(),
            transaction.dummy_cycles,
            transaction.data.length
        );

        self.regs.flush_fifos(true, true);
        self.regs.clear_status_flags();
        self.regs.set_enabled(true);

        let result = self.run_phases(transaction, &scratch);
        self.regs.write_tcr(TransmitCommand::frame_base().end_frame());
        result
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}
