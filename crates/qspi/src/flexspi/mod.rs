//! FlexSPI: hardware sequencer driven by a per-transaction LUT sequence.
//!
//! Each transfer compiles the descriptor into a [`MicroProgram`], writes it
//! to the user sequence of the LUT and runs it as one blocking IP command.
//! Chip-select, phase timing and line switching are entirely the
//! sequencer's job.
//!
//! LUT layout:
//!
//! ```text
//! words 0-3   sequence 0   bootstrap ID read (installed at configure)
//! words 4-7   sequence 1   rewritten by every transfer
//! ```
//!
//! A successful transfer without a data phase reports 1, so callers that
//! treat 0 as failure still see success for command-only transactions.

mod lut;
mod regs;

pub use lut::{decode_sequence, lut_seq, LutInstruction, MicroProgram, Opcode, BOOTSTRAP_LUT};
pub use regs::{
    AhbWriteWaitUnit, CommandType, CsIntervalUnit, FlashDeviceConfig, FlexspiConfig,
    FlexspiRegisters, FlexspiStatus, IpTransfer, Port, SampleClock, TransferData,
};

use crate::bus::MultiLaneBus;
use crate::config::{BusConfig, BOOTSTRAP_LUT_INDEX, USER_LUT_INDEX, USER_SEQUENCE};
use crate::transaction::{DataBuffer, Transaction};
use crate::Error;

/// Controller and device settings applied at configure time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlexspiSettings {
    /// Controller-wide settings.
    pub controller: FlexspiConfig,
    /// Attached device.
    pub device: FlashDeviceConfig,
    /// Port the device sits on.
    pub port: Port,
}

/// One FlexSPI instance used as a multi-lane bus.
pub struct FlexspiBus<R> {
    regs: R,
    settings: FlexspiSettings,
    configured: bool,
}

impl<R: FlexspiRegisters> FlexspiBus<R> {
    /// Wrap a controller with the default settings.
    pub fn new(regs: R) -> Self {
        Self::with_settings(regs, FlexspiSettings::default())
    }

    /// Wrap a controller with custom settings.
    pub fn with_settings(regs: R, settings: FlexspiSettings) -> Self {
        Self {
            regs,
            settings,
            configured: false,
        }
    }

    /// Settings applied at configure time.
    pub fn settings(&self) -> &FlexspiSettings {
        &self.settings
    }

    /// Controller registers.
    pub fn regs(&self) -> &R {
        &self.regs
    }

    /// Controller registers, mutably.
    pub fn regs_mut(&mut self) -> &mut R {
        &mut self.regs
    }

    /// Release the controller.
    pub fn into_inner(self) -> R {
        self.regs
    }
}

impl<R: FlexspiRegisters> MultiLaneBus for FlexspiBus<R> {
    /// Timing comes from [`FlexspiSettings`]; `config` is only logged.
    fn configure(&mut self, config: &BusConfig) -> Result<(), Error> {
        if self.configured {
            trace!("flexspi already configured, ignoring");
            return Ok(());
        }
        self.regs.init(&self.settings.controller)?;
        self.regs
            .set_flash_config(&self.settings.device, self.settings.port);
        self.regs.update_lut(BOOTSTRAP_LUT_INDEX, &BOOTSTRAP_LUT);
        self.regs.software_reset();
        self.configured = true;
        debug!("flexspi configured (requested {} Hz)", config.max_hz);
        Ok(())
    }

    fn transfer(&mut self, transaction: &mut Transaction<'_>) -> Result<usize, Error> {
        if !self.configured {
            return Err(Error::NotConfigured);
        }
        transaction.validate()?;
        let program = MicroProgram::compile(transaction)?;
        trace!(
            "flexspi sequence: {} slots {:?}",
            program.len(),
            program.words()
        );

        let length = transaction.data.length;
        let device_address = if transaction.address.size == 0 {
            0
        } else {
            transaction.address.content
        };
        let (command, data) = match &mut transaction.data.buffer {
            _ if length == 0 => (CommandType::Command, TransferData::None),
            DataBuffer::Receive(buffer) => {
                let capacity = buffer.len();
                let buffer = buffer
                    .get_mut(..length)
                    .ok_or(Error::BufferTooShort { length, capacity })?;
                (CommandType::Read, TransferData::Read(buffer))
            }
            DataBuffer::Send(data) => {
                let capacity = data.len();
                let data = data
                    .get(..length)
                    .ok_or(Error::BufferTooShort { length, capacity })?;
                (CommandType::Write, TransferData::Write(data))
            }
            DataBuffer::None => return Err(Error::MissingReceiveBuffer),
        };

        self.regs.update_lut(USER_LUT_INDEX, program.words());
        let mut ip = IpTransfer {
            port: self.settings.port,
            device_address,
            seq_index: USER_SEQUENCE,
            seq_number: 1,
            command,
            data,
        };
        if let Err(status) = self.regs.transfer_blocking(&mut ip) {
            warn!("flexspi ip command failed: status {}", status.0);
            return Err(Error::TransferFailed);
        }
        Ok(if length == 0 { 1 } else { length })
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}
