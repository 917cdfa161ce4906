//! FlexSPI register boundary.
//!
//! Mirrors the vendor driver entry points the engine needs: controller init,
//! per-port device config, LUT update, software reset and a blocking IP
//! command. Board crates implement [`FlexspiRegisters`] over the vendor SDK
//! or a PAC; host tests use [`crate::sim::SimFlexspi`].

use crate::Error;

/// Read sample clock source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleClock {
    /// Dummy read strobe looped back internally.
    LoopbackInternally,
    /// Dummy read strobe looped back from the DQS pad.
    LoopbackFromDqsPad,
    /// Loopback from the SCK pad.
    LoopbackFromSckPad,
    /// Read strobe supplied by the flash device.
    ExternalInputFromDqsPad,
}

/// Controller-wide settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlexspiConfig {
    /// Read sample clock source.
    pub rx_sample_clock: SampleClock,
    /// Apply port A1 settings to every port.
    pub same_config_for_all: bool,
    /// AHB read prefetch.
    pub ahb_prefetch: bool,
    /// AHB bufferable writes.
    pub ahb_bufferable: bool,
    /// AHB cacheable reads.
    pub ahb_cacheable: bool,
    /// AHB read address alignment optimisation.
    pub ahb_read_address_opt: bool,
}

impl Default for FlexspiConfig {
    fn default() -> Self {
        Self {
            rx_sample_clock: SampleClock::LoopbackInternally,
            same_config_for_all: false,
            ahb_prefetch: true,
            ahb_bufferable: true,
            ahb_cacheable: true,
            ahb_read_address_opt: true,
        }
    }
}

/// Chip-select interval counting unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CsIntervalUnit {
    /// 1 SCK cycle.
    OneSckCycle,
    /// 256 SCK cycles.
    TwoHundredFiftySixSckCycles,
}

/// AHB write wait interval unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AhbWriteWaitUnit {
    /// 2 AHB cycles.
    TwoAhbCycles,
    /// 8 AHB cycles.
    EightAhbCycles,
    /// 32 AHB cycles.
    ThirtyTwoAhbCycles,
}

/// Settings of the device attached to one port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlashDeviceConfig {
    /// Device size in KiB.
    pub flash_size_kib: u32,
    /// Unit of `cs_interval`.
    pub cs_interval_unit: CsIntervalUnit,
    /// Minimum chip-select deassert time between commands.
    pub cs_interval: u16,
    /// Chip-select hold time in SCK cycles.
    pub cs_hold_time: u8,
    /// Chip-select setup time in SCK cycles.
    pub cs_setup_time: u8,
    /// Data valid time in ns.
    pub data_valid_time: u8,
    /// Column address width in bits.
    pub columnspace: u8,
    /// Device is word addressable.
    pub enable_word_address: bool,
    /// AHB write sequence index.
    pub awr_seq_index: u8,
    /// AHB write sequence count.
    pub awr_seq_number: u8,
    /// AHB read sequence index.
    pub ard_seq_index: u8,
    /// AHB read sequence count.
    pub ard_seq_number: u8,
    /// Unit of `ahb_write_wait_interval`.
    pub ahb_write_wait_unit: AhbWriteWaitUnit,
    /// Wait between AHB writes.
    pub ahb_write_wait_interval: u16,
    /// Drive the write-mask pin.
    pub enable_write_mask: bool,
}

impl Default for FlashDeviceConfig {
    fn default() -> Self {
        Self {
            flash_size_kib: 64,
            cs_interval_unit: CsIntervalUnit::OneSckCycle,
            cs_interval: 2,
            cs_hold_time: 3,
            cs_setup_time: 3,
            data_valid_time: 2,
            columnspace: 0,
            enable_word_address: false,
            awr_seq_index: 0,
            awr_seq_number: 1,
            ard_seq_index: 0,
            ard_seq_number: 1,
            ahb_write_wait_unit: AhbWriteWaitUnit::TwoAhbCycles,
            ahb_write_wait_interval: 0,
            enable_write_mask: false,
        }
    }
}

/// Device port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Port {
    /// Port A, chip-select 1.
    #[default]
    A1,
    /// Port A, chip-select 2.
    A2,
    /// Port B, chip-select 1.
    B1,
    /// Port B, chip-select 2.
    B2,
}

/// IP command type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandType {
    /// No data phase.
    Command,
    /// Device configuration command.
    Config,
    /// Data from the device.
    Read,
    /// Data to the device.
    Write,
}

/// Data attached to an IP command.
#[derive(Debug)]
pub enum TransferData<'a> {
    /// No data.
    None,
    /// Receive into.
    Read(&'a mut [u8]),
    /// Send from.
    Write(&'a [u8]),
}

impl TransferData<'_> {
    /// Bytes moved.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Read(buffer) => buffer.len(),
            Self::Write(data) => data.len(),
        }
    }

    /// No bytes moved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One blocking IP command.
#[derive(Debug)]
pub struct IpTransfer<'a> {
    /// Port the device sits on.
    pub port: Port,
    /// Value sent by a row-address instruction.
    pub device_address: u32,
    /// First sequence to run.
    pub seq_index: u8,
    /// Number of sequences to run.
    pub seq_number: u8,
    /// Command type.
    pub command: CommandType,
    /// Data phase buffer.
    pub data: TransferData<'a>,
}

/// Raw status returned by a failed IP command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlexspiStatus(pub u32);

/// Register surface of one FlexSPI instance.
pub trait FlexspiRegisters {
    /// Initialise the controller.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] if the controller rejects `config`.
    fn init(&mut self, config: &FlexspiConfig) -> Result<(), Error>;

    /// Configure the device on `port`.
    fn set_flash_config(&mut self, config: &FlashDeviceConfig, port: Port);

    /// Write `words` into the LUT starting at word `index`.
    fn update_lut(&mut self, index: usize, words: &[u32]);

    /// Reset the controller state machines. LUT and config survive.
    fn software_reset(&mut self);

    /// Run one IP command to completion.
    ///
    /// # Errors
    ///
    /// The controller status on failure.
    fn transfer_blocking(&mut self, transfer: &mut IpTransfer<'_>) -> Result<(), FlexspiStatus>;
}

impl<R: FlexspiRegisters + ?Sized> FlexspiRegisters for &mut R {
    fn init(&mut self, config: &FlexspiConfig) -> Result<(), Error> {
        (**self).init(config)
    }
    fn set_flash_config(&mut self, config: &FlashDeviceConfig, port: Port) {
        (**self).set_flash_config(config, port);
    }
    fn update_lut(&mut self, index: usize, words: &[u32]) {
        (**self).update_lut(index, words);
    }
    fn software_reset(&mut self) {
        (**self).software_reset();
    }
    fn transfer_blocking(&mut self, transfer: &mut IpTransfer<'_>) -> Result<(), FlexspiStatus> {
        (**self).transfer_blocking(transfer)
    }
}
