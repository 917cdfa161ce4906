use super::{queue_script, record, Wire, WireEvent, WireTrace, IDLE_MISO, MISO_CAPACITY};
use crate::config::LUT_WORDS_PER_SEQUENCE;
use crate::flexspi::{
    decode_sequence, CommandType, FlashDeviceConfig, FlexspiConfig, FlexspiRegisters,
    FlexspiStatus, IpTransfer, Opcode, Port, TransferData,
};
use crate::transaction::LineWidth;
use crate::Error;

/// LUT size of the simulated controller in words (16 sequences).
pub const LUT_WORDS: usize = 64;

const RECORD_CAPACITY: usize = 64;

/// Status reported when a sequence does not match its IP command.
pub const STATUS_SEQUENCE_ERROR: u32 = 0x0000_0001;

/// Status reported for an injected failure.
pub const STATUS_INJECTED: u32 = 0x0000_0080;

/// One IP command as the controller saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IpRecord {
    /// Port.
    pub port: Port,
    /// Device address.
    pub device_address: u32,
    /// First sequence.
    pub seq_index: u8,
    /// Sequence count.
    pub seq_number: u8,
    /// Command type.
    pub command: CommandType,
    /// Data length.
    pub length: usize,
}

/// Simulated FlexSPI instance.
///
/// IP commands execute the referenced LUT sequence instruction by
/// instruction and record the resulting wire activity. The row-address
/// operand is taken as a byte count, matching how
/// [`MicroProgram`](crate::flexspi::MicroProgram) encodes it.
pub struct SimFlexspi {
    lut: [u32; LUT_WORDS],
    controller: Option<FlexspiConfig>,
    device: Option<(FlashDeviceConfig, Port)>,
    resets: usize,
    lut_updates: heapless::Vec<(usize, usize), RECORD_CAPACITY>,
    transfers: heapless::Vec<IpRecord, RECORD_CAPACITY>,
    miso: heapless::Deque<u8, MISO_CAPACITY>,
    trace: WireTrace,
    fail_next: bool,
    reject_init: bool,
}

impl Default for SimFlexspi {
    fn default() -> Self {
        Self::new()
    }
}

impl SimFlexspi {
    /// Controller with a zeroed LUT.
    pub fn new() -> Self {
        Self {
            lut: [0; LUT_WORDS],
            controller: None,
            device: None,
            resets: 0,
            lut_updates: heapless::Vec::new(),
            transfers: heapless::Vec::new(),
            miso: heapless::Deque::new(),
            trace: WireTrace::new(),
            fail_next: false,
            reject_init: false,
        }
    }

    /// Queue bytes the device will drive during read instructions. Returns
    /// how many fit.
    pub fn queue_miso(&mut self, bytes: &[u8]) -> usize {
        queue_script(&mut self.miso, bytes)
    }

    /// Fail the next IP command with [`STATUS_INJECTED`].
    pub fn fail_next_transfer(&mut self) {
        self.fail_next = true;
    }

    /// Make controller init fail.
    pub fn reject_init(&mut self, reject: bool) {
        self.reject_init = reject;
    }

    /// LUT contents.
    pub fn lut(&self) -> &[u32; LUT_WORDS] {
        &self.lut
    }

    /// Words of sequence `index`.
    pub fn sequence(&self, index: usize) -> Option<&[u32]> {
        let start = index.checked_mul(LUT_WORDS_PER_SEQUENCE)?;
        let end = start.checked_add(LUT_WORDS_PER_SEQUENCE)?;
        self.lut.get(start..end)
    }

    /// Controller settings from the last init.
    pub fn controller_config(&self) -> Option<&FlexspiConfig> {
        self.controller.as_ref()
    }

    /// Device settings and port from the last flash config.
    pub fn device_config(&self) -> Option<&(FlashDeviceConfig, Port)> {
        self.device.as_ref()
    }

    /// Software resets issued.
    pub fn resets(&self) -> usize {
        self.resets
    }

    /// LUT updates as `(index, words)`.
    pub fn lut_updates(&self) -> &[(usize, usize)] {
        &self.lut_updates
    }

    /// IP commands issued.
    pub fn transfers(&self) -> &[IpRecord] {
        &self.transfers
    }

    /// Recorded wire activity.
    pub fn trace(&self) -> &[WireEvent] {
        &self.trace
    }

    /// Forget recorded activity.
    pub fn clear_trace(&mut self) {
        self.trace.clear();
        self.transfers.clear();
        self.lut_updates.clear();
    }

    fn out(&mut self, lines: LineWidth, byte: u8) {
        record(
            &mut self.trace,
            WireEvent::Clocked {
                wire: Wire::Out,
                lines,
                byte,
            },
        );
    }

    fn run(&mut self, transfer: &mut IpTransfer<'_>) -> Result<(), FlexspiStatus> {
        let sequence = self
            .sequence(usize::from(transfer.seq_index))
            .ok_or(FlexspiStatus(STATUS_SEQUENCE_ERROR))?;
        let mut words = [0u32; LUT_WORDS_PER_SEQUENCE];
        for (word, &value) in words.iter_mut().zip(sequence) {
            *word = value;
        }

        record(&mut self.trace, WireEvent::Selected);
        for instruction in decode_sequence(&words) {
            let lines = instruction
                .lines()
                .ok_or(FlexspiStatus(STATUS_SEQUENCE_ERROR))?;
            match instruction.opcode {
                Opcode::Stop => break,
                Opcode::Command | Opcode::Mode8 => self.out(lines, instruction.operand),
                Opcode::RowAddress => {
                    let bytes = transfer.device_address.to_be_bytes();
                    let skip = bytes
                        .len()
                        .checked_sub(usize::from(instruction.operand))
                        .ok_or(FlexspiStatus(STATUS_SEQUENCE_ERROR))?;
                    for &byte in bytes.iter().skip(skip) {
                        self.out(lines, byte);
                    }
                }
                Opcode::Dummy => record(
                    &mut self.trace,
                    WireEvent::Dummy {
                        cycles: instruction.operand,
                    },
                ),
                Opcode::Read => {
                    let TransferData::Read(buffer) = &mut transfer.data else {
                        return Err(FlexspiStatus(STATUS_SEQUENCE_ERROR));
                    };
                    for slot in buffer.iter_mut() {
                        let byte = self.miso.pop_front().unwrap_or(IDLE_MISO);
                        *slot = byte;
                        record(
                            &mut self.trace,
                            WireEvent::Clocked {
                                wire: Wire::In,
                                lines,
                                byte,
                            },
                        );
                    }
                }
                Opcode::Write => {
                    let TransferData::Write(data) = &transfer.data else {
                        return Err(FlexspiStatus(STATUS_SEQUENCE_ERROR));
                    };
                    for &byte in data.iter() {
                        self.out(lines, byte);
                    }
                }
            }
        }
        record(&mut self.trace, WireEvent::Released { tx_pending: 0 });
        Ok(())
    }
}

impl FlexspiRegisters for SimFlexspi {
    fn init(&mut self, config: &FlexspiConfig) -> Result<(), Error> {
        if self.reject_init {
            return Err(Error::Configuration);
        }
        self.controller = Some(*config);
        Ok(())
    }

    fn set_flash_config(&mut self, config: &FlashDeviceConfig, port: Port) {
        self.device = Some((*config, port));
    }

    fn update_lut(&mut self, index: usize, words: &[u32]) {
        let targets = self.lut.iter_mut().skip(index);
        for (slot, &word) in targets.zip(words) {
            *slot = word;
        }
        let _ = self.lut_updates.push((index, words.len()));
    }

    fn software_reset(&mut self) {
        self.resets = self.resets.saturating_add(1);
    }

    fn transfer_blocking(&mut self, transfer: &mut IpTransfer<'_>) -> Result<(), FlexspiStatus> {
        let _ = self.transfers.push(IpRecord {
            port: transfer.port,
            device_address: transfer.device_address,
            seq_index: transfer.seq_index,
            seq_number: transfer.seq_number,
            command: transfer.command,
            length: transfer.data.len(),
        });
        if self.fail_next {
            self.fail_next = false;
            return Err(FlexspiStatus(STATUS_INJECTED));
        }
        self.run(transfer)
    }
}
