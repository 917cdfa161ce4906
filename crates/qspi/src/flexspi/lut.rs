//! LUT micro-program encoding.
//!
//! A LUT sequence is four 32-bit words holding eight 16-bit instruction
//! slots. Slot `i` sits in word `i / 2`: even slots in bits 15:0, odd slots
//! in bits 31:16. Each slot is
//!
//! ```text
//!  15      10  9   8  7        0
//! ┌──────────┬───────┬──────────┐
//! │  opcode  │ pads  │ operand  │
//! └──────────┴───────┴──────────┘
//! ```
//!
//! An all-zero slot is STOP on one pad, so a partially filled sequence is
//! terminated by the zero-initialised remainder.

use crate::config::{
    BOOTSTRAP_COMMAND, LUT_SLOTS_PER_SEQUENCE, LUT_WORDS_PER_SEQUENCE, MAX_ADDRESS_BYTES,
    MAX_SEQUENCER_ALTERNATE_BYTES,
};
use crate::transaction::{Direction, LineWidth, Transaction};
use crate::Error;

const OPERAND_MASK: u16 = 0x00FF;
const PADS_SHIFT: u16 = 8;
const PADS_MASK: u16 = 0x0300;
const OPCODE_SHIFT: u16 = 10;

/// Sequencer opcodes used by the engine (single data rate only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Opcode {
    /// End of sequence.
    Stop = 0x00,
    /// Send the operand as a command byte.
    Command = 0x01,
    /// Send the row address; operand is the address width.
    RowAddress = 0x02,
    /// Send one mode byte.
    Mode8 = 0x07,
    /// Send the IP transfer's TX data.
    Write = 0x08,
    /// Receive into the IP transfer's RX data.
    Read = 0x09,
    /// Idle for `operand` clock cycles.
    Dummy = 0x0C,
}

impl Opcode {
    /// Parse a 6-bit opcode field.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0x00 => Some(Self::Stop),
            0x01 => Some(Self::Command),
            0x02 => Some(Self::RowAddress),
            0x07 => Some(Self::Mode8),
            0x08 => Some(Self::Write),
            0x09 => Some(Self::Read),
            0x0C => Some(Self::Dummy),
            _ => None,
        }
    }
}

/// One instruction slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LutInstruction {
    /// Operation.
    pub opcode: Opcode,
    /// Pad code (`LineWidth::code`).
    pub pads: u8,
    /// Opcode-specific operand.
    pub operand: u8,
}

impl LutInstruction {
    /// The all-zero slot.
    pub const STOP: Self = Self::new(Opcode::Stop, LineWidth::Single, 0);

    /// Instruction clocked on `lines`.
    #[must_use]
    pub const fn new(opcode: Opcode, lines: LineWidth, operand: u8) -> Self {
        Self {
            opcode,
            pads: lines.code(),
            operand,
        }
    }

    /// Pack into a 16-bit slot.
    #[must_use]
    pub const fn encode(self) -> u16 {
        ((self.opcode as u16) << OPCODE_SHIFT)
            | (((self.pads as u16) << PADS_SHIFT) & PADS_MASK)
            | (self.operand as u16 & OPERAND_MASK)
    }

    /// Unpack a 16-bit slot. `None` for opcodes the engine never emits.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // fields are masked first
    pub const fn decode(slot: u16) -> Option<Self> {
        let Some(opcode) = Opcode::from_bits((slot >> OPCODE_SHIFT) as u8) else {
            return None;
        };
        Some(Self {
            opcode,
            pads: ((slot & PADS_MASK) >> PADS_SHIFT) as u8,
            operand: (slot & OPERAND_MASK) as u8,
        })
    }

    /// Line width of the pad code.
    #[must_use]
    pub const fn lines(self) -> Option<LineWidth> {
        LineWidth::from_code(self.pads)
    }
}

/// Pack two slots into one LUT word, `first` in the low half.
#[must_use]
pub const fn lut_seq(first: LutInstruction, second: LutInstruction) -> u32 {
    (first.encode() as u32) | ((second.encode() as u32) << 16)
}

/// Sequence installed at LUT index 0 when a bus is configured: a one-line
/// `0x9F` command followed by a one-line read, placed in the last word.
pub const BOOTSTRAP_LUT: [u32; LUT_WORDS_PER_SEQUENCE] = [
    0,
    0,
    0,
    lut_seq(
        LutInstruction::new(Opcode::Command, LineWidth::Single, BOOTSTRAP_COMMAND),
        LutInstruction::new(Opcode::Read, LineWidth::Single, 0),
    ),
];

/// A transaction compiled into one LUT sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MicroProgram {
    words: [u32; LUT_WORDS_PER_SEQUENCE],
    slots: usize,
}

impl MicroProgram {
    /// Compile `transaction`. One slot per present phase, in wire order:
    /// command, row address, mode byte, dummy, then read or write.
    ///
    /// The row-address operand is the address *byte count*; the address
    /// value itself travels in the IP command's device address.
    ///
    /// # Errors
    ///
    /// - [`Error::AddressTooLong`] past four address bytes.
    /// - [`Error::AlternateBytesTooLong`] for more than one mode byte.
    /// - [`Error::ProgramOverflow`] past eight slots.
    pub fn compile(transaction: &Transaction<'_>) -> Result<Self, Error> {
        let mut program = Self::default();

        if let Some(instruction) = transaction.instruction {
            program.push(LutInstruction::new(
                Opcode::Command,
                instruction.lines,
                instruction.content,
            ))?;
        }

        let address = transaction.address;
        if address.size != 0 {
            if address.size > MAX_ADDRESS_BYTES {
                return Err(Error::AddressTooLong { size: address.size });
            }
            program.push(LutInstruction::new(
                Opcode::RowAddress,
                address.lines,
                address.size,
            ))?;
        }

        let mode = transaction.alternate_bytes;
        if mode.size != 0 {
            if mode.size > MAX_SEQUENCER_ALTERNATE_BYTES {
                return Err(Error::AlternateBytesTooLong { size: mode.size });
            }
            #[allow(clippy::cast_possible_truncation)] // one mode byte
            let content = mode.content as u8;
            program.push(LutInstruction::new(Opcode::Mode8, mode.lines, content))?;
        }

        if transaction.dummy_cycles != 0 {
            program.push(LutInstruction::new(
                Opcode::Dummy,
                LineWidth::Quad,
                transaction.dummy_cycles,
            ))?;
        }

        let lines = transaction.data.lines;
        match transaction.data.direction() {
            Direction::None => {}
            Direction::Read => program.push(LutInstruction::new(Opcode::Read, lines, 0))?,
            Direction::Write => program.push(LutInstruction::new(Opcode::Write, lines, 0))?,
        }

        Ok(program)
    }

    /// Append one slot.
    ///
    /// # Errors
    ///
    /// [`Error::ProgramOverflow`] when all eight slots are used.
    pub fn push(&mut self, instruction: LutInstruction) -> Result<(), Error> {
        if self.slots >= LUT_SLOTS_PER_SEQUENCE {
            return Err(Error::ProgramOverflow);
        }
        let shift = if self.slots % 2 == 0 { 0 } else { 16 };
        let word = self
            .words
            .get_mut(self.slots / 2)
            .ok_or(Error::ProgramOverflow)?;
        *word |= u32::from(instruction.encode()) << shift;
        self.slots = self.slots.saturating_add(1);
        Ok(())
    }

    /// Encoded sequence, ready for the LUT.
    #[must_use]
    pub const fn words(&self) -> &[u32; LUT_WORDS_PER_SEQUENCE] {
        &self.words
    }

    /// Slots in use.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.slots
    }

    /// No slots in use.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.slots == 0
    }

    /// Decode the used slots in execution order.
    pub fn instructions(&self) -> impl Iterator<Item = LutInstruction> + '_ {
        decode_sequence(&self.words).take(self.slots)
    }
}

/// Decode every slot of a sequence in execution order, stopping at the first
/// STOP or unknown opcode.
#[allow(clippy::cast_possible_truncation)] // each word splits into two halves
pub fn decode_sequence(words: &[u32]) -> impl Iterator<Item = LutInstruction> + '_ {
    words
        .iter()
        .flat_map(|&word| [word as u16, (word >> 16) as u16])
        .map_while(|slot| LutInstruction::decode(slot).filter(|i| i.opcode != Opcode::Stop))
}

// ─── Tests ───────────────────────────────────────────────────────────────────
