//! Engine error type.
//!
//! Errors fall into four groups:
//!
//! - **Bring-up**: [`Error::Configuration`], [`Error::InvalidClockRate`].
//!   Raised only while configuring a bus at board init; not recoverable.
//! - **Malformed descriptor**: caller programming errors, rejected before any
//!   register is touched so a bad descriptor never produces a partial frame.
//! - **Hardware**: [`Error::TransferFailed`] from the sequencer backend, and
//!   [`Error::PeripheralUnresponsive`] when the caller opted into a bounded
//!   [`WaitPolicy`](crate::wait::WaitPolicy).
//! - **Registry / device attach**.
//!
//! Nothing in the engine retries; retry policy belongs to the device driver.

use embedded_storage::nor_flash::{NorFlashError, NorFlashErrorKind};
use thiserror_no_std::Error;

/// Errors returned by bus configuration, transfers and the bus registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The controller's init path rejected the configuration.
    #[error("controller rejected the bus configuration")]
    Configuration,

    /// A clock rate of 0 Hz was requested.
    #[error("bus clock rate must be non-zero")]
    InvalidClockRate,

    /// A transfer was issued on a bus that was never configured.
    #[error("bus is not configured")]
    NotConfigured,

    /// Address phase longer than the 32-bit address register.
    #[error("address phase of {size} bytes exceeds 4 bytes")]
    AddressTooLong {
        /// Requested address size in bytes.
        size: u8,
    },

    /// Alternate (mode) bytes longer than the backend can emit.
    #[error("alternate-byte phase of {size} bytes exceeds the backend limit")]
    AlternateBytesTooLong {
        /// Requested alternate-byte count.
        size: u8,
    },

    /// Read-direction data phase without a receive buffer.
    #[error("read data phase has no receive buffer")]
    MissingReceiveBuffer,

    /// Data length larger than the buffer supplied for it.
    #[error("data length {length} exceeds buffer of {capacity} bytes")]
    BufferTooShort {
        /// Requested data-phase length.
        length: usize,
        /// Length of the supplied buffer.
        capacity: usize,
    },

    /// The compiled sequence needs more slots than one LUT sequence holds.
    #[error("micro-program exceeds one LUT sequence")]
    ProgramOverflow,

    /// The sequencer reported a failed IP transfer.
    #[error("hardware transfer failed")]
    TransferFailed,

    /// A bounded wait policy gave up polling a status flag.
    #[error("peripheral did not respond within the wait budget")]
    PeripheralUnresponsive,

    /// No bus is registered under the requested name or id.
    #[error("no such bus")]
    UnknownBus,

    /// The registry arena is full.
    #[error("bus registry is full")]
    RegistryFull,

    /// A bus with the same generated name is already registered.
    #[error("bus name already registered")]
    DuplicateBus,

    /// A bus or device name does not fit the name buffer.
    #[error("name exceeds 16 bytes")]
    NameTooLong,

    /// Line count other than 1, 2 or 4.
    #[error("invalid line width {lines}")]
    InvalidLineWidth {
        /// Offending line count.
        lines: u8,
    },

    /// A panel command without its command byte.
    #[error("panel command is empty")]
    EmptyCommand,

    /// Flash access outside the device capacity.
    #[error("flash access out of bounds")]
    OutOfBounds,

    /// Flash access not aligned to the device's read/write granularity.
    #[error("flash access not aligned")]
    NotAligned,
}

impl NorFlashError for Error {
    fn kind(&self) -> NorFlashErrorKind {
        match self {
            Self::OutOfBounds => NorFlashErrorKind::OutOfBounds,
            Self::NotAligned => NorFlashErrorKind::NotAligned,
            _ => NorFlashErrorKind::Other,
        }
    }
}

impl From<NorFlashErrorKind> for Error {
    fn from(kind: NorFlashErrorKind) -> Self {
        match kind {
            NorFlashErrorKind::NotAligned => Self::NotAligned,
            NorFlashErrorKind::OutOfBounds => Self::OutOfBounds,
            _ => Self::TransferFailed,
        }
    }
}
