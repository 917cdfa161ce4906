//! Software controllers for tests and bring-up without hardware.
//!
//! [`SimLpspi`] and [`SimFlexspi`] implement the register traits and record
//! what would have appeared on the bus as a list of [`WireEvent`]s. Storage
//! is `heapless`, so the simulators build for the firmware target too.
//!
//! Received bytes come from a MISO script queued by the test; an empty script
//! reads as `0xFF` (lines pulled high).

mod flexspi;
mod lpspi;

pub use flexspi::{IpRecord, SimFlexspi, LUT_WORDS, STATUS_INJECTED, STATUS_SEQUENCE_ERROR};
pub use lpspi::SimLpspi;

use crate::transaction::LineWidth;

/// Events recorded per simulator before further events are dropped.
pub const TRACE_CAPACITY: usize = 1024;

/// Bytes a MISO script can hold.
pub const MISO_CAPACITY: usize = 1024;

/// Value read when the MISO script is empty.
pub const IDLE_MISO: u8 = 0xFF;

/// Recorded wire activity.
pub type WireTrace = heapless::Vec<WireEvent, TRACE_CAPACITY>;

/// Direction of a clocked byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Wire {
    /// Host to device.
    Out,
    /// Device to host.
    In,
}

/// One observable bus event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WireEvent {
    /// Chip-select asserted.
    Selected,
    /// One byte clocked on `lines`.
    Clocked {
        /// Direction.
        wire: Wire,
        /// Lines it was clocked on.
        lines: LineWidth,
        /// Byte value.
        byte: u8,
    },
    /// Clock cycles without data (sequencer dummy instruction).
    Dummy {
        /// Cycles.
        cycles: u8,
    },
    /// Chip-select released with `tx_pending` words still in the TX FIFO.
    Released {
        /// Words not yet shifted out.
        tx_pending: usize,
    },
}

/// Bytes clocked out, with their line width, in wire order.
pub fn outgoing(trace: &[WireEvent]) -> impl Iterator<Item = (LineWidth, u8)> + '_ {
    trace.iter().filter_map(|event| match *event {
        WireEvent::Clocked {
            wire: Wire::Out,
            lines,
            byte,
        } => Some((lines, byte)),
        _ => None,
    })
}

/// Bytes clocked in, with their line width, in wire order.
pub fn incoming(trace: &[WireEvent]) -> impl Iterator<Item = (LineWidth, u8)> + '_ {
    trace.iter().filter_map(|event| match *event {
        WireEvent::Clocked {
            wire: Wire::In,
            lines,
            byte,
        } => Some((lines, byte)),
        _ => None,
    })
}

fn record(trace: &mut WireTrace, event: WireEvent) {
    if trace.len() < trace.capacity() {
        let _ = trace.push(event);
    }
}

fn queue_script<const N: usize>(script: &mut heapless::Deque<u8, N>, bytes: &[u8]) -> usize {
    bytes
        .iter()
        .take_while(|&&byte| script.push_back(byte).is_ok())
        .count()
}
