use super::{queue_script, record, Wire, WireEvent, WireTrace, IDLE_MISO, MISO_CAPACITY};
use crate::lpspi::{LpspiMasterConfig, LpspiRegisters, TransmitCommand};
use crate::transaction::LineWidth;
use crate::Error;

const FIFO_DEPTH: u8 = 8;
const FIFO_CAPACITY: usize = FIFO_DEPTH as usize;

/// Simulated LPSPI instance.
///
/// Shifting is driven by status polls: every read of the TX count moves one
/// queued word onto the wire, and every read of the RX count with an
/// outstanding receive frame clocks one byte in. A masked-transmit TCR write
/// queues one receive frame, as on the real controller.
///
/// [`SimLpspi::stall`] freezes both FIFOs to model a dead peripheral.
pub struct SimLpspi {
    tcr: TransmitCommand,
    selected: bool,
    enabled: bool,
    stalled: bool,
    tx: heapless::Deque<(LineWidth, u8), FIFO_CAPACITY>,
    rx: heapless::Deque<u8, FIFO_CAPACITY>,
    pending_frames: heapless::Deque<LineWidth, FIFO_CAPACITY>,
    miso: heapless::Deque<u8, MISO_CAPACITY>,
    trace: WireTrace,
    master: Option<LpspiMasterConfig>,
    source_clock_hz: u32,
    watermarks: Option<(u8, u8)>,
    init_count: usize,
    accesses: usize,
    tx_overflows: usize,
}

impl Default for SimLpspi {
    fn default() -> Self {
        Self::new()
    }
}

impl SimLpspi {
    /// Idle controller with an 8-word FIFO.
    pub fn new() -> Self {
        Self {
            tcr: TransmitCommand::from_bits(0),
            selected: false,
            enabled: false,
            stalled: false,
            tx: heapless::Deque::new(),
            rx: heapless::Deque::new(),
            pending_frames: heapless::Deque::new(),
            miso: heapless::Deque::new(),
            trace: WireTrace::new(),
            master: None,
            source_clock_hz: 0,
            watermarks: None,
            init_count: 0,
            accesses: 0,
            tx_overflows: 0,
        }
    }

    /// Queue bytes the device will drive on MISO. Returns how many fit.
    pub fn queue_miso(&mut self, bytes: &[u8]) -> usize {
        queue_script(&mut self.miso, bytes)
    }

    /// Freeze (or unfreeze) the shifter.
    pub fn stall(&mut self, stalled: bool) {
        self.stalled = stalled;
    }

    /// Recorded wire activity.
    pub fn trace(&self) -> &[WireEvent] {
        &self.trace
    }

    /// Forget recorded activity and access counts.
    pub fn clear_trace(&mut self) {
        self.trace.clear();
        self.accesses = 0;
    }

    /// Master settings from the last successful init.
    pub fn master_config(&self) -> Option<&LpspiMasterConfig> {
        self.master.as_ref()
    }

    /// Source clock passed to the last init.
    pub fn source_clock_hz(&self) -> u32 {
        self.source_clock_hz
    }

    /// FIFO watermarks, once set.
    pub fn watermarks(&self) -> Option<(u8, u8)> {
        self.watermarks
    }

    /// Successful master inits.
    pub fn init_count(&self) -> usize {
        self.init_count
    }

    /// Register accesses of any kind since the last [`SimLpspi::clear_trace`].
    pub fn accesses(&self) -> usize {
        self.accesses
    }

    /// Words written while the TX FIFO was full.
    pub fn tx_overflows(&self) -> usize {
        self.tx_overflows
    }

    /// Module enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Chip-select currently asserted.
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Last TCR value written.
    pub fn tcr(&self) -> TransmitCommand {
        self.tcr
    }

    fn touch(&mut self) {
        self.accesses = self.accesses.saturating_add(1);
    }

    fn select(&mut self) {
        if !self.selected {
            self.selected = true;
            record(&mut self.trace, WireEvent::Selected);
        }
    }

    fn width(&self) -> LineWidth {
        self.tcr.width().unwrap_or(LineWidth::Single)
    }

    fn shift_out(&mut self) {
        if let Some((lines, byte)) = self.tx.pop_front() {
            record(
                &mut self.trace,
                WireEvent::Clocked {
                    wire: Wire::Out,
                    lines,
                    byte,
                },
            );
        }
    }

    fn shift_in(&mut self) {
        if self.rx.is_full() {
            return;
        }
        if let Some(lines) = self.pending_frames.pop_front() {
            let byte = self.miso.pop_front().unwrap_or(IDLE_MISO);
            let _ = self.rx.push_back(byte);
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
}

#[allow(clippy::cast_possible_truncation)] // FIFO lengths are bounded by FIFO_DEPTH
impl LpspiRegisters for SimLpspi {
    fn tx_fifo_size(&mut self) -> u8 {
        self.touch();
        FIFO_DEPTH
    }

    fn tx_fifo_count(&mut self) -> u8 {
        self.touch();
        let count = self.tx.len() as u8;
        if !self.stalled {
            self.shift_out();
        }
        count
    }

    fn rx_fifo_count(&mut self) -> u8 {
        self.touch();
        if !self.stalled {
            self.shift_in();
        }
        self.rx.len() as u8
    }

    fn flush_fifos(&mut self, tx: bool, rx: bool) {
        self.touch();
        if tx {
            self.tx.clear();
        }
        if rx {
            self.rx.clear();
            self.pending_frames.clear();
        }
    }

    fn clear_status_flags(&mut self) {
        self.touch();
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.touch();
        self.enabled = enabled;
    }

    fn write_tcr(&mut self, command: TransmitCommand) {
        self.touch();
        self.tcr = command;
        if !command.is_continuing() {
            if self.selected {
                self.selected = false;
                record(
                    &mut self.trace,
                    WireEvent::Released {
                        tx_pending: self.tx.len(),
                    },
                );
            }
            return;
        }
        self.select();
        if command.is_transmit_masked() {
            let lines = self.width();
            let _ = self.pending_frames.push_back(lines);
        }
    }

    fn write_data(&mut self, word: u32) {
        self.touch();
        self.select();
        let entry = (self.width(), word as u8);
        if self.tx.push_back(entry).is_err() {
            self.tx_overflows = self.tx_overflows.saturating_add(1);
        }
    }

    fn read_data(&mut self) -> u32 {
        self.touch();
        self.rx.pop_front().map_or(0, u32::from)
    }

    fn master_init(
        &mut self,
        config: &LpspiMasterConfig,
        source_clock_hz: u32,
    ) -> Result<(), Error> {
        self.touch();
        // SCK is at most half the functional clock.
        if config.baud_rate == 0 || config.baud_rate > source_clock_hz / 2 {
            return Err(Error::Configuration);
        }
        self.master = Some(*config);
        self.source_clock_hz = source_clock_hz;
        self.init_count = self.init_count.saturating_add(1);
        Ok(())
    }

    fn set_fifo_watermarks(&mut self, tx: u8, rx: u8) {
        self.touch();
        self.watermarks = Some((tx, rx));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn polling_tx_count_shifts_one_word() {
        let mut sim = SimLpspi::new();
        sim.write_tcr(TransmitCommand::frame_base().with_width(LineWidth::Quad));
        sim.write_data(0xAB);
        sim.write_data(0xCD);
        assert_eq!(sim.tx_fifo_count(), 2);
        assert_eq!(sim.tx_fifo_count(), 1);
        assert_eq!(sim.tx_fifo_count(), 0);
        assert_eq!(
            sim.trace(),
            &[
                WireEvent::Selected,
                WireEvent::Clocked { wire: Wire::Out, lines: LineWidth::Quad, byte: 0xAB },
                WireEvent::Clocked { wire: Wire::Out, lines: LineWidth::Quad, byte: 0xCD },
            ]
        );
    }

    #[test]
    fn masked_transmit_frame_reads_script_then_idle() {
        let mut sim = SimLpspi::new();
        sim.queue_miso(&[0x5A]);
        let rx = TransmitCommand::frame_base().mask_transmit();
        sim.write_tcr(rx);
        assert_eq!(sim.rx_fifo_count(), 1);
        assert_eq!(sim.read_data(), 0x5A);
        sim.write_tcr(rx);
        assert_eq!(sim.rx_fifo_count(), 1);
        assert_eq!(sim.read_data(), u32::from(IDLE_MISO));
        // No frame requested: nothing arrives.
        assert_eq!(sim.rx_fifo_count(), 0);
    }

    #[test]
    fn stalled_shifter_never_drains() {
        let mut sim = SimLpspi::new();
        sim.stall(true);
        sim.write_tcr(TransmitCommand::frame_base());
        sim.write_data(1);
        for _ in 0..4 {
            assert_eq!(sim.tx_fifo_count(), 1);
        }
    }

    #[test]
    fn end_frame_releases_once() {
        let mut sim = SimLpspi::new();
        sim.write_tcr(TransmitCommand::frame_base());
        sim.write_tcr(TransmitCommand::frame_base().end_frame());
        sim.write_tcr(TransmitCommand::frame_base().end_frame());
        assert_eq!(
            sim.trace(),
            &[WireEvent::Selected, WireEvent::Released { tx_pending: 0 }]
        );
        assert!(!sim.is_selected());
    }

    #[test]
    fn init_rejects_sck_above_half_source() {
        let mut sim = SimLpspi::new();
        let cfg = LpspiMasterConfig::from_bus_config(&crate::BusConfig::new(100_000_000)).unwrap();
        assert_eq!(sim.master_init(&cfg, 150_000_000), Err(Error::Configuration));
        assert!(sim.master_config().is_none());
        assert!(sim.master_init(&cfg, 200_000_000).is_ok());
        assert_eq!(sim.init_count(), 1);
    }
}
