//! Panel link framing and quad flash reads on both backends.
#![allow(clippy::unwrap_used, clippy::indexing_slicing, missing_docs)]

use embedded_storage::nor_flash::ReadNorFlash;
use qspi::client::flash::{CMD_FAST_READ_QUAD_IO, MODE_NO_CONTINUOUS_READ};
use qspi::client::panel::RAMWR;
use qspi::client::{PanelLink, QuadFlash};
use qspi::flexspi::{FlexspiBus, Opcode};
use qspi::sim::{incoming, outgoing, SimFlexspi, SimLpspi, WireEvent};
use qspi::{BusConfig, Error, LineWidth, LpspiBus, MultiLaneBus};

fn sent(trace: &[WireEvent]) -> Vec<(LineWidth, u8)> {
    outgoing(trace).collect()
}

// ── Panel ────────────────────────────────────────────────────────────────────

#[test]
fn panel_init_configures_48mhz_mode0() {
    let mut sim = SimLpspi::new();
    let mut panel = PanelLink::new(LpspiBus::new(&mut sim, 150_000_000));
    panel.init().unwrap();
    let bus = panel.release();
    assert!(bus.is_configured());
    drop(bus);
    let master = sim.master_config().unwrap();
    assert_eq!(master.baud_rate, 48_000_000);
    assert_eq!(master.pcs_to_sck_delay_ns, 10);
}

#[test]
fn panel_command_frame() {
    let mut sim = SimLpspi::new();
    let mut panel = PanelLink::new(LpspiBus::new(&mut sim, 150_000_000));
    panel.init().unwrap();
    panel.write_command(&[0x36, 0x48]).unwrap();
    drop(panel);

    assert_eq!(
        sent(sim.trace()),
        vec![
            (LineWidth::Single, 0x12),
            (LineWidth::Quad, 0x00),
            (LineWidth::Quad, 0x36),
            (LineWidth::Quad, 0x00),
            (LineWidth::Quad, 0x48),
        ]
    );
}

#[test]
fn panel_command_without_params_has_no_data_phase() {
    let mut sim = SimLpspi::new();
    let mut panel = PanelLink::new(LpspiBus::new(&mut sim, 150_000_000));
    panel.init().unwrap();
    panel.write_command(&[0x29]).unwrap();
    drop(panel);
    assert_eq!(sent(sim.trace()).len(), 4);
}

#[test]
fn panel_pixels_go_to_ramwr() {
    let mut sim = SimFlexspi::new();
    let mut panel = PanelLink::new(FlexspiBus::new(&mut sim));
    panel.init().unwrap();
    let pixels = [0xF8, 0x00, 0x07, 0xE0];
    panel.write_data(&pixels).unwrap();
    drop(panel);

    let bytes: Vec<u8> = outgoing(sim.trace()).map(|(_, b)| b).collect();
    assert_eq!(bytes, [0x12, 0x00, RAMWR, 0x00, 0xF8, 0x00, 0x07, 0xE0]);
}

#[test]
fn panel_rejects_empty_command() {
    let mut sim = SimLpspi::new();
    let mut panel = PanelLink::new(LpspiBus::new(&mut sim, 150_000_000));
    panel.init().unwrap();
    assert_eq!(panel.write_command(&[]), Err(Error::EmptyCommand));
    drop(panel);
    assert!(sim.trace().is_empty());
}

// ── Flash ────────────────────────────────────────────────────────────────────

const CAPACITY: usize = 16 * 1024 * 1024;

fn lpspi_flash(sim: &mut SimLpspi) -> QuadFlash<LpspiBus<&mut SimLpspi>> {
    let mut bus = LpspiBus::new(sim, 150_000_000);
    bus.configure(&BusConfig::new(48_000_000)).unwrap();
    QuadFlash::new(bus, CAPACITY)
}

#[test]
fn jedec_id_on_lpspi() {
    let mut sim = SimLpspi::new();
    sim.queue_miso(&[0xEF, 0x40, 0x18]);
    let mut flash = lpspi_flash(&mut sim);
    assert_eq!(flash.read_jedec_id().unwrap(), [0xEF, 0x40, 0x18]);
}

#[test]
fn fast_read_quad_io_framing_on_lpspi() {
    let mut sim = SimLpspi::new();
    // Two dummy frames (4 cycles on four lines), then data.
    sim.queue_miso(&[0x00, 0x00, 0xCA, 0xFE]);
    let mut flash = lpspi_flash(&mut sim);
    let mut buf = [0u8; 2];
    flash.read(0x0001_0203, &mut buf).unwrap();
    drop(flash);
    assert_eq!(buf, [0xCA, 0xFE]);

    assert_eq!(
        sent(sim.trace()),
        vec![
            (LineWidth::Single, CMD_FAST_READ_QUAD_IO),
            (LineWidth::Quad, 0x01),
            (LineWidth::Quad, 0x02),
            (LineWidth::Quad, 0x03),
            (LineWidth::Quad, MODE_NO_CONTINUOUS_READ),
        ]
    );
    let received: Vec<(LineWidth, u8)> = incoming(sim.trace()).collect();
    assert_eq!(received.len(), 4);
    assert!(received.iter().all(|&(lines, _)| lines == LineWidth::Quad));
}

#[test]
fn fast_read_compiles_to_full_sequence_on_flexspi() {
    let mut sim = SimFlexspi::new();
    sim.queue_miso(&[0x11, 0x22, 0x33]);
    let mut bus = FlexspiBus::new(&mut sim);
    bus.configure(&BusConfig::new(48_000_000)).unwrap();
    let mut flash = QuadFlash::new(bus, CAPACITY);
    let mut buf = [0u8; 3];
    flash.read(0x100, &mut buf).unwrap();
    drop(flash);
    assert_eq!(buf, [0x11, 0x22, 0x33]);

    let ops: Vec<Opcode> = qspi::flexspi::decode_sequence(sim.sequence(1).unwrap())
        .map(|i| i.opcode)
        .collect();
    assert_eq!(
        ops,
        [
            Opcode::Command,
            Opcode::RowAddress,
            Opcode::Mode8,
            Opcode::Dummy,
            Opcode::Read
        ]
    );
    assert_eq!(sim.transfers()[0].device_address, 0x100);
}

#[test]
fn large_reads_are_chunked() {
    let mut sim = SimFlexspi::new();
    let mut bus = FlexspiBus::new(&mut sim);
    bus.configure(&BusConfig::new(48_000_000)).unwrap();
    let mut flash = QuadFlash::new(bus, CAPACITY);
    let mut buf = vec![0u8; 5000];
    flash.read(0x2000, &mut buf).unwrap();
    drop(flash);

    let transfers = sim.transfers();
    assert_eq!(transfers.len(), 2);
    assert_eq!((transfers[0].device_address, transfers[0].length), (0x2000, 4096));
    assert_eq!((transfers[1].device_address, transfers[1].length), (0x3000, 904));
}

#[test]
fn read_past_capacity_is_out_of_bounds() {
    let mut sim = SimLpspi::new();
    let mut flash = lpspi_flash(&mut sim);
    let mut buf = [0u8; 4];
    let offset = u32::try_from(CAPACITY - 2).unwrap();
    assert_eq!(flash.read(offset, &mut buf), Err(Error::OutOfBounds));
    assert_eq!(flash.capacity(), CAPACITY);
}
