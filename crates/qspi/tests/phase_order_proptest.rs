//! Property-based tests for phase ordering.
//! For any well-formed descriptor, both backends emit exactly the present
//! phases, in order, each on its own line width, and put the same bytes on
//! the same lines.
#![allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::cast_possible_truncation,
    missing_docs
)]

use proptest::prelude::*;
use qspi::flexspi::{decode_sequence, FlexspiBus, LutInstruction, MicroProgram, Opcode};
use qspi::sim::{incoming, outgoing, SimFlexspi, SimLpspi, Wire, WireEvent};
use qspi::{BusConfig, LineWidth, LpspiBus, MultiLaneBus, Transaction};

fn width() -> impl Strategy<Value = LineWidth> {
    prop_oneof![
        Just(LineWidth::Single),
        Just(LineWidth::Dual),
        Just(LineWidth::Quad),
    ]
}

/// Plain-data descriptor; the transaction borrows its buffers.
#[derive(Debug, Clone)]
struct Shape {
    instruction: Option<(u8, LineWidth)>,
    address: (u32, u8, LineWidth),
    mode: (u32, u8, LineWidth),
    dummy_cycles: u8,
    data_lines: LineWidth,
    write: Option<Vec<u8>>,
    read_len: usize,
}

fn shapes(max_mode_bytes: u8) -> impl Strategy<Value = Shape> {
    (
        proptest::option::of((any::<u8>(), width())),
        (any::<u32>(), 0u8..=4, width()),
        (any::<u32>(), 0u8..=max_mode_bytes, width()),
        0u8..=12,
        width(),
        proptest::option::of(proptest::collection::vec(any::<u8>(), 0..24)),
        0usize..24,
    )
        .prop_map(
            |(instruction, address, mode, dummy_cycles, data_lines, write, read_len)| Shape {
                instruction,
                address,
                mode,
                dummy_cycles,
                data_lines,
                write,
                read_len,
            },
        )
}

fn build<'a>(shape: &'a Shape, read_buf: &'a mut [u8]) -> Transaction<'a> {
    let mut txn = Transaction::new();
    if let Some((content, lines)) = shape.instruction {
        txn = txn.with_instruction(content, lines);
    }
    let (address, size, address_lines) = shape.address;
    let (mode, mode_size, mode_lines) = shape.mode;
    txn = txn
        .with_address(address, size, address_lines)
        .with_alternate_bytes(mode, mode_size, mode_lines)
        .with_dummy_cycles(shape.dummy_cycles);
    match &shape.write {
        Some(data) => txn.with_write(data, shape.data_lines),
        None => txn.with_read(read_buf, shape.data_lines),
    }
}

/// Low `size` bytes of `value`, most significant first.
fn tail(value: u32, size: u8) -> Vec<u8> {
    value.to_be_bytes()[4 - usize::from(size)..].to_vec()
}

proptest::proptest! {
    /// The FIFO backend puts instruction, address, mode and write data on the
    /// wire in that order, and clocks in `dummy / 2` quad frames before any
    /// read data.
    #[test]
    fn lpspi_wire_order_matches_descriptor(shape in shapes(4), miso in proptest::collection::vec(any::<u8>(), 0..40)) {
        let mut sim = SimLpspi::new();
        sim.queue_miso(&miso);
        let mut bus = LpspiBus::new(&mut sim, 150_000_000);
        bus.configure(&BusConfig::new(48_000_000)).unwrap();

        let mut read_buf = vec![0u8; shape.read_len];
        let mut txn = build(&shape, &mut read_buf);
        let moved = bus.transfer(&mut txn).unwrap();
        drop(txn);
        drop(bus);

        let (address, size, address_lines) = shape.address;
        let (mode, mode_size, mode_lines) = shape.mode;
        let mut expected_out = Vec::new();
        if let Some((content, lines)) = shape.instruction {
            expected_out.push((lines, content));
        }
        expected_out.extend(tail(address, size).into_iter().map(|b| (address_lines, b)));
        expected_out.extend(tail(mode, mode_size).into_iter().map(|b| (mode_lines, b)));
        if let Some(data) = &shape.write {
            expected_out.extend(data.iter().map(|&b| (shape.data_lines, b)));
        }
        let actual_out: Vec<_> = outgoing(sim.trace()).collect();
        prop_assert_eq!(actual_out, expected_out);

        let dummy_frames = usize::from(shape.dummy_cycles / 2);
        let read_len = if shape.write.is_some() { 0 } else { shape.read_len };
        let received: Vec<_> = incoming(sim.trace()).collect();
        prop_assert_eq!(received.len(), dummy_frames + read_len);
        prop_assert!(received[..dummy_frames].iter().all(|&(l, _)| l == LineWidth::Quad));
        prop_assert!(received[dummy_frames..].iter().all(|&(l, _)| l == shape.data_lines));

        // Read data is what the device drove after the dummy frames.
        let data_in: Vec<u8> = received[dummy_frames..].iter().map(|&(_, b)| b).collect();
        prop_assert_eq!(&read_buf[..read_len], &data_in[..]);

        let expected_len = shape.write.as_ref().map_or(shape.read_len, Vec::len);
        prop_assert_eq!(moved, expected_len);

        // Dummy and data-in frames never precede the last outgoing
        // address byte.
        let trace = sim.trace();
        let last_out = trace.iter().rposition(|e| matches!(e, WireEvent::Clocked { wire: Wire::Out, .. }));
        let first_in = trace.iter().position(|e| matches!(e, WireEvent::Clocked { wire: Wire::In, .. }));
        if let (Some(out), Some(inp), None) = (last_out, first_in, &shape.write) {
            prop_assert!(out < inp);
        }
    }

    /// Compiling and decoding reproduces the descriptor's phases, widths and
    /// operands.
    #[test]
    fn micro_program_round_trips(shape in shapes(1)) {
        let mut read_buf = vec![0u8; shape.read_len];
        let txn = build(&shape, &mut read_buf);
        let program = MicroProgram::compile(&txn).unwrap();

        let (_, size, address_lines) = shape.address;
        let (mode, mode_size, mode_lines) = shape.mode;
        let mut expected = Vec::new();
        if let Some((content, lines)) = shape.instruction {
            expected.push(LutInstruction::new(Opcode::Command, lines, content));
        }
        if size != 0 {
            expected.push(LutInstruction::new(Opcode::RowAddress, address_lines, size));
        }
        if mode_size != 0 {
            expected.push(LutInstruction::new(Opcode::Mode8, mode_lines, mode as u8));
        }
        if shape.dummy_cycles != 0 {
            expected.push(LutInstruction::new(Opcode::Dummy, LineWidth::Quad, shape.dummy_cycles));
        }
        match &shape.write {
            Some(data) if !data.is_empty() => {
                expected.push(LutInstruction::new(Opcode::Write, shape.data_lines, 0));
            }
            None if shape.read_len != 0 => {
                expected.push(LutInstruction::new(Opcode::Read, shape.data_lines, 0));
            }
            _ => {}
        }

        let decoded: Vec<_> = program.instructions().collect();
        prop_assert_eq!(&decoded, &expected);
        let from_words: Vec<_> = decode_sequence(program.words()).collect();
        prop_assert_eq!(from_words, expected);
    }

    /// The sequencer backend reports the data length, or 1 when there is
    /// no data phase.
    #[test]
    fn flexspi_return_value(shape in shapes(1)) {
        let mut sim = SimFlexspi::new();
        let mut bus = FlexspiBus::new(&mut sim);
        bus.configure(&BusConfig::new(48_000_000)).unwrap();
        let mut read_buf = vec![0u8; shape.read_len];
        let mut txn = build(&shape, &mut read_buf);
        let moved = bus.transfer(&mut txn).unwrap();
        let length = shape.write.as_ref().map_or(shape.read_len, Vec::len);
        prop_assert_eq!(moved, if length == 0 { 1 } else { length });
    }

    /// Both backends clock the same outgoing bytes on the same line widths
    /// for any descriptor the sequencer accepts.
    #[test]
    fn backends_put_identical_bytes_on_the_wire(shape in shapes(1)) {
        let mut lpspi = SimLpspi::new();
        let mut bus = LpspiBus::new(&mut lpspi, 150_000_000);
        bus.configure(&BusConfig::new(48_000_000)).unwrap();
        let mut read_buf = vec![0u8; shape.read_len];
        bus.transfer(&mut build(&shape, &mut read_buf)).unwrap();
        drop(bus);

        let mut flexspi = SimFlexspi::new();
        let mut bus = FlexspiBus::new(&mut flexspi);
        bus.configure(&BusConfig::new(48_000_000)).unwrap();
        let mut read_buf = vec![0u8; shape.read_len];
        bus.transfer(&mut build(&shape, &mut read_buf)).unwrap();
        drop(bus);

        let fifo: Vec<_> = outgoing(lpspi.trace()).collect();
        let sequenced: Vec<_> = outgoing(flexspi.trace()).collect();
        prop_assert_eq!(fifo, sequenced);
    }
}
