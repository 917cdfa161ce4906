//! Board bring-up flow: register both backends, attach devices by bus name,
//! configure and transfer through the registry.
#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::panic, missing_docs)]

use qspi::flexspi::FlexspiBus;
use qspi::sim::{outgoing, SimFlexspi, SimLpspi};
use qspi::{
    Bus, BusConfig, BusKind, BusRegistry, Error, LineWidth, LpspiBus, MultiLaneBus, Transaction,
};

type BoardBus = Bus<SimLpspi, SimFlexspi>;

fn board() -> BusRegistry<BoardBus, 4> {
    let mut reg = BusRegistry::new();
    reg.register_bus(3, LpspiBus::new(SimLpspi::new(), 150_000_000).into())
        .unwrap();
    reg.register_bus(0, FlexspiBus::new(SimFlexspi::new()).into())
        .unwrap();
    reg
}

fn lpspi_sim(bus: &mut BoardBus) -> &mut SimLpspi {
    match bus {
        Bus::Lpspi(bus) => bus.regs_mut(),
        Bus::Flexspi(_) => panic!("expected an LPSPI bus"),
    }
}

fn flexspi_sim(bus: &mut BoardBus) -> &mut SimFlexspi {
    match bus {
        Bus::Flexspi(bus) => bus.regs_mut(),
        Bus::Lpspi(_) => panic!("expected a FlexSPI bus"),
    }
}

#[test]
fn generated_names_identify_backends() {
    let reg = board();
    let lcd_bus = reg.find("qspi3").unwrap();
    let flash_bus = reg.find("fspi0").unwrap();
    assert_eq!(reg.kind(lcd_bus), Some(BusKind::Lpspi));
    assert_eq!(reg.kind(flash_bus), Some(BusKind::Flexspi));
    assert_eq!(reg.find("qspi0"), None);
    assert_eq!(reg.len(), 2);
}

#[test]
fn same_instance_cannot_register_twice() {
    let mut reg = board();
    let again = LpspiBus::new(SimLpspi::new(), 150_000_000).into();
    assert_eq!(reg.register_bus(3, again), Err(Error::DuplicateBus));
}

#[test]
fn attach_rejects_unsupported_widths() {
    let reg = board();
    for lines in [0u8, 3, 5, 8] {
        assert_eq!(
            reg.attach("qspi3", "lcd", lines).unwrap_err(),
            Error::InvalidLineWidth { lines }
        );
    }
    for lines in [1u8, 2, 4] {
        assert!(reg.attach("qspi3", "lcd", lines).is_ok());
    }
}

#[test]
fn transfers_route_to_the_attached_bus() {
    let mut reg = board();
    let lcd = reg.attach("qspi3", "lcd", 4).unwrap();
    let flash = reg.attach("fspi0", "norflash", 4).unwrap();

    reg.configure(&lcd, &BusConfig::new(48_000_000)).unwrap();
    reg.configure(&flash, &BusConfig::new(48_000_000)).unwrap();

    let mut txn = Transaction::new().with_instruction(0x29, LineWidth::Single);
    assert_eq!(reg.transfer(&lcd, &mut txn).unwrap(), 0);
    let mut txn = Transaction::new().with_instruction(0x06, LineWidth::Single);
    assert_eq!(reg.transfer(&flash, &mut txn).unwrap(), 1);

    let lcd_sim = lpspi_sim(reg.get_mut(lcd.bus()).unwrap());
    let sent: Vec<u8> = outgoing(lcd_sim.trace()).map(|(_, b)| b).collect();
    assert_eq!(sent, [0x29]);

    let flash_sim = flexspi_sim(reg.get_mut(flash.bus()).unwrap());
    let sent: Vec<u8> = outgoing(flash_sim.trace()).map(|(_, b)| b).collect();
    assert_eq!(sent, [0x06]);
}

#[test]
fn unconfigured_bus_refuses_transfers() {
    let mut reg = board();
    let lcd = reg.attach("qspi3", "lcd", 4).unwrap();
    let mut txn = Transaction::new().with_instruction(0x29, LineWidth::Single);
    assert_eq!(reg.transfer(&lcd, &mut txn), Err(Error::NotConfigured));
    assert!(!reg.get_mut(lcd.bus()).unwrap().is_configured());
}

fn enable_quad(bus: &mut dyn MultiLaneBus) -> Result<(), Error> {
    // Write status register 2 with QE set.
    let mut txn = Transaction::new()
        .with_instruction(0x31, LineWidth::Single)
        .with_write(&[0x02], LineWidth::Single);
    bus.transfer(&mut txn).map(|_| ())
}

#[test]
fn quad_mode_hook_issues_its_command() {
    let mut reg = board();
    let flash = reg
        .attach("fspi0", "norflash", 4)
        .unwrap()
        .with_mode_hooks(Some(enable_quad), None);
    reg.configure(&flash, &BusConfig::new(48_000_000)).unwrap();
    reg.enter_quad_mode(&flash).unwrap();
    reg.exit_quad_mode(&flash).unwrap();

    let sim = flexspi_sim(reg.get_mut(flash.bus()).unwrap());
    assert_eq!(sim.transfers().len(), 1);
    let sent: Vec<u8> = outgoing(sim.trace()).map(|(_, b)| b).collect();
    assert_eq!(sent, [0x31, 0x02]);
}
