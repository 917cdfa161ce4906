//! Bus registry and device attach.
//!
//! The board populates one [`BusRegistry`] at startup with every enabled
//! controller instance. Each bus gets a generated name (`qspi<n>` for
//! LPSPI, `fspi<n>` for FlexSPI, `n` being the controller instance)
//! and a [`BusId`]. The registry is never resized after startup; its
//! capacity is the const parameter `N`.
//!
//! Device drivers attach to a bus by name and then go through the registry
//! for [`configure`](BusRegistry::configure) and
//! [`transfer`](BusRegistry::transfer).

use core::fmt::Write as _;

use crate::bus::{Bus, MultiLaneBus};
use crate::config::{BusConfig, FLEXSPI_NAME_PREFIX, LPSPI_NAME_PREFIX, NAME_CAPACITY};
use crate::transaction::{LineWidth, Transaction};
use crate::Error;

/// Bus or device name.
pub type Name = heapless::String<NAME_CAPACITY>;

/// Hook that switches a device in or out of its multi-lane mode, issuing
/// whatever command the device needs on the bus it is attached to.
pub type ModeHook = fn(&mut dyn MultiLaneBus) -> Result<(), Error>;

/// Controller family of a registered bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusKind {
    /// FIFO controller (LPSPI).
    Lpspi,
    /// LUT-sequenced controller (FlexSPI).
    Flexspi,
}

impl BusKind {
    /// Name prefix of buses of this kind.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Lpspi => LPSPI_NAME_PREFIX,
            Self::Flexspi => FLEXSPI_NAME_PREFIX,
        }
    }

    /// Generated name for controller `instance`.
    ///
    /// # Errors
    ///
    /// [`Error::NameTooLong`] if the name does not fit [`Name`].
    pub fn bus_name(self, instance: u8) -> Result<Name, Error> {
        let mut name = Name::new();
        write!(name, "{}{}", self.prefix(), instance).map_err(|_| Error::NameTooLong)?;
        Ok(name)
    }
}

/// Index of a bus in its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusId(u8);

impl BusId {
    /// Arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

struct Slot<B> {
    name: Name,
    kind: BusKind,
    bus: B,
}

/// Fixed-capacity arena of buses.
pub struct BusRegistry<B, const N: usize> {
    slots: heapless::Vec<Slot<B>, N>,
}

impl<B, const N: usize> Default for BusRegistry<B, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B, const N: usize> BusRegistry<B, N> {
    /// Empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: heapless::Vec::new(),
        }
    }

    /// Register `bus` as instance `instance` of `kind`.
    ///
    /// # Errors
    ///
    /// - [`Error::DuplicateBus`] if the generated name is taken.
    /// - [`Error::RegistryFull`] when all `N` slots are used.
    pub fn register(&mut self, kind: BusKind, instance: u8, bus: B) -> Result<BusId, Error> {
        let name = kind.bus_name(instance)?;
        if self.find(&name).is_some() {
            return Err(Error::DuplicateBus);
        }
        let id = u8::try_from(self.slots.len())
            .map(BusId)
            .map_err(|_| Error::RegistryFull)?;
        debug!("registered bus {} as id {}", name.as_str(), id.0);
        self.slots
            .push(Slot { name, kind, bus })
            .map_err(|_| Error::RegistryFull)?;
        Ok(id)
    }

    /// Look a bus up by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<BusId> {
        self.slots
            .iter()
            .position(|slot| slot.name.as_str() == name)
            .and_then(|index| u8::try_from(index).ok())
            .map(BusId)
    }

    /// Name of a registered bus.
    #[must_use]
    pub fn name(&self, id: BusId) -> Option<&str> {
        self.slots.get(id.index()).map(|slot| slot.name.as_str())
    }

    /// Controller family of a registered bus.
    #[must_use]
    pub fn kind(&self, id: BusId) -> Option<BusKind> {
        self.slots.get(id.index()).map(|slot| slot.kind)
    }

    /// Borrow a registered bus.
    pub fn get_mut(&mut self, id: BusId) -> Option<&mut B> {
        self.slots.get_mut(id.index()).map(|slot| &mut slot.bus)
    }

    /// Registered buses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// No buses registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Attach a device to the bus named `bus_name`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidLineWidth`] unless `data_lines` is 1, 2 or 4.
    /// - [`Error::UnknownBus`] if no bus has that name.
    /// - [`Error::NameTooLong`] if `device_name` does not fit [`Name`].
    pub fn attach(
        &self,
        bus_name: &str,
        device_name: &str,
        data_lines: u8,
    ) -> Result<QspiDevice, Error> {
        let data_lines = LineWidth::from_lines(data_lines)?;
        let bus = self.find(bus_name).ok_or(Error::UnknownBus)?;
        let name = Name::try_from(device_name).map_err(|_| Error::NameTooLong)?;
        debug!("attached {} to {}", device_name, bus_name);
        Ok(QspiDevice {
            name,
            bus,
            data_lines,
            enter_quad_mode: None,
            exit_quad_mode: None,
        })
    }

    fn bus_for(&mut self, device: &QspiDevice) -> Result<&mut B, Error> {
        self.get_mut(device.bus).ok_or(Error::UnknownBus)
    }
}

impl<B: MultiLaneBus, const N: usize> BusRegistry<B, N> {
    /// Configure the bus `device` is attached to.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownBus`] for a device from another registry, otherwise
    /// whatever the backend's configure returns.
    pub fn configure(&mut self, device: &QspiDevice, config: &BusConfig) -> Result<(), Error> {
        self.bus_for(device)?.configure(config)
    }

    /// Run `transaction` on the bus `device` is attached to.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownBus`] for a device from another registry, otherwise
    /// whatever the backend's transfer returns.
    pub fn transfer(
        &mut self,
        device: &QspiDevice,
        transaction: &mut Transaction<'_>,
    ) -> Result<usize, Error> {
        self.bus_for(device)?.transfer(transaction)
    }

    /// Run the device's enter-quad-mode hook, if it has one.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownBus`] or the hook's error.
    pub fn enter_quad_mode(&mut self, device: &QspiDevice) -> Result<(), Error> {
        match device.enter_quad_mode {
            Some(hook) => hook(self.bus_for(device)?),
            None => Ok(()),
        }
    }

    /// Run the device's exit-quad-mode hook, if it has one.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownBus`] or the hook's error.
    pub fn exit_quad_mode(&mut self, device: &QspiDevice) -> Result<(), Error> {
        match device.exit_quad_mode {
            Some(hook) => hook(self.bus_for(device)?),
            None => Ok(()),
        }
    }
}

impl<A, F, W, const N: usize> BusRegistry<Bus<A, F, W>, N> {
    /// Register a backend, taking the kind from the variant.
    ///
    /// # Errors
    ///
    /// As [`BusRegistry::register`].
    pub fn register_bus(&mut self, instance: u8, bus: Bus<A, F, W>) -> Result<BusId, Error> {
        self.register(bus.kind(), instance, bus)
    }
}

/// A device attached to a registered bus.
#[derive(Debug, Clone)]
pub struct QspiDevice {
    name: Name,
    bus: BusId,
    data_lines: LineWidth,
    enter_quad_mode: Option<ModeHook>,
    exit_quad_mode: Option<ModeHook>,
}

impl QspiDevice {
    /// Install enter/exit quad-mode hooks.
    #[must_use]
    pub fn with_mode_hooks(mut self, enter: Option<ModeHook>, exit: Option<ModeHook>) -> Self {
        self.enter_quad_mode = enter;
        self.exit_quad_mode = exit;
        self
    }

    /// Device name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Bus the device is attached to.
    #[must_use]
    pub const fn bus(&self) -> BusId {
        self.bus
    }

    /// Data-phase line width the device uses.
    #[must_use]
    pub const fn data_lines(&self) -> LineWidth {
        self.data_lines
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
