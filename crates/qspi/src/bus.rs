//! Backend-independent bus interface.
//!
//! Device drivers hold a [`MultiLaneBus`] and never see which controller
//! family sits underneath. [`Bus`] is the closed set of backends the
//! [`BusRegistry`](crate::registry::BusRegistry) stores.

use crate::config::BusConfig;
use crate::flexspi::{FlexspiBus, FlexspiRegisters};
use crate::lpspi::{LpspiBus, LpspiRegisters};
use crate::registry::BusKind;
use crate::transaction::Transaction;
use crate::wait::{Spin, WaitPolicy};
use crate::Error;

/// A bus able to run multi-lane command transactions.
///
/// Calls are synchronous and block until the last bit is on the wire. One
/// transfer runs at a time per bus; `&mut self` enforces it.
pub trait MultiLaneBus {
    /// Apply `config`. Only the first call touches the hardware; later calls
    /// return `Ok(())` without reconfiguring.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] or [`Error::InvalidClockRate`] on the first
    /// call.
    fn configure(&mut self, config: &BusConfig) -> Result<(), Error>;

    /// Run one transaction. Phases are emitted in order (instruction,
    /// address + mode, dummy, data) with absent phases skipped.
    ///
    /// Returns the number of data bytes moved. FlexSPI reports 1 for a
    /// successful transaction without data.
    ///
    /// # Errors
    ///
    /// Descriptor errors before any register is touched, hardware errors
    /// afterwards. See [`Error`].
    fn transfer(&mut self, transaction: &mut Transaction<'_>) -> Result<usize, Error>;

    /// Whether [`MultiLaneBus::configure`] has succeeded.
    fn is_configured(&self) -> bool;
}

impl<T: MultiLaneBus + ?Sized> MultiLaneBus for &mut T {
    fn configure(&mut self, config: &BusConfig) -> Result<(), Error> {
        (**self).configure(config)
    }

    fn transfer(&mut self, transaction: &mut Transaction<'_>) -> Result<usize, Error> {
        (**self).transfer(transaction)
    }

    fn is_configured(&self) -> bool {
        (**self).is_configured()
    }
}

/// Either backend.
pub enum Bus<A, B, W = Spin> {
    /// FIFO controller driven in software.
    Lpspi(LpspiBus<A, W>),
    /// LUT-sequenced controller.
    Flexspi(FlexspiBus<B>),
}

impl<A, B, W> Bus<A, B, W> {
    /// Controller family.
    pub const fn kind(&self) -> BusKind {
        match self {
            Self::Lpspi(_) => BusKind::Lpspi,
            Self::Flexspi(_) => BusKind::Flexspi,
        }
    }
}

impl<A, B, W> MultiLaneBus for Bus<A, B, W>
where
    A: LpspiRegisters,
    B: FlexspiRegisters,
    W: WaitPolicy,
{
    fn configure(&mut self, config: &BusConfig) -> Result<(), Error> {
        match self {
            Self::Lpspi(bus) => bus.configure(config),
            Self::Flexspi(bus) => bus.configure(config),
        }
    }

    fn transfer(&mut self, transaction: &mut Transaction<'_>) -> Result<usize, Error> {
        match self {
            Self::Lpspi(bus) => bus.transfer(transaction),
            Self::Flexspi(bus) => bus.transfer(transaction),
        }
    }

    fn is_configured(&self) -> bool {
        match self {
            Self::Lpspi(bus) => bus.is_configured(),
            Self::Flexspi(bus) => bus.is_configured(),
        }
    }
}

impl<A: LpspiRegisters, B, W: WaitPolicy> From<LpspiBus<A, W>> for Bus<A, B, W> {
    fn from(bus: LpspiBus<A, W>) -> Self {
        Self::Lpspi(bus)
    }
}

impl<A, B: FlexspiRegisters, W> From<FlexspiBus<B>> for Bus<A, B, W> {
    fn from(bus: FlexspiBus<B>) -> Self {
        Self::Flexspi(bus)
    }
}
