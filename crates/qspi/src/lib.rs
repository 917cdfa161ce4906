//! Multi-lane serial command-transaction engine for NXP MCX controllers
//!
//! This crate turns a [`Transaction`] (instruction, address + mode bytes,
//! dummy cycles, data) into wire activity on 1, 2 or 4 data lines, as used by
//! QSPI display panels and quad NOR flash.
//!
//! # Architecture
//!
//! ```text
//! Device drivers (client::panel, client::flash, board code)
//!         ↓
//! BusRegistry  ──  QspiDevice (name, bus, data lines, mode hooks)
//!         ↓
//! MultiLaneBus (configure / transfer)
//!         ↓
//! ┌───────────────────────┬──────────────────────────────┐
//! │ LpspiBus              │ FlexspiBus                   │
//! │ phase-by-phase FIFO   │ LUT micro-program + IP cmd   │
//! └───────────────────────┴──────────────────────────────┘
//!         ↓                          ↓
//! LpspiRegisters              FlexspiRegisters
//! (board PAC impl / sim::SimLpspi)  (vendor SDK impl / sim::SimFlexspi)
//! ```
//!
//! All calls are synchronous. A transfer holds chip-select for its whole
//! duration and returns only after the last bit is on the wire.
//!
//! # Features
//!
//! - `std`: `std::error::Error` for [`Error`]
//! - `defmt`: `defmt::Format` derives and defmt log output (hardware builds)
//! - `tracing`: log through `tracing` (host builds)
//!
//! # Example
//!
//! ```
//! use qspi::sim::SimLpspi;
//! use qspi::{BusConfig, LineWidth, LpspiBus, MultiLaneBus, Transaction};
//!
//! let mut sim = SimLpspi::new();
//! sim.queue_miso(&[0xEF, 0x40, 0x18]);
//! let mut bus = LpspiBus::new(&mut sim, 150_000_000);
//! bus.configure(&BusConfig::new(24_000_000)).unwrap();
//!
//! let mut id = [0u8; 3];
//! let mut txn = Transaction::new()
//!     .with_instruction(0x9F, LineWidth::Single)
//!     .with_read(&mut id, LineWidth::Single);
//! assert_eq!(bus.transfer(&mut txn).unwrap(), 3);
//! assert_eq!(id, [0xEF, 0x40, 0x18]);
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)]
#![deny(unused_must_use)]
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
// Pedantic lints suppressed for this driver crate:
#![allow(clippy::doc_markdown)] // register and opcode names in doc comments
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)] // register accessors, callers decide
#![allow(clippy::missing_errors_doc)]

#[macro_use]
mod log;

pub mod bus;
pub mod client;
pub mod config;
pub mod error;
pub mod flexspi;
pub mod lpspi;
pub mod registry;
pub mod sim;
pub mod transaction;
pub mod wait;

pub use bus::{Bus, MultiLaneBus};
pub use config::BusConfig;
pub use error::Error;
pub use flexspi::{FlexspiBus, FlexspiRegisters, FlexspiSettings, MicroProgram};
pub use lpspi::{LpspiBus, LpspiRegisters};
pub use registry::{BusId, BusKind, BusRegistry, ModeHook, QspiDevice};
pub use transaction::{
    Address, AlternateBytes, DataBuffer, DataPhase, Direction, Instruction, LineWidth,
    Transaction,
};
pub use wait::{BoundedSpin, Spin, WaitPolicy};
