//! Device drivers built on [`MultiLaneBus`](crate::bus::MultiLaneBus).
//!
//! - [`panel`]: QSPI display-panel command/pixel transport.
//! - [`flash`]: quad NOR flash reads through `embedded-storage`.

pub mod flash;
pub mod panel;

pub use flash::QuadFlash;
pub use panel::PanelLink;
