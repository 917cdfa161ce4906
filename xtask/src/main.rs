// Host tooling crate: unwrap/expect/panic are acceptable outside the driver.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod check;
mod doc;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Embedded target the driver crate must keep building for.
pub const EMBEDDED_TARGET: &str = "thumbv8m.main-none-eabihf";

/// Package under development.
pub const PACKAGE: &str = "qspi";

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "QSPI engine development tasks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check no_std builds for the MCU target, clippy and formatting
    Check,
    /// Run unit, integration and doc tests against the simulated controllers
    Test {
        /// Run only unit tests
        #[arg(long)]
        unit: bool,
        /// Run only integration tests
        #[arg(long)]
        integration: bool,
    },
    /// Build documentation with rustdoc warnings denied
    Doc {
        /// Open documentation in browser
        #[arg(long)]
        open: bool,
        /// Document the no_std defmt build for the MCU target
        #[arg(long)]
        embedded: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check => check::run(),
        Commands::Test { unit, integration } => test::run(unit, integration),
        Commands::Doc { open, embedded } => {
            let flavor = if embedded {
                doc::Flavor::Embedded
            } else {
                doc::Flavor::Host
            };
            doc::run(open, flavor)
        }
    }
}
