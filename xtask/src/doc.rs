use anyhow::{Context, Result};
use colored::Colorize;
use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use crate::{EMBEDDED_TARGET, PACKAGE};

/// Which build of the driver the documentation describes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Flavor {
    /// Host build: `std` error impls and `tracing` log forwarding.
    Host,
    /// MCU build: no_std with `defmt` log forwarding.
    Embedded,
}

impl Flavor {
    fn features(self) -> &'static str {
        match self {
            Self::Host => "std,tracing",
            Self::Embedded => "defmt",
        }
    }

    fn target(self) -> Option<&'static str> {
        match self {
            Self::Host => None,
            Self::Embedded => Some(EMBEDDED_TARGET),
        }
    }
}

/// Rustdoc warnings (broken intra-doc links, bare URLs) fail the build.
const RUSTDOC_DENY: &str = "-D warnings";

pub fn run(open: bool, flavor: Flavor) -> Result<()> {
    println!();
    println!(
        "{}",
        format!("📚 Building {PACKAGE} documentation ({flavor:?})...")
            .cyan()
            .bold()
    );
    println!();

    let start = Instant::now();

    let mut cmd = Command::new("cargo");
    cmd.args(["doc", "-p", PACKAGE, "--no-deps", "--features", flavor.features()]);
    if let Some(target) = flavor.target() {
        cmd.args(["--target", target]);
    }
    if open {
        cmd.arg("--open");
    }
    cmd.env(
        "RUSTDOCFLAGS",
        rustdoc_flags(env::var("RUSTDOCFLAGS").ok().as_deref()),
    );

    let output = cmd.output().context("Failed to run cargo doc")?;

    if !output.status.success() {
        eprintln!("{}", "✗ Documentation build failed".red().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&output.stderr));
        if flavor == Flavor::Embedded {
            eprintln!("     Run 'rustup target add {EMBEDDED_TARGET}' if the target is missing");
        }
        anyhow::bail!("Documentation build failed");
    }

    println!(
        "{}",
        format!(
            "✓ Documentation built in {:.2}s",
            start.elapsed().as_secs_f64()
        )
        .green()
    );

    if !open {
        let target_dir = env::var_os("CARGO_TARGET_DIR")
            .map_or_else(|| PathBuf::from("target"), PathBuf::from);
        println!();
        println!(
            "   {}",
            format!(
                "Open {} in your browser",
                index_path(&target_dir, flavor.target()).display()
            )
            .dimmed()
        );
    }

    println!();

    Ok(())
}

/// Appends the deny flag to whatever the caller already exported.
fn rustdoc_flags(existing: Option<&str>) -> String {
    match existing.map(str::trim) {
        Some(flags) if !flags.is_empty() => format!("{flags} {RUSTDOC_DENY}"),
        _ => RUSTDOC_DENY.to_string(),
    }
}

/// Cargo nests per-target output under the triple.
fn index_path(target_dir: &Path, target: Option<&str>) -> PathBuf {
    let mut path = target_dir.to_path_buf();
    if let Some(triple) = target {
        path.push(triple);
    }
    path.push("doc");
    path.push(PACKAGE);
    path.push("index.html");
    path
}
