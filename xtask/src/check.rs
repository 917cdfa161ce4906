use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

use crate::{EMBEDDED_TARGET, PACKAGE};

/// How a failing step affects the overall result.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Severity {
    Fatal,
    Advisory,
}

struct Step {
    label: &'static str,
    args: Vec<&'static str>,
    severity: Severity,
}

pub fn run() -> Result<()> {
    println!();
    println!("{}", "🔍 Checking qspi builds...".cyan().bold());
    println!();

    let total_start = Instant::now();

    let steps = [
        Step {
            label: "no_std build (MCU target)",
            args: vec![
                "check",
                "-p",
                PACKAGE,
                "--target",
                EMBEDDED_TARGET,
                "--no-default-features",
            ],
            severity: Severity::Fatal,
        },
        Step {
            label: "no_std build with defmt logging",
            args: vec![
                "check",
                "-p",
                PACKAGE,
                "--target",
                EMBEDDED_TARGET,
                "--features",
                "defmt",
            ],
            severity: Severity::Fatal,
        },
        Step {
            label: "host build with std + tracing",
            args: vec!["check", "-p", PACKAGE, "--features", "std,tracing"],
            severity: Severity::Fatal,
        },
        Step {
            label: "clippy lints",
            args: vec![
                "clippy",
                "--workspace",
                "--all-targets",
                "--",
                "-D",
                "warnings",
            ],
            severity: Severity::Advisory,
        },
        Step {
            label: "code formatting",
            args: vec!["fmt", "--all", "--check"],
            severity: Severity::Advisory,
        },
    ];

    for step in &steps {
        run_step(step)?;
    }

    println!(
        "{}",
        format!(
            "✓ All checks completed in {:.2}s",
            total_start.elapsed().as_secs_f64()
        )
        .green()
        .bold()
    );
    println!();

    Ok(())
}

fn run_step(step: &Step) -> Result<()> {
    println!("{}", format!("  Checking {}...", step.label).cyan());
    let start = Instant::now();

    let output = Command::new("cargo")
        .args(&step.args)
        .output()
        .with_context(|| format!("Failed to run cargo for {}", step.label))?;

    if output.status.success() {
        println!(
            "{}",
            format!(
                "  ✓ {} passed in {:.2}s",
                step.label,
                start.elapsed().as_secs_f64()
            )
            .green()
        );
        println!();
        return Ok(());
    }

    match step.severity {
        Severity::Fatal => {
            eprintln!("{}", format!("  ✗ {} failed", step.label).red().bold());
            eprintln!();
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
            anyhow::bail!("{} failed", step.label);
        }
        Severity::Advisory => {
            eprintln!(
                "{}",
                format!("  ⚠ {} reported issues", step.label).yellow().bold()
            );
            eprintln!();
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
            if step.args.first() == Some(&"fmt") {
                eprintln!("     Run 'cargo fmt --all' to fix");
            }
            println!();
            Ok(())
        }
    }
}
