//! Development automation for the keeper workspace.
//!
//! Run with: `cargo xtask <command>`
//!
//! Output is meant for a developer's terminal, so it goes through
//! `println!` and `eprintln!` rather than `tracing`.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::env;
use std::process::{Command, ExitCode};

use anyhow::{bail, Context, Result};

mod features;

fn main() -> ExitCode {
    let task = env::args().nth(1);

    let result = match task.as_deref() {
        Some("ci") => run_ci(),
        Some("fmt") => run_fmt(),
        Some("clippy") => run_clippy(),
        Some("test") => run_test(),
        Some("tiers") => features::check_tiers(),
        Some("help") | None => {
            print_help();
            Ok(())
        }
        Some(unknown) => {
            eprintln!("Unknown task: {unknown}");
            eprintln!();
            print_help();
            Err(anyhow::anyhow!("unknown task"))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Task failed: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn print_help() {
    println!("keeper development tasks");
    println!();
    println!("USAGE:");
    println!("    cargo xtask <TASK>");
    println!();
    println!("TASKS:");
    println!("    ci      Run fmt, clippy, tiers and test in sequence");
    println!("    fmt     Check Rust formatting");
    println!("    clippy  Run Clippy on every target with warnings denied");
    println!("    test    Run the workspace tests with all features");
    println!("    tiers   Check each keeper-common feature tier builds alone");
    println!("    help    Show this help message");
}

fn run_ci() -> Result<()> {
    println!("==> Step 1/4: Checking format...");
    run_fmt()?;

    println!("\n==> Step 2/4: Running Clippy...");
    run_clippy()?;

    println!("\n==> Step 3/4: Checking feature tiers...");
    features::check_tiers()?;

    println!("\n==> Step 4/4: Running tests...");
    run_test()?;

    println!("\n✓ All CI checks passed!");
    Ok(())
}

fn run_fmt() -> Result<()> {
    cargo(&["fmt", "--all", "--", "--check"])
        .context("format check failed, run 'cargo fmt --all' to fix")
}

fn run_clippy() -> Result<()> {
    cargo(&["clippy", "--workspace", "--all-targets", "--all-features", "--", "-D", "warnings"])
}

fn run_test() -> Result<()> {
    cargo(&["test", "--workspace", "--all-features"])
}

/// Run `cargo` with `args`, failing on a non-zero exit status.
fn cargo(args: &[&str]) -> Result<()> {
    let status = Command::new("cargo")
        .args(args)
        .status()
        .with_context(|| format!("failed to spawn cargo {}", args.join(" ")))?;

    if !status.success() {
        bail!("cargo {} exited with {status}", args.join(" "));
    }

    Ok(())
}
