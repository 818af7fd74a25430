use std::process::Command;

use anyhow::{Context, Result};

/// Feature tiers of `keeper-common` that must build on their own.
const TIERS: &[&str] = &["foundation", "runtime"];

/// Check that each `keeper-common` tier compiles without the others.
pub fn check_tiers() -> Result<()> {
    println!("Checking {} keeper-common feature tiers...", TIERS.len());

    for (index, tier) in TIERS.iter().enumerate() {
        println!(
            "\n[{}/{}] cargo check -p keeper-common --no-default-features --features {tier}",
            index + 1,
            TIERS.len()
        );

        let status = Command::new("cargo")
            .args(["check", "-p", "keeper-common", "--no-default-features", "--features", tier])
            .status()
            .with_context(|| format!("failed to run cargo check for tier '{tier}'"))?;

        if !status.success() {
            anyhow::bail!("feature tier '{tier}' failed to compile");
        }

        println!("✅ tier '{tier}' compiles");
    }

    Ok(())
}
