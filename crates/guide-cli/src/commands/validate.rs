use std::path::PathBuf;

use clap::Args;

use guide_core::Configuration;

#[derive(Args)]
pub struct ValidateArgs {
    /// Path to config file to validate
    pub config: PathBuf,
}

/// Warnings never fail validation; generation proceeds regardless.
pub fn execute(args: ValidateArgs) -> anyhow::Result<()> {
    println!("Validating {}...", args.config.display());

    let config = Configuration::from_file(&args.config)?;
    println!("  YAML parsing: OK");
    println!("  Install method: {}", config.install_method);
    println!("  APM targets: {}", config.apm_targets.len());
    println!("  OpenMetrics targets: {}", config.open_metrics_targets.len());

    let warnings = config.warnings();
    println!();
    if warnings.is_empty() {
        println!("Validation PASSED");
    } else {
        println!("Validation PASSED with {} warning(s):", warnings.len());
        for warning in &warnings {
            println!("  - {warning}");
        }
    }

    Ok(())
}
