//! Artifact Vault CLI Binary

use anyhow::Context;
use artifact_vault::config::ConfigLoader;
use artifact_vault::logging::init_logging;
use artifact_vault::tooling::cli::{Cli, CliContext};
use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config =
        ConfigLoader::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply_logging_overrides(&mut config.logging);
    init_logging(Some(&config.logging)).context("Failed to initialize logging")?;

    let context = CliContext::from_config(config).context("Failed to initialize vault")?;
    let result = context.execute(&cli.command);
    context.shutdown();

    let output = result?;
    if !output.is_empty() {
        println!("{}", output);
    }
    Ok(())
}
