use anyhow::Result;
use tracing::info;

use crate::cli::{CommonConfigArgs, ConfigCommands};
use crate::config::RenderConfig;
use crate::config_discovery::load_config;
use crate::merger::MergedConfig;

pub fn run(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Validate { config } => validate(config),
        ConfigCommands::Example => example(),
        ConfigCommands::Show { common } => show(&common),
    }
}

fn validate(config_path: Option<String>) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let loaded = load_config(config_path.as_deref(), &cwd)?;
    info!("Validating config file: {}", loaded.path.display());

    loaded.config.validate()?;

    println!("✓ Configuration file is valid: {}", loaded.path.display());
    println!("\nSummary:");
    println!("  - Executable: {}", loaded.config.executable);
    println!(
        "  - Output directory: {}",
        loaded.config.output_dir.as_deref().unwrap_or("(not set)")
    );
    println!("  - State directory: {}", loaded.config.state_dir);
    println!("  - Default data values: {}", loaded.config.data_values.len());
    println!("  - Specs: {}", loaded.config.specs.len());

    for (i, (name, spec)) in loaded.config.specs.iter().enumerate() {
        println!("    {}. {} ({} input(s))", i + 1, name, spec.inputs.len());
    }

    Ok(())
}

fn example() -> Result<()> {
    println!("{}", RenderConfig::example());
    Ok(())
}

fn show(common: &CommonConfigArgs) -> Result<()> {
    info!("Showing effective configuration");

    let merged = MergedConfig::load(common)?;

    println!("# Effective configuration ({})\n", merged.config_path.display());
    println!("{}", toml::to_string_pretty(&merged.config)?);

    if !merged.overrides.is_empty() {
        let mut keys: Vec<_> = merged.overrides.keys().collect();
        keys.sort();
        println!("# Command line data values");
        for key in keys {
            println!("#   {}", key);
        }
    }

    Ok(())
}
