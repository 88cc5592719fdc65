use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use opendata_core::OpenDataConfig;

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Write a config file with every default spelled out
    Init(InitArgs),
    /// Print the effective configuration as TOML
    Show,
    /// Show config file path
    Path,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Force overwrite existing config
    #[arg(long, short)]
    pub force: bool,
}

/// Config file in effect: `--config`, else `$OPENDATA_CONFIG`, else the default.
pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(OpenDataConfig::config_path)
}

/// Loads the effective config. An explicitly named file must exist.
pub fn load(explicit: Option<&Path>) -> Result<OpenDataConfig> {
    match explicit {
        Some(path) => OpenDataConfig::load_from(path),
        None => OpenDataConfig::load(),
    }
}

pub fn run_config(args: ConfigArgs, explicit: Option<&Path>) -> Result<()> {
    match args.command {
        ConfigCommands::Init(init) => run_init(init, explicit),
        ConfigCommands::Show => run_show(explicit),
        ConfigCommands::Path => {
            println!("{}", resolve_path(explicit).display());
            Ok(())
        }
    }
}

fn run_init(args: InitArgs, explicit: Option<&Path>) -> Result<()> {
    let config_path = resolve_path(explicit);

    if config_path.exists() && !args.force {
        return Err(anyhow!(
            "Config already exists at {:?}\n\nUse --force to overwrite",
            config_path
        ));
    }

    OpenDataConfig::default().save_to(&config_path)?;

    println!("✅ Created config at: {:?}", config_path);
    println!("\nNext steps:");
    println!("  1. Edit the config: $EDITOR {:?}", config_path);
    println!("  2. Run: opendata config show");

    Ok(())
}

fn run_show(explicit: Option<&Path>) -> Result<()> {
    let config = load(explicit)?;

    let toml_str =
        toml::to_string_pretty(&config).context("Failed to serialize config to TOML")?;

    println!("{}", toml_str);

    Ok(())
}
