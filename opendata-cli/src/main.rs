//! opendata CLI - open-data artifact export and report rendering
//!
//! Subcommands:
//! - `export`: write a CSV or zip artifact for one partition
//! - `render`: render a report template over a partition's records
//! - `rules`: print the plausibility rules
//! - `config`: inspect or initialise ~/.opendata/config.toml

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

mod commands;
mod config;
mod tracing_setup;
mod ui;

#[derive(Parser, Debug)]
#[command(
    name = "opendata",
    author,
    version,
    about = "Streaming open-data exports: partitioned CSV and zip artifacts plus template reports",
    long_about = "Publish measurement records as time-partitioned CSV or zip artifacts with \
                  deterministic names, and render reports with the built-in template helpers."
)]
struct Cli {
    /// Suppress progress spinners (for script consumption)
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Debug logging (RUST_LOG still takes precedence)
    #[arg(long, global = true)]
    debug: bool,

    /// Config file (default: $OPENDATA_CONFIG or ~/.opendata/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Export one partition as a CSV or zip artifact
    Export(commands::export::ExportArgs),
    /// Render a report template over a partition's records
    Render(commands::render::RenderArgs),
    /// Print plausibility rules as JSON
    Rules(commands::rules::RulesArgs),
    /// Manage opendata configuration (init, show, path)
    Config(config::ConfigArgs),
    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

#[derive(Parser, Debug)]
struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    shell: Shell,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)] // PowerShell is a proper noun, not a suffix
enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_setup::init(&tracing_setup::TracingConfig {
        debug: cli.debug,
        quiet: cli.quiet,
    })
    .ok();
    ui::init_quiet_mode(cli.quiet);

    let explicit = cli.config.as_deref();
    match cli.command {
        Commands::Export(args) => commands::run_export(args, &config::load(explicit)?)?,
        Commands::Render(args) => commands::run_render(args, &config::load(explicit)?)?,
        Commands::Rules(args) => commands::run_rules(args, &config::load(explicit)?)?,
        Commands::Config(args) => config::run_config(args, explicit)?,
        Commands::Completions(args) => run_completions(args)?,
    }
    Ok(())
}

fn run_completions(args: CompletionsArgs) -> Result<()> {
    use clap::CommandFactory;
    use clap_complete::{generate, Shell as CompletionShell};
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();

    let shell = match args.shell {
        Shell::Bash => CompletionShell::Bash,
        Shell::Zsh => CompletionShell::Zsh,
        Shell::Fish => CompletionShell::Fish,
        Shell::PowerShell => CompletionShell::PowerShell,
        Shell::Elvish => CompletionShell::Elvish,
    };

    generate(shell, &mut cmd, bin_name, &mut io::stdout());

    Ok(())
}
