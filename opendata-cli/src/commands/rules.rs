use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use opendata_core::{FileRecordSource, OpenDataConfig, RecordSource};

#[derive(Parser, Debug)]
pub struct RulesArgs {
    /// Plausibility rules file (default: export.rules_path from config)
    #[arg(long, value_name = "PATH")]
    pub source: Option<PathBuf>,
}

/// Prints the plausibility rules as pretty JSON.
pub fn run_rules(args: RulesArgs, config: &OpenDataConfig) -> Result<()> {
    let path = args
        .source
        .or_else(|| config.export.rules_path.clone())
        .ok_or_else(|| anyhow!("no rules file: pass --source or set export.rules_path"))?;

    let rules = FileRecordSource::new(&path)
        .with_rules_path(&path)
        .fetch_validation_rules()
        .with_context(|| format!("Failed to load rules from {:?}", path))?;

    println!("{}", serde_json::to_string_pretty(&rules)?);
    Ok(())
}
