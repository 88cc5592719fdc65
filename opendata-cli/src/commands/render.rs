use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use opendata_core::{
    render_report, FileRecordSource, HelperRegistry, Layout, OpenDataConfig, RecordSource,
    Template,
};
use tracing::info;

use super::PartitionArgs;

#[derive(Parser, Debug)]
pub struct RenderArgs {
    /// Report template file
    #[arg(long, value_name = "PATH")]
    pub template: PathBuf,

    /// Record file (NDJSON or JSON array)
    #[arg(long, value_name = "PATH")]
    pub source: PathBuf,

    #[command(flatten)]
    pub partition: PartitionArgs,

    /// Report title exposed to the template as {{title}}
    #[arg(long, default_value = "Open data report")]
    pub title: String,

    /// Write the report here instead of stdout
    #[arg(long = "out", value_name = "PATH")]
    pub output: Option<PathBuf>,
}

pub fn run_render(args: RenderArgs, config: &OpenDataConfig) -> Result<()> {
    let source_text = fs::read_to_string(&args.template)
        .with_context(|| format!("Failed to read template: {:?}", args.template))?;
    let template = Template::compile(&source_text)
        .with_context(|| format!("Invalid template: {:?}", args.template))?;
    let registry = HelperRegistry::with_defaults(config.helper_settings()?);

    let partition = args.partition.partition()?;
    let window = partition.window(args.partition.now()?, config.export.current_window_days)?;
    let source = FileRecordSource::new(&args.source)
        .with_time_field(config.export.time_field_for(Layout::OpenTest));

    info!(
        "rendering {:?} over {:?} (partition: {})",
        args.template, args.source, partition
    );
    let report = render_report(&template, source.fetch(&window)?, &registry, &args.title)
        .context("failed to render report")?;

    match &args.output {
        Some(path) => fs::write(path, report)
            .with_context(|| format!("Failed to write report: {:?}", path))?,
        None => print!("{}", report),
    }
    Ok(())
}
