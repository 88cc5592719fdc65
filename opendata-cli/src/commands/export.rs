use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use opendata_core::{
    persist_export, ArtifactKind, ExportFormat, ExportOutcome, FileRecordSource, Layout,
    OpenDataConfig,
};
use tracing::info;

use super::PartitionArgs;
use crate::ui;

#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// Record file (NDJSON or JSON array)
    #[arg(long, value_name = "PATH")]
    pub source: PathBuf,

    /// Record file in the historic field layout, used with --legacy
    #[arg(long, value_name = "PATH")]
    pub legacy_source: Option<PathBuf>,

    /// Artifact container
    #[arg(long, value_enum, default_value = "zip")]
    pub format: FormatArg,

    /// Column set to publish
    #[arg(long, value_enum, default_value = "open-test", conflicts_with = "legacy")]
    pub layout: LayoutArg,

    /// Shorthand for --layout legacy
    #[arg(long)]
    pub legacy: bool,

    #[command(flatten)]
    pub partition: PartitionArgs,

    /// Output directory (default: export.output_dir from config, else .)
    #[arg(long = "out", value_name = "DIR")]
    pub output: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatArg {
    Csv,
    Zip,
}

impl From<FormatArg> for ArtifactKind {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => ArtifactKind::Csv,
            FormatArg::Zip => ArtifactKind::Zip,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutArg {
    OpenTest,
    Legacy,
    Signal,
}

impl From<LayoutArg> for Layout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::OpenTest => Layout::OpenTest,
            LayoutArg::Legacy => Layout::Legacy,
            LayoutArg::Signal => Layout::Signal,
        }
    }
}

impl ExportArgs {
    fn layout(&self) -> Layout {
        if self.legacy {
            Layout::Legacy
        } else {
            self.layout.into()
        }
    }
}

fn build_format(args: &ExportArgs, config: &OpenDataConfig) -> Result<ExportFormat> {
    let kind = ArtifactKind::from(args.format);
    let mut format = ExportFormat::new(&config.export.prefix, kind)
        .with_layout(args.layout())
        .with_padding(config.padding())
        .with_current_window_days(config.export.current_window_days)
        .with_compression(config.export.compression);
    if kind == ArtifactKind::Zip && config.export.license_path.is_some() {
        format = format.with_license(config.license_text()?);
    }
    Ok(format)
}

pub fn run_export(args: ExportArgs, config: &OpenDataConfig) -> Result<()> {
    let partition = args.partition.partition()?;
    let now = args.partition.now()?;
    let format = build_format(&args, config)?;

    let mut source = FileRecordSource::new(&args.source)
        .with_time_field(config.export.time_field_for(format.layout));
    if let Some(legacy) = &args.legacy_source {
        source = source.with_legacy_path(legacy);
    }

    let out_dir = args
        .output
        .clone()
        .or_else(|| config.export.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));

    info!(
        "exporting {:?} -> {:?} (partition: {}, layout: {:?})",
        args.source, out_dir, partition, format.layout
    );

    let (path, outcome) = ui::with_record_spinner(
        format!("exporting {}", format.file_name(&partition)),
        |(_, outcome): &(PathBuf, ExportOutcome)| {
            format!("{} records -> {}", outcome.records, outcome.artifact.file_name)
        },
        |tick| persist_export(&out_dir, &source, &format, &partition, now, tick),
    )
    .context("failed to export partition")?;

    info!(
        records = outcome.records,
        media_type = outcome.artifact.media_type,
        "wrote {}",
        path.display()
    );
    println!("{}", path.display());
    Ok(())
}
