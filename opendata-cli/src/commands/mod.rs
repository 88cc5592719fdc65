//! Command implementations for the opendata CLI

pub mod export;
pub mod render;
pub mod rules;

pub use export::run_export;
pub use render::run_render;
pub use rules::run_rules;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use opendata_core::source::parse_record_time;
use opendata_core::Partition;

/// Partition selection shared by `export` and `render`.
#[derive(Args, Debug, Clone, Default)]
pub struct PartitionArgs {
    /// Trailing hours to cover (e.g. 24)
    #[arg(long, value_name = "N", conflicts_with = "month")]
    pub hours: Option<u32>,

    /// Calendar month to cover
    #[arg(long, value_name = "YYYY-MM")]
    pub month: Option<String>,

    /// Reference time for rolling windows (UTC, "YYYY-MM-DD HH:MM:SS" or RFC 3339)
    #[arg(long, value_name = "TIME")]
    pub at: Option<String>,
}

impl PartitionArgs {
    /// `--hours`, `--month`, or the current snapshot when neither is given.
    pub fn partition(&self) -> Result<Partition> {
        match (self.hours, &self.month) {
            (Some(hours), None) => Ok(Partition::hours(hours)?),
            (None, Some(month)) => {
                let partition: Partition = month
                    .parse()
                    .with_context(|| format!("invalid --month '{}'", month))?;
                match partition {
                    Partition::Month { .. } => Ok(partition),
                    _ => Err(anyhow!("--month expects YYYY-MM, got '{}'", month)),
                }
            }
            (None, None) => Ok(Partition::Current),
            (Some(_), Some(_)) => Err(anyhow!("--hours and --month are mutually exclusive")),
        }
    }

    pub fn now(&self) -> Result<DateTime<Utc>> {
        match &self.at {
            Some(at) => parse_record_time(&serde_json::Value::String(at.clone()))
                .with_context(|| format!("invalid --at '{}'", at)),
            None => Ok(Utc::now()),
        }
    }
}
