pub mod archive;
pub mod columns;
pub mod config;
pub mod decimal;
pub mod delimited;
pub mod error;
pub mod export;
pub mod helpers;
pub mod naming;
pub mod record;
pub mod report;
pub mod source;
pub mod stream;
pub mod template;
pub mod transform;

pub use archive::{
    ArchivePackager, AuxEntry, EntryCompression, DEFAULT_LICENSE, LICENSE_ENTRY_NAME,
};
pub use columns::{Column, Layout};
pub use config::OpenDataConfig;
pub use decimal::Decimal;
pub use delimited::CsvSerializer;
pub use error::{OpenDataError, RenderError, RenderResult, Result};
pub use export::{export, export_with_progress, persist_export, Artifact, ExportFormat, ExportOutcome};
pub use helpers::{HelperRegistry, HelperSettings};
pub use naming::{ArtifactKind, NameTemplates, Padding, Partition, TimeWindow};
pub use record::{Record, ValidationRule};
pub use report::render_report;
pub use source::{FileRecordSource, MemoryRecordSource, RecordIter, RecordSource};
pub use stream::JsonValues;
pub use template::{render_str, Template};
pub use transform::{conditioned_signal_strength, with_derived_fields};
